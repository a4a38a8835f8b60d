//! Request and response models for open-platform methods

mod data;
mod order;
mod product;
mod response;

pub use data::*;
pub use order::*;
pub use product::*;
pub use response::BaseResponse;
pub(crate) use response::RawResponse;
