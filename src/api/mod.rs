//! Open-platform API client

pub mod client;
mod data;
mod order;
mod product;
pub mod transport;

pub use client::{ApiError, XhsClient};
pub use data::DataApi;
pub use order::OrderApi;
pub use product::ProductApi;
pub use transport::TransportError;
