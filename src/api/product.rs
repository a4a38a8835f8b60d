//! Product and SKU methods

use super::client::{ApiError, XhsClient};
use crate::models::{BaseResponse, DetailSkuList, DetailSkuListRequest, UpdateSkuAvailableRequest};

pub struct ProductApi<'a> {
    client: &'a XhsClient,
}

impl<'a> ProductApi<'a> {
    pub(crate) fn new(client: &'a XhsClient) -> Self {
        Self { client }
    }

    /// List SKUs with their item details, one page at a time.
    pub async fn get_detail_sku_list(
        &self,
        page_no: u32,
        page_size: u32,
        buyable: Option<bool>,
    ) -> Result<BaseResponse<DetailSkuList>, ApiError> {
        let req = DetailSkuListRequest {
            page_no,
            page_size,
            buyable,
        };
        self.client.call("product.getDetailSkuList", &req).await
    }

    /// Put a SKU on or off sale.
    pub async fn update_sku_available(
        &self,
        sku_id: &str,
        available: bool,
    ) -> Result<BaseResponse<serde_json::Value>, ApiError> {
        let req = UpdateSkuAvailableRequest {
            sku_id: sku_id.to_string(),
            available,
        };
        self.client.call("product.updateSkuAvailable", &req).await
    }
}
