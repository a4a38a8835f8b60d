//! Order methods

use super::client::{ApiError, XhsClient};
use crate::models::{BaseResponse, OrderDetail, OrderDetailRequest, OrderList, OrderListQuery};

pub struct OrderApi<'a> {
    client: &'a XhsClient,
}

impl<'a> OrderApi<'a> {
    pub(crate) fn new(client: &'a XhsClient) -> Self {
        Self { client }
    }

    pub async fn get_order_list(
        &self,
        query: &OrderListQuery,
    ) -> Result<BaseResponse<OrderList>, ApiError> {
        self.client.call("order.getOrderList", query).await
    }

    pub async fn get_order_detail(
        &self,
        order_id: &str,
    ) -> Result<BaseResponse<OrderDetail>, ApiError> {
        self.client
            .call("order.getOrderDetail", &OrderDetailRequest { order_id })
            .await
    }
}
