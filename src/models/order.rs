//! Order-related models

use serde::{Deserialize, Serialize};

/// Filter for `order.getOrderList`. Times are unix seconds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub page_no: u32,
    pub page_size: u32,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    /// 1 = created time, 2 = updated time
    pub time_type: Option<u8>,
    pub order_type: Option<u8>,
    pub order_status: Option<u8>,
}

impl OrderListQuery {
    pub fn page(page_no: u32, page_size: u32) -> Self {
        Self {
            page_no,
            page_size,
            start_time: None,
            end_time: None,
            time_type: None,
            order_type: None,
            order_status: None,
        }
    }

    pub fn between(mut self, start_time: i64, end_time: i64) -> Self {
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderDetailRequest<'a> {
    pub order_id: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page_no: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub max_page_no: u32,
    #[serde(default)]
    pub order_list: Option<Vec<OrderSummary>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: String,
    pub order_type: Option<u8>,
    pub order_status: Option<u8>,
    pub created_time: Option<i64>,
    pub updated_time: Option<i64>,
}

/// Full order record; fields the client does not model are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order_id: String,
    pub order_status: Option<u8>,
    pub total_pay_amount: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
