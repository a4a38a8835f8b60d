//! Product-related models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSkuListRequest {
    pub page_no: u32,
    pub page_size: u32,
    pub buyable: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSkuAvailableRequest {
    pub sku_id: String,
    pub available: bool,
}

/// One page of SKU details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSkuList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page_no: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub data: Vec<SkuDetail>,
}

/// SKU entry; fields the client does not model are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuDetail {
    pub id: Option<String>,
    pub name: Option<String>,
    pub item_id: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i64>,
    pub buyable: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
