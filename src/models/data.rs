//! Sensitive-data decryption models

use serde::{Deserialize, Serialize};

/// One encrypted value to decrypt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptItem {
    /// Kind of value, e.g. "phone" or "address"
    pub data_tag: String,
    pub encrypted_data: String,
}

impl DecryptItem {
    pub fn new(data_tag: impl Into<String>, encrypted_data: impl Into<String>) -> Self {
        Self {
            data_tag: data_tag.into(),
            encrypted_data: encrypted_data.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchDecryptRequest<'a> {
    pub base_infos: &'a [DecryptItem],
    pub action_type: &'a str,
    pub app_user_id: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDecryptResult {
    #[serde(default)]
    pub data_info_list: Vec<DecryptedInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedInfo {
    pub data_tag: String,
    pub encrypted_data: String,
    pub decrypted_data: Option<String>,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
    #[serde(default)]
    pub virtual_number_flag: bool,
}
