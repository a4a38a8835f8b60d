//! Response envelope shared by every open-platform method

use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of one API call as reported by the platform.
///
/// `success == false` is a normal response, not a transport error:
/// `code`/`msg` carry the platform's reason and `data` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    pub success: bool,
    pub code: Option<String>,
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> BaseResponse<T> {
    /// Human-readable failure reason, if any.
    pub fn error_message(&self) -> Option<&str> {
        if self.success {
            None
        } else {
            self.msg.as_deref().or(self.code.as_deref())
        }
    }
}

/// Envelope as it arrives on the wire, before `data` is typed.
///
/// The platform is inconsistent about field names (`code` vs `error_code`)
/// and about whether codes are strings or numbers.
#[derive(Debug, Deserialize)]
pub(crate) struct RawResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "error_code", deserialize_with = "code_as_string")]
    pub code: Option<String>,
    #[serde(default, alias = "error_msg", alias = "message")]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

fn code_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
