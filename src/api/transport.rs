//! Signed request envelope for the open platform
//!
//! Every method is a POST of one JSON document to a single controller URL.
//! The document carries the method name, app credentials, a timestamp and an
//! MD5 signature, with the method's own parameters flattened alongside.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;
use crate::models::{BaseResponse, RawResponse};

const API_PATH: &str = "ark/open_api/v3/common_controller";

/// Failure to complete an HTTP exchange with the platform.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// HTTP client bound to one app's credentials.
pub struct Transport {
    http: reqwest::Client,
    endpoint: Url,
    app_id: String,
    app_secret: String,
    version: String,
}

impl Transport {
    pub fn new(http: reqwest::Client, config: &ClientConfig) -> Result<Self, TransportError> {
        let mut base = Url::parse(&config.base_url)?;
        // Keep any gateway prefix on the base URL when joining.
        if !base.path().ends_with('/') {
            let prefixed = format!("{}/", base.path());
            base.set_path(&prefixed);
        }
        let endpoint = base.join(API_PATH)?;
        Ok(Self {
            http,
            endpoint,
            app_id: config.app_id.clone(),
            app_secret: config.app_secret.clone(),
            version: config.version.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Lower-hex MD5 over `{method}?appId=..&timestamp=..&version=..{secret}`.
    pub fn sign(&self, method: &str, timestamp: &str) -> String {
        let plain = format!(
            "{}?appId={}&timestamp={}&version={}{}",
            method, self.app_id, timestamp, self.version, self.app_secret
        );
        format!("{:x}", md5::compute(plain.as_bytes()))
    }

    /// Build the request document for `method` at `timestamp` (unix seconds).
    pub(crate) fn build_payload<P: Serialize + ?Sized>(
        &self,
        method: &str,
        params: &P,
        access_token: Option<&str>,
        timestamp: i64,
    ) -> Result<Map<String, Value>, TransportError> {
        let timestamp = timestamp.to_string();

        let mut payload = Map::new();
        payload.insert("sign".into(), self.sign(method, &timestamp).into());
        payload.insert("appId".into(), self.app_id.clone().into());
        payload.insert("timestamp".into(), timestamp.into());
        payload.insert("version".into(), self.version.clone().into());
        payload.insert("method".into(), method.into());
        if let Some(token) = access_token {
            payload.insert("accessToken".into(), token.into());
        }

        match serde_json::to_value(params).map_err(TransportError::Encode)? {
            Value::Object(fields) => {
                for (key, value) in fields {
                    // Optional parameters left unset are omitted entirely.
                    if !value.is_null() {
                        payload.insert(key, value);
                    }
                }
            }
            Value::Null => {}
            _ => {
                return Err(TransportError::Encode(serde::ser::Error::custom(
                    "request parameters must serialize to a JSON object",
                )))
            }
        }

        Ok(payload)
    }

    /// Invoke `method` and decode the envelope.
    ///
    /// Only transport-level problems are errors. A `success: false` envelope
    /// is returned as-is with `data: None`.
    pub async fn call<P, T>(
        &self,
        method: &str,
        params: &P,
        access_token: Option<&str>,
    ) -> Result<BaseResponse<T>, TransportError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let timestamp = chrono::Utc::now().timestamp();
        let payload = self.build_payload(method, params, access_token, timestamp)?;

        tracing::debug!("POST {} method={}", self.endpoint, method);

        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let raw: RawResponse = serde_json::from_slice(&bytes).map_err(TransportError::Decode)?;

        if !raw.success {
            tracing::debug!(
                "method={} rejected: code={:?} msg={:?}",
                method,
                raw.code,
                raw.msg
            );
            return Ok(BaseResponse {
                success: false,
                code: raw.code,
                msg: raw.msg,
                data: None,
            });
        }

        let data = match raw.data {
            None | Some(Value::Null) => None,
            Some(value) => Some(serde_json::from_value(value).map_err(TransportError::Decode)?),
        };

        Ok(BaseResponse {
            success: true,
            code: raw.code,
            msg: raw.msg,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Transport {
        let config = ClientConfig::new("test-app", "secret-key").with_version("1.0");
        Transport::new(reqwest::Client::new(), &config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let t = transport();
        assert_eq!(
            t.endpoint().as_str(),
            "https://openapi.xiaohongshu.com/ark/open_api/v3/common_controller"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        for base in ["https://gw.example.com/proxy", "https://gw.example.com/proxy/"] {
            let config = ClientConfig::new("a", "b").with_base_url(base);
            let t = Transport::new(reqwest::Client::new(), &config).unwrap();
            assert_eq!(
                t.endpoint().as_str(),
                "https://gw.example.com/proxy/ark/open_api/v3/common_controller"
            );
        }
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig::new("a", "b").with_base_url("not a url");
        assert!(matches!(
            Transport::new(reqwest::Client::new(), &config),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_sign_matches_md5_of_canonical_string() {
        let t = transport();
        let expected = format!(
            "{:x}",
            md5::compute("data.batchDecrypt?appId=test-app&timestamp=1700000000&version=1.0secret-key")
        );
        assert_eq!(t.sign("data.batchDecrypt", "1700000000"), expected);
        assert_eq!(expected.len(), 32);
    }

    #[test]
    fn test_payload_flattens_params() {
        let t = transport();
        let params = serde_json::json!({ "pageNo": 1, "pageSize": 5, "buyable": null });
        let payload = t
            .build_payload("product.getDetailSkuList", &params, Some("tok"), 1_700_000_000)
            .unwrap();

        assert_eq!(payload["method"], "product.getDetailSkuList");
        assert_eq!(payload["appId"], "test-app");
        assert_eq!(payload["timestamp"], "1700000000");
        assert_eq!(payload["version"], "1.0");
        assert_eq!(payload["accessToken"], "tok");
        assert_eq!(payload["pageNo"], 1);
        assert!(!payload.contains_key("buyable"));
        assert_eq!(
            payload["sign"],
            t.sign("product.getDetailSkuList", "1700000000")
        );
    }

    #[test]
    fn test_payload_without_token() {
        let t = transport();
        let payload = t
            .build_payload("oauth.getAccessToken", &serde_json::json!({"code": "c"}), None, 1)
            .unwrap();
        assert!(!payload.contains_key("accessToken"));
        assert_eq!(payload["code"], "c");
    }

    #[test]
    fn test_payload_rejects_non_object_params() {
        let t = transport();
        let err = t.build_payload("m", &[1, 2, 3], None, 1).unwrap_err();
        assert!(matches!(err, TransportError::Encode(_)));
    }
}
