//! Sensitive-data decryption

use super::client::{ApiError, XhsClient};
use crate::models::{BaseResponse, BatchDecryptRequest, BatchDecryptResult, DecryptItem};

pub struct DataApi<'a> {
    client: &'a XhsClient,
}

impl<'a> DataApi<'a> {
    pub(crate) fn new(client: &'a XhsClient) -> Self {
        Self { client }
    }

    /// Decrypt buyer data (phone numbers, addresses, ...) in one round trip.
    ///
    /// `action_type` and `app_user_id` are recorded by the platform for audit.
    pub async fn batch_decrypt(
        &self,
        base_infos: &[DecryptItem],
        action_type: &str,
        app_user_id: &str,
    ) -> Result<BaseResponse<BatchDecryptResult>, ApiError> {
        let req = BatchDecryptRequest {
            base_infos,
            action_type,
            app_user_id,
        };
        self.client.call("data.batchDecrypt", &req).await
    }
}
