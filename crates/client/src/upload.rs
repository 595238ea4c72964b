//! Creative asset upload pipeline
//!
//! A linear sequence of independent HTTP calls: register the asset, PUT the
//! raw bytes to the storage URL the upstream hands back, probe the stored
//! size with a HEAD request, then finalize. Control-plane calls go through
//! the core dispatcher (and therefore share session handling); the byte
//! transfer and the probe hit the storage URL directly, outside the session.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::api::Client;
use crate::errors::{ClientError, Result};
use crate::outcome::Outcome;

const ASSETS_PATH: &str = "creative_assets";

impl Client {
    /// Upload a creative asset and return the finalized asset record.
    ///
    /// # Errors
    /// `Status` when the storage endpoint rejects the transfer, `Internal`
    /// when the stored byte count does not match what was sent, plus the
    /// dispatcher's usual taxonomy for the register/finalize calls.
    pub async fn upload_creative_asset(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Outcome<Value>> {
        let ticket = self
            .dispatcher()
            .dispatch(
                reqwest::Method::POST,
                ASSETS_PATH,
                Some(&json!({"file_name": file_name, "content_type": content_type})),
            )
            .await?;

        let asset_id = required_str(&ticket, "asset_id")?;
        let upload_url = required_str(&ticket, "upload_url")?;
        debug!(asset_id, file_name, "registered creative asset");

        let sent = bytes.len() as u64;
        self.transfer(upload_url, content_type, bytes).await?;
        self.verify_stored_length(upload_url, sent).await?;

        let record = self
            .dispatcher()
            .dispatch(reqwest::Method::POST, &format!("{ASSETS_PATH}/{asset_id}/finalize"), None)
            .await?;

        info!(asset_id, file_name, bytes = sent, "creative asset uploaded");
        Ok(Outcome::Success(record))
    }

    async fn transfer(&self, upload_url: &str, content_type: &str, bytes: Vec<u8>) -> Result<()> {
        let response = self
            .dispatcher()
            .http()
            .put(upload_url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ClientError::transport(&e))?;

        expect_success(response).await
    }

    /// Content-length probe: the storage endpoint must report exactly the
    /// byte count that was sent.
    async fn verify_stored_length(&self, upload_url: &str, sent: u64) -> Result<()> {
        let response = self
            .dispatcher()
            .http()
            .head(upload_url)
            .send()
            .await
            .map_err(|e| ClientError::transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { status: status.as_u16(), body: Value::Null });
        }

        let stored = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                ClientError::Internal("storage endpoint did not report a content length".into())
            })?;

        if stored != sent {
            return Err(ClientError::Internal(format!(
                "stored asset length {stored} does not match sent length {sent}"
            )));
        }
        Ok(())
    }
}

async fn expect_success(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    let body =
        if text.is_empty() { Value::Null } else { Value::String(text) };
    Err(ClientError::Status { status: status.as_u16(), body })
}

fn required_str<'a>(body: &'a Value, field: &str) -> Result<&'a str> {
    body.get(field).and_then(Value::as_str).ok_or_else(|| {
        ClientError::Internal(format!("asset registration response missing `{field}`"))
    })
}
