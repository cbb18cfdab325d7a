use crate::models::{AccountResponse, RootResponse, SubmitResponse};
use crate::{AccountThresholds, LedgerClient, SubmitOutcome};
use async_trait::async_trait;
use cosign_types::{CosignError, Envelope, Result};
use reqwest::{Client as HttpClient, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Horizon REST client.
#[derive(Clone)]
pub struct HorizonClient {
    base_url: String,
    client: HttpClient,
}

impl HorizonClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CosignError::LedgerError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CosignError::LedgerError(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(CosignError::LedgerError(format!(
                "GET {} returned status {}",
                url,
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CosignError::LedgerError(format!("Invalid response from {}: {}", url, e)))
    }
}

#[async_trait]
impl LedgerClient for HorizonClient {
    async fn network_passphrase(&self) -> Result<String> {
        let root: RootResponse = self.get_json(&format!("{}/", self.base_url)).await?;
        Ok(root.network_passphrase)
    }

    async fn account_thresholds(&self, account_id: &str) -> Result<AccountThresholds> {
        let account: AccountResponse = self
            .get_json(&format!("{}/accounts/{}", self.base_url, account_id))
            .await?;
        Ok(account.into())
    }

    async fn submit_transaction(&self, envelope: &Envelope) -> Result<SubmitOutcome> {
        let url = format!("{}/transactions", self.base_url);
        let tx = envelope.to_base64()?;

        let response = self
            .client
            .post(&url)
            .form(&[("tx", tx.as_str())])
            .send()
            .await
            .map_err(|e| CosignError::LedgerError(format!("POST {} failed: {}", url, e)))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::BAD_REQUEST {
            return Err(CosignError::LedgerError(format!(
                "POST {} returned status {}",
                url, status
            )));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| CosignError::LedgerError(format!("Invalid submit response: {}", e)))?;

        Ok(body.into())
    }
}
