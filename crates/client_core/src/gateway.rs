use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use shared::{
    domain::BillRecord,
    error::ApiError,
    protocol::{ReceiptUploadQuery, UploadedFile},
};
use tracing::debug;
use url::Url;

use crate::error::GatewayError;

/// Receipt selected in the new-bill form, as handed to `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptUpload {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
    pub email: String,
}

/// Remote persistence boundary for bills.
#[async_trait]
pub trait BillsGateway: Send + Sync {
    async fn list(&self) -> Result<Vec<BillRecord>, GatewayError>;
    async fn create(&self, receipt: ReceiptUpload) -> Result<UploadedFile, GatewayError>;
    async fn update(&self, bill: BillRecord) -> Result<BillRecord, GatewayError>;
}

pub struct MissingBillsGateway;

#[async_trait]
impl BillsGateway for MissingBillsGateway {
    async fn list(&self) -> Result<Vec<BillRecord>, GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn create(&self, _receipt: ReceiptUpload) -> Result<UploadedFile, GatewayError> {
        Err(GatewayError::Unavailable)
    }

    async fn update(&self, _bill: BillRecord) -> Result<BillRecord, GatewayError> {
        Err(GatewayError::Unavailable)
    }
}

/// `BillsGateway` over the bills REST API.
pub struct HttpBillsGateway {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl HttpBillsGateway {
    pub fn new(api_url: &str) -> Result<Self, GatewayError> {
        Self::with_client(api_url, Client::new())
    }

    pub fn with_timeout(api_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        Self::with_client(api_url, http)
    }

    fn with_client(api_url: &str, http: Client) -> Result<Self, GatewayError> {
        let parsed = Url::parse(api_url).map_err(|err| GatewayError::InvalidUrl {
            url: api_url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatewayError::InvalidUrl {
                url: api_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.is_empty());
        self
    }

    fn bills_url(&self) -> String {
        format!("{}/bills", self.api_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response
        .text()
        .await
        .ok()
        .and_then(|body| serde_json::from_str::<ApiError>(&body).ok());
    Err(GatewayError::Status {
        status: status.as_u16(),
        detail,
    })
}

#[async_trait]
impl BillsGateway for HttpBillsGateway {
    async fn list(&self) -> Result<Vec<BillRecord>, GatewayError> {
        let response = self
            .authorize(self.http.get(self.bills_url()))
            .send()
            .await?;
        let bills: Vec<BillRecord> = ensure_success(response).await?.json().await?;
        debug!(count = bills.len(), "bills: listed");
        Ok(bills)
    }

    async fn create(&self, receipt: ReceiptUpload) -> Result<UploadedFile, GatewayError> {
        let query = ReceiptUploadQuery {
            file_name: receipt.file_name,
            email: receipt.email,
        };
        let content_type = receipt
            .mime_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let response = self
            .authorize(self.http.post(self.bills_url()))
            .query(&query)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(receipt.bytes)
            .send()
            .await?;
        let uploaded: UploadedFile = ensure_success(response).await?.json().await?;
        debug!(key = %uploaded.key, "bills: receipt stored");
        Ok(uploaded)
    }

    async fn update(&self, bill: BillRecord) -> Result<BillRecord, GatewayError> {
        let bill_id = bill.id.clone().ok_or(GatewayError::MissingBillId)?;
        let response = self
            .authorize(
                self.http
                    .patch(format!("{}/{}", self.bills_url(), bill_id.as_str())),
            )
            .json(&bill)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
