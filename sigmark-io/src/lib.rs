use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sigmark_config::ServiceConfig;
use sigmark_core::request::SignRequest;
use sigmark_engine::persist::{ServiceError, SigningService};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("signing service base_url is not configured")]
    MissingBaseUrl,
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// 通过 HTTP `POST` JSON 调用文档签名服务，2xx 视为成功。
#[derive(Debug, Clone)]
pub struct HttpSigningService {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpSigningService {
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint, auth_token))
    }

    /// 使用调用方构建的 `reqwest::Client`（自定义代理、TLS 等）。
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            auth_token,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ClientError> {
        let endpoint = config.sign_endpoint().ok_or(ClientError::MissingBaseUrl)?;
        Self::new(
            endpoint,
            config.auth_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SigningService for HttpSigningService {
    async fn sign(&self, request: &SignRequest) -> Result<(), ServiceError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ServiceError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            endpoint = %self.endpoint,
            status = status.as_u16(),
            page = request.page_number,
            "签名请求已完成"
        );
        Ok(())
    }
}

/// 演练模式：只记录并输出请求，不访问网络。
#[derive(Debug, Default)]
pub struct DryRunSigningService {
    requests: Mutex<Vec<SignRequest>>,
}

impl DryRunSigningService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回迄今记录的全部请求。
    pub fn requests(&self) -> Vec<SignRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SigningService for DryRunSigningService {
    async fn sign(&self, request: &SignRequest) -> Result<(), ServiceError> {
        info!(
            document = %request.document_id,
            page = request.page_number,
            x = request.x,
            y = request.y,
            "演练模式：跳过签名请求"
        );
        self.requests
            .lock()
            .map_err(|_| ServiceError::Transport("dry-run recorder poisoned".to_string()))?
            .push(request.clone());
        Ok(())
    }
}

/// 根据配置选择的签名后端。
#[derive(Debug)]
pub enum SigningBackend {
    Http(HttpSigningService),
    DryRun(DryRunSigningService),
}

impl SigningBackend {
    /// 配置了 `base_url` 时使用 HTTP，否则进入演练模式。
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ClientError> {
        match HttpSigningService::from_config(config) {
            Ok(service) => Ok(Self::Http(service)),
            Err(ClientError::MissingBaseUrl) => Ok(Self::DryRun(DryRunSigningService::new())),
            Err(err) => Err(err),
        }
    }

    #[inline]
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun(_))
    }
}

#[async_trait]
impl SigningService for SigningBackend {
    async fn sign(&self, request: &SignRequest) -> Result<(), ServiceError> {
        match self {
            Self::Http(service) => service.sign(request).await,
            Self::DryRun(service) => service.sign(request).await,
        }
    }
}
