use async_trait::async_trait;
use sigmark_core::mark::{MarkId, ViewportState};
use sigmark_core::request::SignRequest;
use sigmark_core::transform::render_to_pdf_space;
use thiserror::Error;
use tracing::{info, warn};

use crate::errors::EngineError;
use crate::store::OverlayStore;

/// 外部签名服务对单次请求返回的失败。
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// 外部文档签名服务，每次调用保存一个标记。
#[async_trait]
pub trait SigningService: Send + Sync {
    async fn sign(&self, request: &SignRequest) -> Result<(), ServiceError>;
}

#[async_trait]
impl<S: SigningService + ?Sized> SigningService for &S {
    async fn sign(&self, request: &SignRequest) -> Result<(), ServiceError> {
        (**self).sign(request).await
    }
}

/// 单页保存结果。请求相互独立，失败不会回滚已成功的标记。
#[derive(Debug, Default)]
pub struct SaveReport {
    pub page: u32,
    pub saved: Vec<MarkId>,
    pub failed: Vec<(MarkId, ServiceError)>,
}

impl SaveReport {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[inline]
    pub fn attempted(&self) -> usize {
        self.saved.len() + self.failed.len()
    }

    /// 以第一个失败的标记作为整页错误返回。
    pub fn into_result(self) -> Result<Vec<MarkId>, EngineError> {
        match self.failed.into_iter().next() {
            Some((mark, source)) => Err(EngineError::Persistence {
                mark: mark.get(),
                source,
            }),
            None => Ok(self.saved),
        }
    }
}

pub struct PersistenceBatcher<S> {
    service: S,
}

impl<S: SigningService> PersistenceBatcher<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    #[inline]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// 将指定页上的每个标记转换到 PDF 空间，并按插入顺序逐个提交。
    pub async fn save_current_page(
        &self,
        store: &OverlayStore,
        page_number: u32,
        document_id: &str,
        viewport: &ViewportState,
    ) -> Result<SaveReport, EngineError> {
        if !viewport.is_measured() {
            return Err(EngineError::InvalidViewport {
                width: viewport.page_dimensions.width,
                height: viewport.page_dimensions.height,
            });
        }

        let requests: Vec<(MarkId, SignRequest)> = store
            .marks_for_page(page_number)
            .map(|mark| {
                let pdf = render_to_pdf_space(
                    mark.position,
                    mark.size,
                    viewport.page_dimensions.height,
                    viewport.scale,
                );
                let request = SignRequest {
                    document_id: document_id.to_string(),
                    signature_data: mark.image_data.clone(),
                    x: pdf.x(),
                    y: pdf.y(),
                    page_number: mark.page_number,
                };
                (mark.id, request)
            })
            .collect();

        if requests.is_empty() {
            return Err(EngineError::NoMarks { page: page_number });
        }

        let mut report = SaveReport {
            page: page_number,
            ..SaveReport::default()
        };
        for (id, request) in requests {
            match self.service.sign(&request).await {
                Ok(()) => {
                    info!(
                        id = id.get(),
                        page = page_number,
                        x = request.x,
                        y = request.y,
                        "签名标记已保存"
                    );
                    report.saved.push(id);
                }
                Err(err) => {
                    warn!(id = id.get(), page = page_number, error = %err, "签名标记保存失败");
                    report.failed.push((id, err));
                }
            }
        }
        Ok(report)
    }
}
