use sigmark_core::geometry::{Point2, Size2};
use sigmark_core::mark::{
    DEFAULT_MARK_SIZE, DEFAULT_SCALE, MAX_SCALE, MIN_SCALE, MarkId, SignatureMark, ViewportState,
    clamp_scale,
};
use tracing::{debug, info, warn};

use crate::drag::{DragController, DragUpdate, PointerEvent};
use crate::errors::EngineError;
use crate::persist::{PersistenceBatcher, SaveReport, SigningService};
use crate::store::OverlayStore;

const DEFAULT_ZOOM_STEP: f64 = 0.1;

/// 会话选项，通常由应用配置映射而来。
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub initial_scale: f64,
    pub zoom_step: f64,
    pub mark_size: Size2,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            initial_scale: DEFAULT_SCALE,
            zoom_step: DEFAULT_ZOOM_STEP,
            mark_size: DEFAULT_MARK_SIZE,
        }
    }
}

impl SessionOptions {
    /// 非法的缩放步长或标记尺寸回退为默认值。
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let zoom_step = if self.zoom_step.is_finite() && self.zoom_step > 0.0 {
            self.zoom_step
        } else {
            warn!(zoom_step = self.zoom_step, "缩放步长无效，使用默认值");
            defaults.zoom_step
        };
        let mark_size = if self.mark_size.is_measured() {
            self.mark_size
        } else {
            warn!(
                width = self.mark_size.width,
                height = self.mark_size.height,
                "签名标记尺寸无效，使用默认值"
            );
            defaults.mark_size
        };
        Self {
            initial_scale: self.initial_scale,
            zoom_step,
            mark_size,
        }
    }
}

/// 一个文档的签名编辑会话：持有标记存储、拖拽状态机与视口，外部不共享可变状态。
#[derive(Debug)]
pub struct SigningSession {
    document_id: String,
    page_count: u32,
    active_page: u32,
    scale: f64,
    zoom_step: f64,
    /// 当前页的固有尺寸（PDF 点），渲染完成前为 `None`。
    page_size: Option<Size2>,
    store: OverlayStore,
    drag: DragController,
}

impl SigningSession {
    pub fn new(document_id: impl Into<String>, page_count: u32) -> Self {
        Self::with_options(document_id, page_count, SessionOptions::default())
    }

    pub fn with_options(
        document_id: impl Into<String>,
        page_count: u32,
        options: SessionOptions,
    ) -> Self {
        let options = options.sanitized();
        Self {
            document_id: document_id.into(),
            page_count: page_count.max(1),
            active_page: 1,
            scale: clamp_scale(options.initial_scale),
            zoom_step: options.zoom_step,
            page_size: None,
            store: OverlayStore::with_mark_size(options.mark_size),
            drag: DragController::default(),
        }
    }

    #[inline]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    pub fn active_page(&self) -> u32 {
        self.active_page
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    #[inline]
    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    /// 当前视口；页面尚未渲染时尺寸为零。
    pub fn viewport(&self) -> ViewportState {
        match self.page_size {
            Some(size) => ViewportState::for_page(size, self.scale),
            None => ViewportState::new(self.scale, Size2::zero()),
        }
    }

    /// 渲染器报告当前页固有尺寸后调用。
    pub fn page_rendered(&mut self, intrinsic: Size2) {
        self.page_size = Some(intrinsic);
        let viewport = self.viewport();
        debug!(
            page = self.active_page,
            width = viewport.page_dimensions.width,
            height = viewport.page_dimensions.height,
            "页面渲染完成"
        );
    }

    pub fn set_container_origin(&mut self, origin: Point2) {
        self.drag.set_container_origin(origin);
    }

    /// 设置缩放（限制在合法范围内）。标记保持原有像素位置，仅在下次移动时重新限制。
    pub fn set_scale(&mut self, scale: f64) -> f64 {
        self.scale = clamp_scale(scale);
        info!(scale = self.scale, "缩放已调整");
        self.scale
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_scale((self.scale + self.zoom_step).min(MAX_SCALE))
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_scale((self.scale - self.zoom_step).max(MIN_SCALE))
    }

    /// 切换页面：释放拖拽，并在新页渲染前视为未测量。
    pub fn go_to_page(&mut self, page: u32) -> Result<u32, EngineError> {
        if page == 0 || page > self.page_count {
            return Err(EngineError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        if page != self.active_page {
            self.drag.release();
            self.page_size = None;
            self.active_page = page;
            info!(page, page_count = self.page_count, "切换页面");
        }
        Ok(self.active_page)
    }

    pub fn next_page(&mut self) -> Result<u32, EngineError> {
        self.go_to_page(self.active_page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> Result<u32, EngineError> {
        self.go_to_page(self.active_page.saturating_sub(1))
    }

    /// 在当前页中央添加签名。
    pub fn add_signature(
        &mut self,
        image_data: impl Into<String>,
    ) -> Result<SignatureMark, EngineError> {
        let viewport = self.viewport();
        self.store.add_mark(image_data, self.active_page, &viewport)
    }

    pub fn remove_signature(&mut self, id: MarkId) -> Result<SignatureMark, EngineError> {
        if self.drag.dragged_mark() == Some(id) {
            self.drag.release();
        }
        self.store.remove_mark(id)
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Result<DragUpdate, EngineError> {
        let viewport = self.viewport();
        self.drag
            .handle(event, &mut self.store, self.active_page, &viewport)
    }

    pub fn active_marks(&self) -> impl Iterator<Item = &SignatureMark> + '_ {
        self.store.marks_for_page(self.active_page)
    }

    /// 保存当前页全部标记。成功保存的标记从会话中移除，失败的保留以便重试。
    pub async fn save_current_page<S: SigningService>(
        &mut self,
        service: S,
    ) -> Result<SaveReport, EngineError> {
        let viewport = self.viewport();
        let batcher = PersistenceBatcher::new(service);
        let report = batcher
            .save_current_page(&self.store, self.active_page, &self.document_id, &viewport)
            .await?;

        for id in &report.saved {
            self.store.remove_mark(*id)?;
        }
        info!(
            page = report.page,
            saved = report.saved.len(),
            failed = report.failed.len(),
            "当前页保存完成"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::tests::RecordingService;

    fn rendered_session() -> SigningSession {
        let mut session = SigningSession::new("doc-1", 3);
        session.page_rendered(Size2::new(600.0, 800.0));
        session
    }

    #[test]
    fn add_requires_rendered_page() {
        let mut session = SigningSession::new("doc-1", 1);
        let err = session.add_signature("sig").unwrap_err();
        assert!(matches!(err, EngineError::InvalidViewport { .. }));

        session.page_rendered(Size2::new(600.0, 800.0));
        let mark = session.add_signature("sig").unwrap();
        assert_eq!(mark.position, Point2::new(220.0, 370.0));
        assert_eq!(mark.page_number, 1);
    }

    #[test]
    fn navigation_is_bounded_and_invalidates_measurement() {
        let mut session = rendered_session();
        assert!(matches!(
            session.previous_page().unwrap_err(),
            EngineError::PageOutOfRange { page: 0, page_count: 3 }
        ));
        assert_eq!(session.next_page().unwrap(), 2);
        assert!(!session.viewport().is_measured());
        assert_eq!(session.go_to_page(3).unwrap(), 3);
        assert!(session.next_page().is_err());
        assert_eq!(session.active_page(), 3);
    }

    #[test]
    fn zoom_steps_are_clamped_and_rescale_page_only() {
        let mut session = rendered_session();
        let id = session.add_signature("sig").unwrap().id;

        for _ in 0..20 {
            session.zoom_in();
        }
        assert!((session.scale() - MAX_SCALE).abs() < 1e-9);
        assert_eq!(session.viewport().page_dimensions, Size2::new(1200.0, 1600.0));

        for _ in 0..20 {
            session.zoom_out();
        }
        assert!((session.scale() - MIN_SCALE).abs() < 1e-9);

        // 标记保持原像素位置，不随缩放重排
        let mark = session.store().mark(id).unwrap();
        assert_eq!(mark.position, Point2::new(220.0, 370.0));
        assert_eq!(mark.size, DEFAULT_MARK_SIZE);
    }

    #[test]
    fn changing_page_releases_drag() {
        let mut session = rendered_session();
        session.add_signature("sig").unwrap();
        session
            .handle_pointer(PointerEvent::Down(Point2::new(300.0, 400.0)))
            .unwrap();
        assert!(session.drag().dragged_mark().is_some());
        session.next_page().unwrap();
        assert!(session.drag().dragged_mark().is_none());
    }

    #[test]
    fn drag_on_unrendered_page_reports_viewport_and_keeps_position() {
        let mut session = rendered_session();
        session.next_page().unwrap();
        session.page_rendered(Size2::new(600.0, 800.0));
        let id = session.add_signature("sig").unwrap().id;

        session.previous_page().unwrap();
        session.next_page().unwrap();
        let update = session
            .handle_pointer(PointerEvent::Down(Point2::new(300.0, 400.0)))
            .unwrap();
        assert_eq!(update, DragUpdate::Started(id));

        let err = session
            .handle_pointer(PointerEvent::Move(Point2::new(310.0, 410.0)))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidViewport { .. }));
        assert_eq!(session.store().mark(id).unwrap().position, Point2::new(220.0, 370.0));

        // 页面重新渲染后可继续拖拽
        session.page_rendered(Size2::new(600.0, 800.0));
        let update = session
            .handle_pointer(PointerEvent::Move(Point2::new(310.0, 410.0)))
            .unwrap();
        assert_eq!(
            update,
            DragUpdate::Moved {
                mark: id,
                position: Point2::new(230.0, 380.0)
            }
        );
    }

    #[test]
    fn invalid_options_fall_back_to_defaults() {
        let options = SessionOptions {
            initial_scale: 1.5,
            zoom_step: 0.0,
            mark_size: Size2::new(-10.0, 60.0),
        };
        let mut session = SigningSession::with_options("doc-1", 1, options);
        session.page_rendered(Size2::new(600.0, 800.0));
        assert_eq!(session.store().mark_size(), DEFAULT_MARK_SIZE);
        assert!((session.zoom_in() - 1.6).abs() < 1e-9);

        let options = SessionOptions {
            zoom_step: f64::NAN,
            ..SessionOptions::default()
        }
        .sanitized();
        assert!((options.zoom_step - DEFAULT_ZOOM_STEP).abs() < 1e-12);
    }

    #[test]
    fn removing_dragged_mark_releases_drag() {
        let mut session = rendered_session();
        let id = session.add_signature("sig").unwrap().id;
        session
            .handle_pointer(PointerEvent::Down(Point2::new(300.0, 400.0)))
            .unwrap();
        session.remove_signature(id).unwrap();
        assert!(session.drag().dragged_mark().is_none());
        assert!(session.active_marks().next().is_none());
    }

    #[tokio::test]
    async fn save_removes_saved_marks_and_keeps_failures() {
        let mut session = rendered_session();
        let first = session.add_signature("a").unwrap().id;
        let second = session.add_signature("b").unwrap().id;

        let service = RecordingService::failing_on(vec![0]);
        let report = session.save_current_page(&service).await.unwrap();
        assert_eq!(report.saved, vec![second]);

        let remaining: Vec<MarkId> = session.active_marks().map(|m| m.id).collect();
        assert_eq!(remaining, vec![first]);

        // 重试只重发失败的标记
        let report = session.save_current_page(&service).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(service.calls().len(), 3);
        assert!(session.store().is_empty());
    }
}
