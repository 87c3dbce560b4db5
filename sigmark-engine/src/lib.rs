pub mod command;
pub mod drag;
pub mod persist;
pub mod session;

pub mod errors {
    use thiserror::Error;

    use crate::persist::ServiceError;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("page is not measured yet ({width}x{height})")]
        InvalidViewport { width: f64, height: f64 },
        #[error("signature mark with id {0} not found")]
        MarkNotFound(u64),
        #[error("page {page} has no signature marks to save")]
        NoMarks { page: u32 },
        #[error("failed to save signature mark {mark}: {source}")]
        Persistence {
            mark: u64,
            #[source]
            source: ServiceError,
        },
        #[error("page {page} is out of range (document has {page_count} pages)")]
        PageOutOfRange { page: u32, page_count: u32 },
        #[error("page numbers start at 1, got {0}")]
        InvalidPage(u32),
        #[error("position ({x}, {y}) is not finite")]
        InvalidPosition { x: f64, y: f64 },
    }
}

pub mod store {
    use sigmark_core::geometry::{Point2, Size2};
    use sigmark_core::mark::{DEFAULT_MARK_SIZE, MarkId, SignatureMark, ViewportState};
    use sigmark_core::transform::{centered_position, clamp_position};
    use tracing::debug;

    use crate::errors::EngineError;

    /// 单个文档编辑会话内的签名标记集合，保持插入顺序。
    #[derive(Debug)]
    pub struct OverlayStore {
        marks: Vec<SignatureMark>,
        next_mark_id: u64,
        mark_size: Size2,
    }

    impl OverlayStore {
        pub fn new() -> Self {
            Self::with_mark_size(DEFAULT_MARK_SIZE)
        }

        /// 使用自定义标记尺寸创建存储，新建标记均采用该尺寸。
        pub fn with_mark_size(mark_size: Size2) -> Self {
            Self {
                marks: Vec::new(),
                next_mark_id: 0,
                mark_size,
            }
        }

        #[inline]
        pub fn mark_size(&self) -> Size2 {
            self.mark_size
        }

        /// 在页面中央新建标记。页面尚未测量时返回 `InvalidViewport`。
        pub fn add_mark(
            &mut self,
            image_data: impl Into<String>,
            page_number: u32,
            viewport: &ViewportState,
        ) -> Result<SignatureMark, EngineError> {
            if page_number == 0 {
                return Err(EngineError::InvalidPage(page_number));
            }
            let page = measured_page(viewport)?;

            let mark = SignatureMark {
                id: self.next_id(),
                image_data: image_data.into(),
                position: centered_position(self.mark_size, page),
                size: self.mark_size,
                page_number,
            };
            debug!(
                id = mark.id.get(),
                page = page_number,
                x = mark.position.x(),
                y = mark.position.y(),
                "已添加签名标记"
            );
            self.marks.push(mark.clone());
            Ok(mark)
        }

        pub fn remove_mark(&mut self, id: MarkId) -> Result<SignatureMark, EngineError> {
            let index = self.index_of(id)?;
            let mark = self.marks.remove(index);
            debug!(id = id.get(), page = mark.page_number, "已移除签名标记");
            Ok(mark)
        }

        /// 按当前视口尺寸限制位置后写入，返回实际存储的位置。
        pub fn update_position(
            &mut self,
            id: MarkId,
            new_position: Point2,
            viewport: &ViewportState,
        ) -> Result<Point2, EngineError> {
            let index = self.index_of(id)?;
            let page = measured_page(viewport)?;
            if !new_position.as_vec2().is_finite() {
                return Err(EngineError::InvalidPosition {
                    x: new_position.x(),
                    y: new_position.y(),
                });
            }
            let mark = &mut self.marks[index];
            mark.position = clamp_position(new_position, mark.size, page);
            Ok(mark.position)
        }

        /// 按插入顺序返回指定页的标记。
        pub fn marks_for_page(&self, page_number: u32) -> impl Iterator<Item = &SignatureMark> + '_ {
            self.marks
                .iter()
                .filter(move |mark| mark.page_number == page_number)
        }

        #[inline]
        pub fn marks(&self) -> impl Iterator<Item = &SignatureMark> + '_ {
            self.marks.iter()
        }

        pub fn mark(&self, id: MarkId) -> Option<&SignatureMark> {
            self.marks.iter().find(|mark| mark.id == id)
        }

        /// 渲染空间命中测试：后添加的标记绘制在上层，因此优先命中。
        pub fn hit_test(&self, page_number: u32, point: Point2) -> Option<MarkId> {
            self.marks
                .iter()
                .rev()
                .filter(|mark| mark.page_number == page_number)
                .find(|mark| mark.bounds().contains(point))
                .map(|mark| mark.id)
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.marks.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.marks.is_empty()
        }

        /// 清空全部标记；ID 计数器不回退。
        pub fn clear(&mut self) {
            self.marks.clear();
        }

        fn index_of(&self, id: MarkId) -> Result<usize, EngineError> {
            self.marks
                .iter()
                .position(|mark| mark.id == id)
                .ok_or(EngineError::MarkNotFound(id.get()))
        }

        fn next_id(&mut self) -> MarkId {
            let id = MarkId::new(self.next_mark_id);
            self.next_mark_id += 1;
            id
        }
    }

    impl Default for OverlayStore {
        fn default() -> Self {
            Self::new()
        }
    }

    fn measured_page(viewport: &ViewportState) -> Result<Size2, EngineError> {
        let page = viewport.page_dimensions;
        if page.is_measured() {
            Ok(page)
        } else {
            Err(EngineError::InvalidViewport {
                width: page.width,
                height: page.height,
            })
        }
    }

}
