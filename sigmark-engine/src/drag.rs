use sigmark_core::geometry::{Point2, Vector2};
use sigmark_core::mark::{MarkId, ViewportState};
use sigmark_core::transform::pointer_to_render_space;
use tracing::debug;

use crate::errors::EngineError;
use crate::store::OverlayStore;

/// 指针事件，坐标位于指针（客户端）空间，与具体事件分发机制无关。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point2),
    Move(Point2),
    Up,
    /// 指针离开交互区域，按释放处理。
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(MarkId),
}

/// 单次事件处理的结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragUpdate {
    Ignored,
    Started(MarkId),
    Moved { mark: MarkId, position: Point2 },
    Released(MarkId),
}

/// 拖拽状态机：`Idle` ⇄ `Dragging(mark)`。
#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    container_origin: Point2,
}

impl DragController {
    pub fn new(container_origin: Point2) -> Self {
        Self {
            state: DragState::Idle,
            container_origin,
        }
    }

    #[inline]
    pub fn state(&self) -> DragState {
        self.state
    }

    #[inline]
    pub fn dragged_mark(&self) -> Option<MarkId> {
        match self.state {
            DragState::Dragging(id) => Some(id),
            DragState::Idle => None,
        }
    }

    #[inline]
    pub fn container_origin(&self) -> Point2 {
        self.container_origin
    }

    /// 容器滚动或重新布局后更新原点。
    pub fn set_container_origin(&mut self, origin: Point2) {
        self.container_origin = origin;
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        store: &mut OverlayStore,
        page_number: u32,
        viewport: &ViewportState,
    ) -> Result<DragUpdate, EngineError> {
        match event {
            PointerEvent::Down(pointer) => Ok(self
                .pointer_down(pointer, store, page_number)
                .map_or(DragUpdate::Ignored, DragUpdate::Started)),
            PointerEvent::Move(pointer) => {
                let moved = self.pointer_move(pointer, store, viewport)?;
                Ok(match (self.dragged_mark(), moved) {
                    (Some(mark), Some(position)) => DragUpdate::Moved { mark, position },
                    _ => DragUpdate::Ignored,
                })
            }
            PointerEvent::Up | PointerEvent::Leave => {
                Ok(self.release().map_or(DragUpdate::Ignored, DragUpdate::Released))
            }
        }
    }

    /// 指针按下：命中当前页的标记则进入拖拽状态。未命中时状态不变。
    pub fn pointer_down(
        &mut self,
        pointer: Point2,
        store: &OverlayStore,
        page_number: u32,
    ) -> Option<MarkId> {
        let local = pointer_to_render_space(pointer, self.container_origin, Vector2::new(0.0, 0.0));
        let hit = store.hit_test(page_number, local)?;
        self.state = DragState::Dragging(hit);
        debug!(id = hit.get(), page = page_number, "开始拖拽签名标记");
        Some(hit)
    }

    /// 拖拽中移动指针：标记中心跟随指针，位置由存储负责限制。空闲时忽略。
    pub fn pointer_move(
        &mut self,
        pointer: Point2,
        store: &mut OverlayStore,
        viewport: &ViewportState,
    ) -> Result<Option<Point2>, EngineError> {
        let DragState::Dragging(id) = self.state else {
            return Ok(None);
        };
        let Some(mark) = store.mark(id) else {
            self.state = DragState::Idle;
            return Err(EngineError::MarkNotFound(id.get()));
        };
        let target = pointer_to_render_space(pointer, self.container_origin, mark.size.half());
        let stored = store.update_position(id, target, viewport)?;
        Ok(Some(stored))
    }

    /// 释放（抬起或离开）：回到空闲状态，返回此前拖拽的标记。
    pub fn release(&mut self) -> Option<MarkId> {
        let previous = self.dragged_mark();
        self.state = DragState::Idle;
        if let Some(id) = previous {
            debug!(id = id.get(), "结束拖拽签名标记");
        }
        previous
    }
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(Point2::origin())
    }
}
