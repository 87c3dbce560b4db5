use sigmark_config::AppConfig;
use sigmark_core::geometry::{Point2, Size2};
use sigmark_core::transform::render_to_pdf_space;
use sigmark_engine::command::{CommandBus, CommandContext, CommandRequest};
use sigmark_engine::drag::PointerEvent;
use sigmark_engine::errors::EngineError;
use sigmark_engine::persist::{SaveReport, SigningService};
use sigmark_engine::session::{SessionOptions, SigningSession};
use tracing::{info, warn};

const SAMPLE_SIGNATURE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
const CONTAINER_ORIGIN: Point2 = Point2::new(16.0, 96.0);

/// 演示参数，可由命令行覆盖。
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub document_id: String,
    pub page_count: u32,
    /// 页面固有尺寸（PDF 点），默认 US Letter。
    pub page_size: Size2,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            document_id: "1".to_string(),
            page_count: 2,
            page_size: Size2::new(612.0, 792.0),
        }
    }
}

pub fn session_options(config: &AppConfig) -> SessionOptions {
    SessionOptions {
        initial_scale: config.viewer.initial_scale,
        zoom_step: config.viewer.zoom_step,
        mark_size: Size2::new(config.viewer.mark_width, config.viewer.mark_height),
    }
}

/// 脚本化的签名流程：第一页放置并拖拽签名，翻到第二页再放置一个不参与保存的签名，最后保存第一页。
pub async fn run_demo<S: SigningService>(
    config: &AppConfig,
    options: &DemoOptions,
    service: S,
) -> Result<SaveReport, EngineError> {
    let mut session = SigningSession::with_options(
        options.document_id.clone(),
        options.page_count,
        session_options(config),
    );
    session.set_container_origin(CONTAINER_ORIGIN);
    session.page_rendered(options.page_size);

    let bus = CommandBus::new();
    let commands: Vec<&str> = bus.available_commands().copied().collect();
    println!("支持的命令: {}", commands.join(", "));

    let mark = session.add_signature(SAMPLE_SIGNATURE)?;
    println!(
        "已添加签名 #{} 于第 {} 页 ({:.1}, {:.1})",
        mark.id,
        mark.page_number,
        mark.position.x(),
        mark.position.y()
    );

    // 拖到页面左下角附近：左上角 (50, 高度 - 100)
    let viewport = session.viewport();
    let target = Point2::new(50.0, viewport.page_dimensions.height - 100.0);
    let grab = mark.bounds().center().translate(Point2::origin().vector_to(CONTAINER_ORIGIN));
    let pointer = target
        .translate(mark.size.half())
        .translate(Point2::origin().vector_to(CONTAINER_ORIGIN));
    for event in [
        PointerEvent::Down(grab),
        PointerEvent::Move(pointer),
        PointerEvent::Up,
    ] {
        let update = session.handle_pointer(event)?;
        info!(?event, ?update, "指针事件");
    }

    let request = CommandRequest::new("next_page");
    let response = bus.dispatch(
        &request,
        &mut CommandContext {
            session: &mut session,
        },
    );
    if !response.success {
        warn!(command = %request.name, message = ?response.message, "命令执行失败");
    }
    if session.active_page() != 1 {
        session.page_rendered(options.page_size);
        let other = session.add_signature(SAMPLE_SIGNATURE)?;
        println!("已添加签名 #{} 于第 {} 页（不随第一页保存）", other.id, other.page_number);
        session.go_to_page(1)?;
        session.page_rendered(options.page_size);
    }

    let viewport = session.viewport();
    for mark in session.active_marks() {
        let pdf = render_to_pdf_space(
            mark.position,
            mark.size,
            viewport.page_dimensions.height,
            viewport.scale,
        );
        println!(
            "签名 #{}: 渲染坐标=({:.1}, {:.1}) 缩放={:.2} → PDF 坐标=({:.1}, {:.1})",
            mark.id,
            mark.position.x(),
            mark.position.y(),
            viewport.scale,
            pdf.x(),
            pdf.y()
        );
    }

    let report = session.save_current_page(service).await?;
    println!(
        "第 {} 页保存完成：成功 {} 个，失败 {} 个，会话剩余 {} 个签名",
        report.page,
        report.saved.len(),
        report.failed.len(),
        session.store().len()
    );
    Ok(report)
}
