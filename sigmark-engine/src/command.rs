use std::collections::HashMap;

use sigmark_core::mark::MarkId;

use crate::session::SigningSession;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub session: &'a mut SigningSession,
}

/// 查看器工具栏命令（翻页、缩放、移除签名）的分发器。
pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(NextPageCommand);
        bus.register(PreviousPageCommand);
        bus.register(GoToPageCommand);
        bus.register(ZoomInCommand);
        bus.register(ZoomOutCommand);
        bus.register(RemoveMarkCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

fn first_arg<T: std::str::FromStr>(request: &CommandRequest) -> Result<T, CommandResponse> {
    let Some(raw) = request.args.first() else {
        return Err(CommandResponse::err(format!("`{}` 缺少参数", request.name)));
    };
    raw.parse()
        .map_err(|_| CommandResponse::err(format!("`{}` 参数无效: {raw}", request.name)))
}

struct NextPageCommand;

impl CommandHandler for NextPageCommand {
    fn name(&self) -> &'static str {
        "next_page"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match context.session.next_page() {
            Ok(page) => CommandResponse::ok(format!("当前第 {page} 页")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct PreviousPageCommand;

impl CommandHandler for PreviousPageCommand {
    fn name(&self) -> &'static str {
        "previous_page"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match context.session.previous_page() {
            Ok(page) => CommandResponse::ok(format!("当前第 {page} 页")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct GoToPageCommand;

impl CommandHandler for GoToPageCommand {
    fn name(&self) -> &'static str {
        "go_to_page"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let page: u32 = match first_arg(request) {
            Ok(page) => page,
            Err(response) => return response,
        };
        match context.session.go_to_page(page) {
            Ok(page) => CommandResponse::ok(format!("当前第 {page} 页")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct ZoomInCommand;

impl CommandHandler for ZoomInCommand {
    fn name(&self) -> &'static str {
        "zoom_in"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let scale = context.session.zoom_in();
        CommandResponse::ok(format!("缩放 {:.0}%", scale * 100.0))
    }
}

struct ZoomOutCommand;

impl CommandHandler for ZoomOutCommand {
    fn name(&self) -> &'static str {
        "zoom_out"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let scale = context.session.zoom_out();
        CommandResponse::ok(format!("缩放 {:.0}%", scale * 100.0))
    }
}

struct RemoveMarkCommand;

impl CommandHandler for RemoveMarkCommand {
    fn name(&self) -> &'static str {
        "remove_mark"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let raw: u64 = match first_arg(request) {
            Ok(raw) => raw,
            Err(response) => return response,
        };
        match context.session.remove_signature(MarkId::new(raw)) {
            Ok(mark) => CommandResponse::ok(format!("签名 #{} 已移除", mark.id)),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use sigmark_core::geometry::Size2;

    use super::*;

    #[test]
    fn navigation_and_zoom_commands_work() {
        let mut session = SigningSession::new("doc", 2);
        let bus = CommandBus::new();
        let mut context = CommandContext {
            session: &mut session,
        };

        let response = bus.dispatch(&CommandRequest::new("next_page"), &mut context);
        assert!(response.success);
        assert_eq!(context.session.active_page(), 2);

        let response = bus.dispatch(&CommandRequest::new("next_page"), &mut context);
        assert!(!response.success);

        let response = bus.dispatch(&CommandRequest::new("go_to_page").with_arg("1"), &mut context);
        assert!(response.success);
        assert_eq!(context.session.active_page(), 1);

        let response = bus.dispatch(&CommandRequest::new("zoom_in"), &mut context);
        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("缩放 110%"));
    }

    #[test]
    fn remove_mark_command_validates_arguments() {
        let mut session = SigningSession::new("doc", 1);
        session.page_rendered(Size2::new(600.0, 800.0));
        let id = session.add_signature("sig").unwrap().id;

        let bus = CommandBus::new();
        let mut context = CommandContext {
            session: &mut session,
        };

        assert!(!bus.dispatch(&CommandRequest::new("remove_mark"), &mut context).success);
        assert!(
            !bus.dispatch(&CommandRequest::new("remove_mark").with_arg("abc"), &mut context)
                .success
        );
        let request = CommandRequest::new("remove_mark").with_arg(id.get().to_string());
        assert!(bus.dispatch(&request, &mut context).success);
        assert!(context.session.store().is_empty());
        assert!(!bus.dispatch(&request, &mut context).success);
    }

    #[test]
    fn unknown_command_is_rejected() {
        let mut session = SigningSession::new("doc", 1);
        let bus = CommandBus::new();
        let mut context = CommandContext {
            session: &mut session,
        };
        let response = bus.dispatch(&CommandRequest::new("rotate"), &mut context);
        assert!(!response.success);
        assert!(bus.available_commands().any(|name| *name == "zoom_out"));
    }
}
