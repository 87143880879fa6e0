mod delete_task;
mod get_task;
mod list_tasks;
mod next_page;
mod parse_title;
mod resolve_status;
mod set_completion;
mod submit_task;
pub(crate) mod util;

use std::sync::Arc;

use pmcp::ServerBuilder;
use taskmark_core::services::TasksService;

use crate::session::ListSession;

pub const TOOL_NAMES: [&str; 8] = [
    "parse_title",
    "resolve_status",
    "submit_task",
    "set_completion",
    "get_task",
    "delete_task",
    "list_tasks",
    "next_page",
];

pub fn register(
    builder: ServerBuilder,
    service: Arc<TasksService>,
    session: ListSession,
) -> ServerBuilder {
    builder
        .tool(
            "parse_title",
            parse_title::ParseTitleTool::new(service.clone()),
        )
        .tool(
            "resolve_status",
            resolve_status::ResolveStatusTool::new(service.clone()),
        )
        .tool(
            "submit_task",
            submit_task::SubmitTaskTool::new(service.clone()),
        )
        .tool(
            "set_completion",
            set_completion::SetCompletionTool::new(service.clone()),
        )
        .tool("get_task", get_task::GetTaskTool::new(service.clone()))
        .tool("delete_task", delete_task::DeleteTaskTool::new(service))
        .tool(
            "list_tasks",
            list_tasks::ListTasksTool::new(session.clone()),
        )
        .tool("next_page", next_page::NextPageTool::new(session))
}
