use std::sync::Arc;

use async_trait::async_trait;
use pmcp::{RequestHandlerExtra, Result as McpResult, ToolHandler};
use serde::Deserialize;
use serde_json::{json, Value};
use taskmark_core::services::TasksService;

use super::util::{internal_error, validation_error, with_service};

pub struct SetCompletionTool {
    service: Arc<TasksService>,
}

impl SetCompletionTool {
    pub fn new(service: Arc<TasksService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetCompletionArgs {
    id: String,
    completed: bool,
}

#[async_trait]
impl ToolHandler for SetCompletionTool {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> McpResult<Value> {
        let parsed: SetCompletionArgs =
            serde_json::from_value(args).map_err(|err| validation_error(err))?;

        let id = parsed.id.clone();
        let completed = parsed.completed;
        let task = with_service(self.service.clone(), move |service| {
            service.set_completion(&id, completed)
        })
        .await
        .map_err(internal_error)?
        .ok_or_else(|| validation_error(format!("task {} not found", parsed.id)))?;

        Ok(json!({ "task": task }))
    }

    fn metadata(&self) -> Option<pmcp::types::ToolInfo> {
        Some(pmcp::types::ToolInfo {
            name: "set_completion".to_string(),
            description: Some(
                "Mark a task completed or reopen it; returns the task with its resolved status"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "required": ["id", "completed"],
                "properties": {
                    "id": { "type": "string" },
                    "completed": { "type": "boolean" }
                }
            }),
        })
    }
}
