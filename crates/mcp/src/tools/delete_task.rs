use std::sync::Arc;

use async_trait::async_trait;
use pmcp::{RequestHandlerExtra, Result as McpResult, ToolHandler};
use serde::Deserialize;
use serde_json::{json, Value};
use taskmark_core::services::TasksService;

use super::util::{internal_error, validation_error, with_service};

pub struct DeleteTaskTool {
    service: Arc<TasksService>,
}

impl DeleteTaskTool {
    pub fn new(service: Arc<TasksService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
struct DeleteTaskArgs {
    id: String,
}

#[async_trait]
impl ToolHandler for DeleteTaskTool {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> McpResult<Value> {
        let parsed: DeleteTaskArgs =
            serde_json::from_value(args).map_err(|err| validation_error(err))?;
        let id = parsed.id.clone();
        let deleted = with_service(self.service.clone(), move |service| service.delete(&id))
            .await
            .map_err(internal_error)?;

        Ok(json!({ "id": parsed.id, "deleted": deleted }))
    }

    fn metadata(&self) -> Option<pmcp::types::ToolInfo> {
        Some(pmcp::types::ToolInfo {
            name: "delete_task".to_string(),
            description: Some("Delete a task by id".to_string()),
            input_schema: json!({
                "type": "object",
                "required": ["id"],
                "properties": {
                    "id": { "type": "string" }
                }
            }),
        })
    }
}
