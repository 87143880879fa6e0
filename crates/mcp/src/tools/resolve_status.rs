use std::sync::Arc;

use async_trait::async_trait;
use pmcp::{RequestHandlerExtra, Result as McpResult, ToolHandler};
use serde::Deserialize;
use serde_json::{json, Value};
use taskmark_core::services::TasksService;
use taskmark_core::status::{resolve_status, CompletionTracking};

use super::util::{internal_error, parse_datetime_opt, validation_error, with_service};

pub struct ResolveStatusTool {
    service: Arc<TasksService>,
}

impl ResolveStatusTool {
    pub fn new(service: Arc<TasksService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveStatusArgs {
    id: Option<String>,
    deadline: Option<String>,
    #[serde(default)]
    is_completed: bool,
    completed_at: Option<String>,
    now: Option<String>,
}

#[async_trait]
impl ToolHandler for ResolveStatusTool {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> McpResult<Value> {
        let parsed: ResolveStatusArgs =
            serde_json::from_value(args).map_err(|err| validation_error(err))?;

        if let Some(id) = parsed.id {
            let lookup = id.clone();
            let task = with_service(self.service.clone(), move |service| service.get(&lookup))
                .await
                .map_err(internal_error)?
                .ok_or_else(|| validation_error(format!("task {} not found", id)))?;
            return Ok(json!({
                "status": task.display_status,
                "task": task,
            }));
        }

        let deadline =
            parse_datetime_opt(parsed.deadline.as_deref()).map_err(|err| validation_error(err))?;
        let completed_at = parse_datetime_opt(parsed.completed_at.as_deref())
            .map_err(|err| validation_error(err))?;
        let now = parse_datetime_opt(parsed.now.as_deref())
            .map_err(|err| validation_error(err))?
            .unwrap_or_else(|| self.service.now());

        let completed_at = match self.service.resolver().tracking() {
            CompletionTracking::Recorded => completed_at,
            CompletionTracking::Unavailable => None,
        };
        let status = resolve_status(deadline, parsed.is_completed, completed_at, now);
        Ok(json!({ "status": status }))
    }

    fn metadata(&self) -> Option<pmcp::types::ToolInfo> {
        Some(pmcp::types::ToolInfo {
            name: "resolve_status".to_string(),
            description: Some(
                "Derive ACTIVE/OVERDUE/COMPLETED/LATE for a stored task or for explicit fields"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Resolve a stored task; other fields are ignored"
                    },
                    "deadline": { "type": "string", "format": "date-time" },
                    "isCompleted": { "type": "boolean" },
                    "completedAt": { "type": "string", "format": "date-time" },
                    "now": { "type": "string", "format": "date-time" }
                }
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::tools::util::{test_extra, test_service};

    #[tokio::test]
    async fn resolves_explicit_fields() {
        let tool = ResolveStatusTool::new(test_service());
        let late = tool
            .handle(
                json!({
                    "deadline": "2026-04-24T00:00:00Z",
                    "isCompleted": true,
                    "completedAt": "2026-04-25T08:00:00Z"
                }),
                test_extra(),
            )
            .await
            .expect("resolve");
        assert_eq!(late["status"].as_str(), Some("LATE"));

        let overdue = tool
            .handle(
                json!({
                    "deadline": "2026-04-24T00:00:00Z",
                    "now": "2026-04-24T00:00:01Z"
                }),
                test_extra(),
            )
            .await
            .expect("resolve");
        assert_eq!(overdue["status"].as_str(), Some("OVERDUE"));
    }

    #[tokio::test]
    async fn resolves_stored_task() {
        let service = test_service();
        let created = service
            .submit(None, &taskmark_core::submission::TaskDraft::new("Order groceries"))
            .expect("create");
        let tool = ResolveStatusTool::new(service);

        let response = tool
            .handle(json!({ "id": created.task.id }), test_extra())
            .await
            .expect("resolve");
        assert_eq!(response["status"].as_str(), Some("ACTIVE"));

        let missing = tool.handle(json!({ "id": "nope" }), test_extra()).await;
        assert!(missing.is_err());
    }
}
