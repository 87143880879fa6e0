use std::sync::Arc;

use async_trait::async_trait;
use pmcp::{RequestHandlerExtra, Result as McpResult, ToolHandler};
use serde::Deserialize;
use serde_json::{json, Value};
use taskmark_core::parser::parse_title;
use taskmark_core::services::TasksService;

use super::util::{parse_datetime_opt, validation_error};

pub struct ParseTitleTool {
    service: Arc<TasksService>,
}

impl ParseTitleTool {
    pub fn new(service: Arc<TasksService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParseTitleArgs {
    text: String,
    now: Option<String>,
}

#[async_trait]
impl ToolHandler for ParseTitleTool {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> McpResult<Value> {
        let parsed: ParseTitleArgs =
            serde_json::from_value(args).map_err(|err| validation_error(err))?;
        let now = parse_datetime_opt(parsed.now.as_deref())
            .map_err(|err| validation_error(err))?
            .unwrap_or_else(|| self.service.now());

        let result = parse_title(&parsed.text, now);
        let changed = result.title != parsed.text;
        let errors: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();

        Ok(json!({
            "title": result.title,
            "changed": changed,
            "priority": result.priority,
            "deadline": result.deadline,
            "directives": result.directives,
            "errors": result.errors,
            "messages": errors,
        }))
    }

    fn metadata(&self) -> Option<pmcp::types::ToolInfo> {
        Some(pmcp::types::ToolInfo {
            name: "parse_title".to_string(),
            description: Some(
                "Extract !1..!4 priority and !before DD.MM.YYYY deadline directives from a task title"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "required": ["text"],
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Raw title as typed, directives included"
                    },
                    "now": {
                        "type": "string",
                        "format": "date-time",
                        "description": "Reference instant for past-deadline checks (defaults to now)"
                    }
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
    async fn strips_valid_directives() {
        let tool = ParseTitleTool::new(test_service());
        let response = tool
            .handle(json!({ "text": "Call the bank !2" }), test_extra())
            .await
            .expect("parse title");

        assert_eq!(response["title"].as_str(), Some("Call the bank"));
        assert_eq!(response["changed"].as_bool(), Some(true));
        assert_eq!(response["priority"].as_str(), Some("HIGH"));
        assert!(response["errors"].as_array().expect("errors").is_empty());
    }

    #[tokio::test]
    async fn reports_past_deadline_and_keeps_text() {
        let tool = ParseTitleTool::new(test_service());
        let response = tool
            .handle(
                json!({
                    "text": "Задача !before 01.01.2000",
                    "now": "2026-04-10T12:00:00Z"
                }),
                test_extra(),
            )
            .await
            .expect("parse title");

        assert_eq!(response["title"].as_str(), Some("Задача !before 01.01.2000"));
        assert_eq!(response["changed"].as_bool(), Some(false));
        let messages = response["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 1);
        assert!(messages[0]
            .as_str()
            .unwrap_or_default()
            .contains("invalid or past macro deadline"));
    }

    #[tokio::test]
    async fn rejects_malformed_now() {
        let tool = ParseTitleTool::new(test_service());
        let result = tool
            .handle(json!({ "text": "Plan trip", "now": "yesterday" }), test_extra())
            .await;
        assert!(result.is_err());
    }
}
