use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use pmcp::{RequestHandlerExtra, Result as McpResult, ToolHandler};
use serde::Deserialize;
use serde_json::{json, Value};
use taskmark_core::model::Priority;
use taskmark_core::services::{SubmitError, TasksService};
use taskmark_core::submission::TaskDraft;

use super::util::{internal_error, parse_datetime_opt, validation_error, with_service};

pub struct SubmitTaskTool {
    service: Arc<TasksService>,
}

impl SubmitTaskTool {
    pub fn new(service: Arc<TasksService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitTaskArgs {
    id: Option<String>,
    title: String,
    description: Option<String>,
    priority: Option<String>,
    deadline: Option<String>,
}

#[async_trait]
impl ToolHandler for SubmitTaskTool {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> McpResult<Value> {
        let parsed: SubmitTaskArgs =
            serde_json::from_value(args).map_err(|err| validation_error(err))?;

        let priority = parsed
            .priority
            .as_deref()
            .map(Priority::from_str)
            .transpose()
            .map_err(|err| validation_error(err))?;
        let deadline =
            parse_datetime_opt(parsed.deadline.as_deref()).map_err(|err| validation_error(err))?;

        let id = parsed.id;
        let title = parsed.title;
        let description = parsed.description;
        let outcome = with_service(self.service.clone(), move |service| {
            let mut draft = match id.as_deref() {
                Some(id) => match service.draft_for(id)? {
                    Some(draft) => draft,
                    None => return Ok(Err(SubmitError::NotFound(id.to_string()))),
                },
                None => TaskDraft::default(),
            };
            draft.title = title;
            if description.is_some() {
                draft.description = description;
            }
            if priority.is_some() {
                draft.priority = priority;
            }
            if deadline.is_some() {
                draft.deadline = deadline;
            }
            Ok(service.submit(id.as_deref(), &draft))
        })
        .await
        .map_err(internal_error)?;

        match outcome {
            Ok(task) => Ok(json!({ "task": task })),
            Err(SubmitError::Api(err)) => Err(internal_error(err)),
            Err(err) => Err(validation_error(err)),
        }
    }

    fn metadata(&self) -> Option<pmcp::types::ToolInfo> {
        Some(pmcp::types::ToolInfo {
            name: "submit_task".to_string(),
            description: Some(
                "Create a task, or update one when id is given. Title directives override the other fields"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "required": ["title"],
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Existing task id to update"
                    },
                    "title": {
                        "type": "string",
                        "description": "Title as typed, may contain !1..!4 and !before DD.MM.YYYY"
                    },
                    "description": { "type": "string" },
                    "priority": {
                        "type": "string",
                        "enum": ["low", "medium", "high", "critical"]
                    },
                    "deadline": {
                        "type": "string",
                        "format": "date-time"
                    }
                }
            }),
        })
    }
}
