use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use pmcp::{RequestHandlerExtra, Result as McpResult, ToolHandler};
use serde::Deserialize;
use serde_json::{json, Value};
use taskmark_core::filter::FilterChange;
use taskmark_core::model::{DisplayStatus, FilterSelection, Priority, SortField, SortOrder};

use super::util::{internal_error, validation_error};
use crate::session::ListSession;

pub struct ListTasksTool {
    session: ListSession,
}

impl ListTasksTool {
    pub fn new(session: ListSession) -> Self {
        Self { session }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTasksArgs {
    status: Option<String>,
    priority: Option<String>,
    sort_field: Option<String>,
    sort_order: Option<String>,
    #[serde(default)]
    reset: bool,
}

impl ListTasksArgs {
    fn to_changes(&self) -> Result<Vec<FilterChange>> {
        let mut changes = Vec::new();
        if let Some(status) = &self.status {
            changes.push(FilterChange::Status(parse_facet::<DisplayStatus>(status)?));
        }
        if let Some(priority) = &self.priority {
            changes.push(FilterChange::Priority(parse_facet::<Priority>(priority)?));
        }
        if let Some(field) = &self.sort_field {
            changes.push(FilterChange::SortField(parse_facet::<SortField>(field)?));
        }
        if let Some(order) = &self.sort_order {
            changes.push(FilterChange::SortOrder(parse_facet::<SortOrder>(order)?));
        }
        Ok(changes)
    }
}

/// `""` and `"any"` clear a facet.
fn parse_facet<T>(raw: &str) -> Result<Option<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
        return Ok(None);
    }
    T::from_str(trimmed).map(Some)
}

#[async_trait]
impl ToolHandler for ListTasksTool {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> McpResult<Value> {
        let parsed: ListTasksArgs =
            serde_json::from_value(args).map_err(|err| validation_error(err))?;
        let changes = parsed.to_changes().map_err(|err| validation_error(err))?;

        let result = if parsed.reset {
            let mut selection = FilterSelection::default();
            for change in changes {
                change.apply_to(&mut selection);
            }
            self.session.replace(selection).await
        } else if changes.is_empty() {
            self.session.refresh().await
        } else {
            self.session.apply(changes).await
        };
        let listing = result.map_err(internal_error)?;

        Ok(json!({ "listing": listing }))
    }

    fn metadata(&self) -> Option<pmcp::types::ToolInfo> {
        Some(pmcp::types::ToolInfo {
            name: "list_tasks".to_string(),
            description: Some(
                "Change the list filters (or reset them) and load the first page of matching tasks"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["active", "overdue", "completed", "late", "any"]
                    },
                    "priority": {
                        "type": "string",
                        "enum": ["low", "medium", "high", "critical", "any"]
                    },
                    "sortField": {
                        "type": "string",
                        "enum": ["created_at", "deadline", "priority", "any"]
                    },
                    "sortOrder": {
                        "type": "string",
                        "enum": ["asc", "desc", "any"]
                    },
                    "reset": {
                        "type": "boolean",
                        "description": "Clear every filter not given in this call"
                    }
                }
            }),
        })
    }
}
