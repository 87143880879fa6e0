use async_trait::async_trait;
use pmcp::{RequestHandlerExtra, Result as McpResult, ToolHandler};
use serde_json::{json, Value};

use super::util::internal_error;
use crate::session::ListSession;

pub struct NextPageTool {
    session: ListSession,
}

impl NextPageTool {
    pub fn new(session: ListSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ToolHandler for NextPageTool {
    async fn handle(&self, _args: Value, _extra: RequestHandlerExtra) -> McpResult<Value> {
        let listing = self.session.next_page().await.map_err(internal_error)?;
        let loaded = listing.outcome.is_some();
        Ok(json!({ "loaded": loaded, "listing": listing }))
    }

    fn metadata(&self) -> Option<pmcp::types::ToolInfo> {
        Some(pmcp::types::ToolInfo {
            name: "next_page".to_string(),
            description: Some(
                "Append the next page of the current listing; loaded is false when nothing is left"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        })
    }
}
