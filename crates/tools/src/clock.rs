//! Fixed clock tools. The demo airline lives on 01-01-2021 at noon.

use async_trait::async_trait;
use waypoint_core::ConversationContext;
use waypoint_core::error::ToolError;
use waypoint_core::tool::{Tool, ToolResult};

pub const CURRENT_DATE: &str = "01-01-2021";
pub const CURRENT_TIME: &str = "12:00:00";

pub struct CurrentDateTool;

pub struct CurrentTimeTool;

fn no_parameters() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

#[async_trait]
impl Tool for CurrentDateTool {
    fn name(&self) -> &str {
        "current_date_tool"
    }

    fn description(&self) -> &str {
        "Find current date."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_parameters()
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _context: &mut ConversationContext,
    ) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(CURRENT_DATE))
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time_tool"
    }

    fn description(&self) -> &str {
        "Find current time."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        no_parameters()
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _context: &mut ConversationContext,
    ) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(CURRENT_TIME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clock_is_fixed() {
        let mut ctx = ConversationContext::new();
        let date = CurrentDateTool
            .execute(serde_json::json!({}), &mut ctx)
            .await
            .unwrap();
        let time = CurrentTimeTool
            .execute(serde_json::json!({}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(date.output, "01-01-2021");
        assert_eq!(time.output, "12:00:00");
        assert!(ctx.is_empty());
    }
}
