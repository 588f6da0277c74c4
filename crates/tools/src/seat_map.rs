//! Seat map trigger. The front end renders a seat picker when it sees
//! this tool being called; the tool itself only acknowledges.

use async_trait::async_trait;
use waypoint_core::ConversationContext;
use waypoint_core::error::ToolError;
use waypoint_core::tool::{Tool, ToolResult};

pub struct DisplaySeatMapTool;

#[async_trait]
impl Tool for DisplaySeatMapTool {
    fn name(&self) -> &str {
        "display_seat_map"
    }

    fn description(&self) -> &str {
        "Display an interactive seat map to the customer so they can choose a new seat."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _context: &mut ConversationContext,
    ) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text("DISPLAY_SEAT_MAP"))
    }
}
