//! Airline FAQ lookup.

use async_trait::async_trait;
use waypoint_core::ConversationContext;
use waypoint_core::error::ToolError;
use waypoint_core::tool::{Tool, ToolResult};

pub const UNKNOWN_ANSWER: &str = "I'm sorry, I don't know the answer to that question.";

/// Answers baggage, seating, and wifi questions by keyword.
pub struct FaqLookupTool;

/// Pick the canned answer for `question`.
pub fn answer(question: &str) -> &'static str {
    let q = question.to_lowercase();
    if q.contains("bag") {
        "You are allowed to bring one bag on the plane. \
         It must be under 50 pounds and 22 inches x 14 inches x 9 inches."
    } else if q.contains("seats") || q.contains("plane") {
        "There are 120 seats on the plane. \
         There are 22 business class seats and 98 economy seats. \
         Exit rows are rows 4 and 16. \
         Rows 5-8 are Economy Plus, with extra legroom."
    } else if q.contains("wifi") {
        "We have free wifi on the plane, join Airline-Wifi"
    } else {
        UNKNOWN_ANSWER
    }
}

#[async_trait]
impl Tool for FaqLookupTool {
    fn name(&self) -> &str {
        "faq_lookup_tool"
    }

    fn description(&self) -> &str {
        "Lookup frequently asked questions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The customer's question"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _context: &mut ConversationContext,
    ) -> Result<ToolResult, ToolError> {
        let question = arguments["question"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'question' argument".into()))?;

        Ok(ToolResult::text(answer(question)))
    }
}
