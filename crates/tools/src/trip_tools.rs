//! Trip data tools over the shared [`TripStore`].

use async_trait::async_trait;
use std::fmt::Write;
use waypoint_core::ConversationContext;
use waypoint_core::error::ToolError;
use waypoint_core::tool::{Tool, ToolResult};

use crate::trips::{CancelOutcome, TripQuery, TripStore};

/// Look up a trip by booking reference, or a traveler's trips by name.
///
/// A successful booking-reference lookup records the booking, flight, and
/// passenger on the conversation context.
pub struct LookupTripDataTool {
    trips: TripStore,
}

impl LookupTripDataTool {
    pub fn new(trips: TripStore) -> Self {
        Self { trips }
    }
}

#[async_trait]
impl Tool for LookupTripDataTool {
    fn name(&self) -> &str {
        "lookup_trip_data"
    }

    fn description(&self) -> &str {
        "Look up trip information using booking reference or traveler name."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "booking_reference": {
                    "type": "string",
                    "description": "Booking reference such as BK-00000042"
                },
                "traveler_name": {
                    "type": "string",
                    "description": "Full traveler name"
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        context: &mut ConversationContext,
    ) -> Result<ToolResult, ToolError> {
        if let Some(reference) = arguments["booking_reference"].as_str().filter(|s| !s.is_empty()) {
            let Some(trip) = self.trips.by_reference(reference) else {
                return Ok(ToolResult::text(format!(
                    "No trip found for booking reference {reference}"
                )));
            };

            context.set("booking_reference", trip.booking_reference.clone());
            context.set("flight_number", trip.flight_number.clone());
            context.set("passenger_name", trip.traveler_name.clone());

            let output = format!(
                "Found trip data for booking reference {reference}: Destination: {}, \
                 Trip Type: {}, Status: {}, Dates: {} to {}, Flight: {}",
                trip.destination,
                trip.trip_type,
                trip.status,
                trip.start_date,
                trip.end_date,
                trip.flight_number
            );
            return Ok(ToolResult {
                success: true,
                output,
                data: serde_json::to_value(&trip).ok(),
            });
        }

        if let Some(name) = arguments["traveler_name"].as_str().filter(|s| !s.is_empty()) {
            let trips = self.trips.by_traveler(name);
            if trips.is_empty() {
                return Ok(ToolResult::text(format!("No trips found for traveler {name}")));
            }

            let mut output = format!("Found {} trips for {name}:\n", trips.len());
            for trip in trips.iter().take(5) {
                let _ = writeln!(
                    output,
                    "- {} ({}) - {}",
                    trip.destination, trip.start_date, trip.status
                );
            }
            if trips.len() > 5 {
                let _ = write!(output, "... and {} more trips", trips.len() - 5);
            }
            return Ok(ToolResult::text(output));
        }

        Ok(ToolResult::text(
            "Please provide either a booking reference or traveler name to look up trip data.",
        ))
    }
}

/// Filter trips by destination, type, and budget range.
pub struct SearchTripsTool {
    trips: TripStore,
}

impl SearchTripsTool {
    pub fn new(trips: TripStore) -> Self {
        Self { trips }
    }
}

#[async_trait]
impl Tool for SearchTripsTool {
    fn name(&self) -> &str {
        "search_trips"
    }

    fn description(&self) -> &str {
        "Search for trips based on destination, trip type, or budget range."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "destination": {"type": "string"},
                "trip_type": {"type": "string", "enum": ["Business", "Leisure", "Family", "Solo"]},
                "min_budget": {"type": "integer"},
                "max_budget": {"type": "integer"}
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _context: &mut ConversationContext,
    ) -> Result<ToolResult, ToolError> {
        let query: TripQuery = if arguments.is_null() {
            TripQuery::default()
        } else {
            serde_json::from_value(arguments)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?
        };

        let trips = self.trips.search(&query);
        if trips.is_empty() {
            return Ok(ToolResult::text("No trips found matching your criteria."));
        }

        let mut output = format!("Found {} trips matching your criteria:\n", trips.len());
        for trip in trips.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}) - ${} - {}",
                trip.destination, trip.trip_type, trip.budget, trip.start_date
            );
        }
        if trips.len() > 10 {
            let _ = write!(output, "... and {} more trips", trips.len() - 10);
        }
        Ok(ToolResult::text(output))
    }
}

/// Aggregate statistics over the whole dataset.
pub struct TripStatisticsTool {
    trips: TripStore,
}

impl TripStatisticsTool {
    pub fn new(trips: TripStore) -> Self {
        Self { trips }
    }
}

#[async_trait]
impl Tool for TripStatisticsTool {
    fn name(&self) -> &str {
        "get_trip_statistics"
    }

    fn description(&self) -> &str {
        "Get overall trip statistics and insights."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _context: &mut ConversationContext,
    ) -> Result<ToolResult, ToolError> {
        let stats = self.trips.statistics();
        let output = format!(
            "Trip Statistics:\n\
             - Total Trips: {}\n\
             - Completed Trips: {}\n\
             - Upcoming Trips: {}\n\
             - Cancelled Trips: {}\n\
             - Average Rating: {}\n\
             - Average Budget: ${}\n\
             - Most Popular Destination: {}\n\
             - Most Common Trip Type: {}",
            stats.total_trips,
            stats.completed_trips,
            stats.upcoming_trips,
            stats.cancelled_trips,
            stats.average_rating,
            stats.average_budget,
            stats.most_popular_destination,
            stats.most_common_trip_type
        );
        Ok(ToolResult {
            success: true,
            output,
            data: serde_json::to_value(&stats).ok(),
        })
    }
}

/// Cancel an upcoming trip; cancelled trips are immutable afterwards.
pub struct CancelTripTool {
    trips: TripStore,
}

impl CancelTripTool {
    pub fn new(trips: TripStore) -> Self {
        Self { trips }
    }
}

#[async_trait]
impl Tool for CancelTripTool {
    fn name(&self) -> &str {
        "cancel_upcoming_trip_or_booking"
    }

    fn description(&self) -> &str {
        "Cancel an upcoming trip or booking by booking reference or trip id."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "ref": {
                    "type": "string",
                    "description": "Booking reference or trip id"
                }
            },
            "required": ["ref"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _context: &mut ConversationContext,
    ) -> Result<ToolResult, ToolError> {
        let reference = arguments["ref"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'ref' argument".into()))?;

        let output = match self.trips.cancel(reference) {
            CancelOutcome::Cancelled => format!(
                "Trip or booking with reference '{reference}' has been cancelled and is now immutable."
            ),
            CancelOutcome::NotFound | CancelOutcome::NotEligible(_) => format!(
                "No upcoming trip found with reference '{reference}', or it is already cancelled/immutable."
            ),
        };
        Ok(ToolResult::text(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> TripStore {
        TripStore::sample(40)
    }

    fn upcoming_reference(store: &TripStore) -> String {
        store
            .search(&TripQuery::default())
            .into_iter()
            .find(|t| t.status == crate::trips::TripStatus::Upcoming)
            .map(|t| t.booking_reference)
            .unwrap()
    }

    #[tokio::test]
    async fn lookup_by_reference_records_context() {
        let tool = LookupTripDataTool::new(store());
        let mut ctx = ConversationContext::new();
        let result = tool
            .execute(json!({"booking_reference": "BK-00000003"}), &mut ctx)
            .await
            .unwrap();

        assert!(result.output.contains("Found trip data for booking reference BK-00000003"));
        assert_eq!(ctx.get_str("booking_reference"), Some("BK-00000003"));
        assert_eq!(ctx.get_str("flight_number"), Some("FLT-103"));
        assert!(result.data.is_some());
    }

    #[tokio::test]
    async fn lookup_unknown_reference_leaves_context() {
        let tool = LookupTripDataTool::new(store());
        let mut ctx = ConversationContext::new();
        let result = tool
            .execute(json!({"booking_reference": "BK-NOPE"}), &mut ctx)
            .await
            .unwrap();
        assert!(result.output.starts_with("No trip found"));
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn lookup_by_traveler_lists_trips() {
        let tool = LookupTripDataTool::new(store());
        let result = tool
            .execute(json!({"traveler_name": "Traveler_1"}), &mut ConversationContext::new())
            .await
            .unwrap();
        assert!(result.output.starts_with("Found 2 trips for Traveler_1"));
    }

    #[tokio::test]
    async fn lookup_without_arguments_asks_for_them() {
        let tool = LookupTripDataTool::new(store());
        let result = tool
            .execute(json!({}), &mut ConversationContext::new())
            .await
            .unwrap();
        assert!(result.output.starts_with("Please provide"));
    }

    #[tokio::test]
    async fn search_reports_matches() {
        let tool = SearchTripsTool::new(store());
        let result = tool
            .execute(json!({"destination": "tokyo"}), &mut ConversationContext::new())
            .await
            .unwrap();
        assert!(result.output.contains("Tokyo"));

        let none = tool
            .execute(json!({"destination": "Atlantis"}), &mut ConversationContext::new())
            .await
            .unwrap();
        assert_eq!(none.output, "No trips found matching your criteria.");
    }

    #[tokio::test]
    async fn search_rejects_bad_budget() {
        let tool = SearchTripsTool::new(store());
        let err = tool
            .execute(json!({"min_budget": "lots"}), &mut ConversationContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn statistics_summarise_dataset() {
        let tool = TripStatisticsTool::new(store());
        let result = tool
            .execute(json!({}), &mut ConversationContext::new())
            .await
            .unwrap();
        assert!(result.output.contains("Total Trips: 40"));
        assert_eq!(result.data.unwrap()["total_trips"], 40);
    }

    #[tokio::test]
    async fn cancel_is_one_way() {
        let trips = store();
        let reference = upcoming_reference(&trips);
        let tool = CancelTripTool::new(trips.clone());

        let first = tool
            .execute(json!({"ref": reference}), &mut ConversationContext::new())
            .await
            .unwrap();
        assert!(first.output.contains("has been cancelled"));

        let second = tool
            .execute(json!({"ref": reference}), &mut ConversationContext::new())
            .await
            .unwrap();
        assert!(second.output.contains("already cancelled/immutable"));
        assert_eq!(trips.statistics().cancelled_trips, 1);
    }
}
