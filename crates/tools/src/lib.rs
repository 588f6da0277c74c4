//! Airline customer-service tools for Waypoint.
//!
//! FAQ answers, a fixed clock, trip lookup/search/statistics/cancellation
//! over an in-memory dataset, and the seat-map UI trigger.

pub mod clock;
pub mod faq;
pub mod seat_map;
pub mod trip_tools;
pub mod trips;

use waypoint_core::tool::ToolRegistry;

pub use trips::{Trip, TripStatus, TripStore};

/// Size of the generated demo dataset.
pub const SAMPLE_TRIP_COUNT: usize = 200;

/// Every airline tool, sharing one trip table.
pub fn airline_registry(trips: TripStore) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(faq::FaqLookupTool));
    registry.register(Box::new(clock::CurrentDateTool));
    registry.register(Box::new(clock::CurrentTimeTool));
    registry.register(Box::new(trip_tools::LookupTripDataTool::new(trips.clone())));
    registry.register(Box::new(trip_tools::SearchTripsTool::new(trips.clone())));
    registry.register(Box::new(trip_tools::TripStatisticsTool::new(trips.clone())));
    registry.register(Box::new(trip_tools::CancelTripTool::new(trips)));
    registry.register(Box::new(seat_map::DisplaySeatMapTool));
    registry
}

/// The airline tools over the generated sample dataset.
pub fn default_registry() -> ToolRegistry {
    airline_registry(TripStore::sample(SAMPLE_TRIP_COUNT))
}
