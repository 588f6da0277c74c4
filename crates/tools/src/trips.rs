//! In-memory traveler trip dataset.
//!
//! Backs the trip lookup, search, statistics, and cancellation tools. The
//! sample dataset is generated deterministically so tool output is stable
//! across runs and tests.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Trips ending on or before this date are completed.
pub const REFERENCE_DATE: &str = "2021-01-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripStatus {
    Completed,
    Upcoming,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::Upcoming => write!(f, "Upcoming"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    pub traveler_name: String,
    pub destination: String,
    pub trip_type: String,
    pub start_date: String,
    pub end_date: String,
    pub duration_days: u32,
    pub budget: u32,
    pub accommodation_type: String,
    pub transportation: String,
    pub group_size: u32,
    pub rating: f64,
    pub status: TripStatus,
    pub booking_reference: String,
    pub flight_number: String,
    pub seat_preference: String,
    pub special_requests: String,
}

/// Search filters; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripQuery {
    pub destination: Option<String>,
    pub trip_type: Option<String>,
    pub min_budget: Option<u32>,
    pub max_budget: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripStatistics {
    pub total_trips: usize,
    pub completed_trips: usize,
    pub upcoming_trips: usize,
    pub cancelled_trips: usize,
    pub average_rating: f64,
    pub average_budget: f64,
    pub most_popular_destination: String,
    pub most_common_trip_type: String,
}

/// Why a cancellation did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    NotFound,
    /// Completed or already cancelled; cancelled trips are immutable
    NotEligible(TripStatus),
}

/// Shared, mutable trip table.
#[derive(Clone)]
pub struct TripStore {
    trips: Arc<RwLock<Vec<Trip>>>,
}

const DESTINATIONS: &[&str] = &[
    "New York", "London", "Paris", "Tokyo", "Sydney", "Toronto", "Berlin", "Rome",
    "Chicago", "San Diego",
];
const TRIP_TYPES: &[&str] = &["Business", "Leisure", "Family", "Solo"];
const ACCOMMODATIONS: &[&str] = &["Hotel", "Airbnb", "Hostel", "Resort", "Apartment"];
const TRANSPORT: &[&str] = &["Flight", "Train", "Car", "Bus"];
const SEATS: &[&str] = &["Window", "Aisle", "Middle", "Exit Row"];
const REQUESTS: &[&str] = &["None", "Vegetarian Meal", "Wheelchair Access", "Extra Legroom"];

impl TripStore {
    pub fn new(trips: Vec<Trip>) -> Self {
        Self {
            trips: Arc::new(RwLock::new(trips)),
        }
    }

    /// A deterministic sample of `count` trips around the reference date.
    pub fn sample(count: usize) -> Self {
        let base = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap_or_default();
        let reference = NaiveDate::parse_from_str(REFERENCE_DATE, "%Y-%m-%d").unwrap_or(base);

        let trips = (1..=count)
            .map(|i| {
                let start = base + Duration::days(((i * 37) % 365) as i64);
                let duration = (i % 14 + 1) as u32;
                let end = start + Duration::days(duration as i64);
                let status = if end <= reference {
                    TripStatus::Completed
                } else {
                    TripStatus::Upcoming
                };
                Trip {
                    trip_id: format!("TRP-{i:06}"),
                    traveler_name: format!("Traveler_{}", (i - 1) % (count / 2).max(1) + 1),
                    destination: DESTINATIONS[i % DESTINATIONS.len()].to_string(),
                    trip_type: TRIP_TYPES[i % TRIP_TYPES.len()].to_string(),
                    start_date: start.format("%Y-%m-%d").to_string(),
                    end_date: end.format("%Y-%m-%d").to_string(),
                    duration_days: duration,
                    budget: 500 + ((i * 293) % 4500) as u32,
                    accommodation_type: ACCOMMODATIONS[i % ACCOMMODATIONS.len()].to_string(),
                    transportation: TRANSPORT[i % TRANSPORT.len()].to_string(),
                    group_size: (i % 7 + 1) as u32,
                    rating: 3.0 + ((i * 7) % 21) as f64 / 10.0,
                    status,
                    booking_reference: format!("BK-{i:08}"),
                    flight_number: format!("FLT-{}", i % 900 + 100),
                    seat_preference: SEATS[i % SEATS.len()].to_string(),
                    special_requests: REQUESTS[i % REQUESTS.len()].to_string(),
                }
            })
            .collect::<Vec<_>>();

        info!(count = trips.len(), "Generated sample trip dataset");
        Self::new(trips)
    }

    pub fn len(&self) -> usize {
        self.trips.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find by booking reference or trip id.
    pub fn by_reference(&self, reference: &str) -> Option<Trip> {
        let trips = self.trips.read().ok()?;
        trips
            .iter()
            .find(|t| t.booking_reference == reference || t.trip_id == reference)
            .cloned()
    }

    pub fn by_traveler(&self, traveler_name: &str) -> Vec<Trip> {
        self.trips
            .read()
            .map(|trips| {
                trips
                    .iter()
                    .filter(|t| t.traveler_name.eq_ignore_ascii_case(traveler_name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn search(&self, query: &TripQuery) -> Vec<Trip> {
        let destination = query.destination.as_ref().map(|d| d.to_lowercase());
        self.trips
            .read()
            .map(|trips| {
                trips
                    .iter()
                    .filter(|t| {
                        destination
                            .as_ref()
                            .is_none_or(|d| t.destination.to_lowercase().contains(d))
                    })
                    .filter(|t| query.trip_type.as_ref().is_none_or(|ty| &t.trip_type == ty))
                    .filter(|t| query.min_budget.is_none_or(|min| t.budget >= min))
                    .filter(|t| query.max_budget.is_none_or(|max| t.budget <= max))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn statistics(&self) -> TripStatistics {
        let trips = match self.trips.read() {
            Ok(t) => t.clone(),
            Err(_) => Vec::new(),
        };
        let count = |s: TripStatus| trips.iter().filter(|t| t.status == s).count();
        let total = trips.len();
        let mean = |sum: f64| {
            if total == 0 {
                0.0
            } else {
                (sum / total as f64 * 100.0).round() / 100.0
            }
        };

        TripStatistics {
            total_trips: total,
            completed_trips: count(TripStatus::Completed),
            upcoming_trips: count(TripStatus::Upcoming),
            cancelled_trips: count(TripStatus::Cancelled),
            average_rating: mean(trips.iter().map(|t| t.rating).sum()),
            average_budget: mean(trips.iter().map(|t| t.budget as f64).sum()),
            most_popular_destination: mode(trips.iter().map(|t| t.destination.as_str())),
            most_common_trip_type: mode(trips.iter().map(|t| t.trip_type.as_str())),
        }
    }

    /// Cancel an upcoming trip. Only `Upcoming` trips can be cancelled;
    /// a cancelled trip never changes again.
    pub fn cancel(&self, reference: &str) -> CancelOutcome {
        let Ok(mut trips) = self.trips.write() else {
            return CancelOutcome::NotFound;
        };
        let Some(trip) = trips
            .iter_mut()
            .find(|t| t.booking_reference == reference || t.trip_id == reference)
        else {
            return CancelOutcome::NotFound;
        };

        if trip.status != TripStatus::Upcoming {
            return CancelOutcome::NotEligible(trip.status);
        }
        trip.status = TripStatus::Cancelled;
        info!(reference = %reference, "Trip cancelled");
        CancelOutcome::Cancelled
    }
}

/// Most frequent value; ties go to the alphabetically first.
fn mode<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(v, _)| v.to_string())
        .unwrap_or_else(|| "N/A".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(reference: &str, status: TripStatus) -> Trip {
        Trip {
            trip_id: format!("TRP-{reference}"),
            traveler_name: "Ada Lovelace".into(),
            destination: "Paris".into(),
            trip_type: "Leisure".into(),
            start_date: "2021-02-01".into(),
            end_date: "2021-02-05".into(),
            duration_days: 4,
            budget: 1200,
            accommodation_type: "Hotel".into(),
            transportation: "Flight".into(),
            group_size: 1,
            rating: 4.5,
            status,
            booking_reference: reference.into(),
            flight_number: "FLT-123".into(),
            seat_preference: "Window".into(),
            special_requests: "None".into(),
        }
    }

    #[test]
    fn sample_is_deterministic() {
        let a = TripStore::sample(20);
        let b = TripStore::sample(20);
        assert_eq!(a.len(), 20);
        assert_eq!(a.by_reference("BK-00000007"), b.by_reference("BK-00000007"));
        assert_eq!(
            a.by_reference("TRP-000007").unwrap().booking_reference,
            "BK-00000007"
        );
    }

    #[test]
    fn sample_status_follows_reference_date() {
        let store = TripStore::sample(50);
        let stats = store.statistics();
        assert_eq!(stats.total_trips, 50);
        assert_eq!(stats.completed_trips + stats.upcoming_trips, 50);
        assert!(stats.completed_trips > 0);
        assert!(stats.upcoming_trips > 0);
    }

    #[test]
    fn cancel_only_upcoming_and_then_immutable() {
        let store = TripStore::new(vec![
            trip("BK-1", TripStatus::Upcoming),
            trip("BK-2", TripStatus::Completed),
        ]);

        assert_eq!(store.cancel("BK-1"), CancelOutcome::Cancelled);
        assert_eq!(
            store.cancel("BK-1"),
            CancelOutcome::NotEligible(TripStatus::Cancelled)
        );
        assert_eq!(
            store.cancel("BK-2"),
            CancelOutcome::NotEligible(TripStatus::Completed)
        );
        assert_eq!(store.cancel("BK-9"), CancelOutcome::NotFound);
        assert_eq!(store.statistics().cancelled_trips, 1);
    }

    #[test]
    fn search_filters_combine() {
        let mut cheap = trip("BK-1", TripStatus::Upcoming);
        cheap.budget = 600;
        let mut rome = trip("BK-2", TripStatus::Upcoming);
        rome.destination = "Rome".into();
        let store = TripStore::new(vec![cheap, rome, trip("BK-3", TripStatus::Upcoming)]);

        let paris = store.search(&TripQuery {
            destination: Some("par".into()),
            ..TripQuery::default()
        });
        assert_eq!(paris.len(), 2);

        let cheap_paris = store.search(&TripQuery {
            destination: Some("paris".into()),
            max_budget: Some(1000),
            ..TripQuery::default()
        });
        assert_eq!(cheap_paris.len(), 1);
        assert_eq!(cheap_paris[0].booking_reference, "BK-1");
    }

    #[test]
    fn mode_breaks_ties_alphabetically() {
        assert_eq!(mode(["b", "a", "b", "a"].into_iter()), "a");
        assert_eq!(mode(std::iter::empty()), "N/A");
    }
}
