//! Star schema model and builders
//!
//! Four dimensions (time, plane, city, user) and one fact table of flights.
//! Everything here is a pure function of a [`SourceSnapshot`]: building twice
//! from the same snapshot yields equal values and equal fingerprints.
//!
//! Null meanings:
//! - `FlightFactRow::time_id`: itinerary missing, or its departure date is
//!   missing or unparseable
//! - `FlightFactRow::origin_city_id` / `destination_city_id`: itinerary, airport
//!   or the airport's city mapping missing
//! - `PlaneDimRow::airline_name` / `model_name`: no catalog entry for the id
//! - `UserDimRow::residence_city_name`: no city entry for the residence id
//! - `UserDimRow::full_name`: both name parts missing or blank

mod dimensions;
mod facts;

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::source::SourceSnapshot;

pub use dimensions::{
    TimeDimension, build_city_dimension, build_plane_dimension, build_time_dimension,
    build_user_dimension, full_name, half_year,
};
pub use facts::build_fact_table;

/// Row of `dim_tiempo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDimRow {
    /// Surrogate key, 1..N over ascending dates
    pub id: i32,
    pub date: NaiveDate,
    pub year: i32,
    pub month: u8,
    /// 1 for January–June, 2 for July–December
    pub half_year: u8,
}

impl TimeDimRow {
    /// Build the row for a date and its surrogate key
    pub fn new(id: i32, date: NaiveDate) -> Self {
        let month = date.month() as u8;
        Self {
            id,
            date,
            year: date.year(),
            month,
            half_year: half_year(month),
        }
    }

    /// The date at midnight, as stored in `fecha`
    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(chrono::NaiveTime::MIN)
    }
}

/// Row of `dim_avion`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneDimRow {
    /// Source plane id
    pub id: i64,
    pub name: Option<String>,
    pub airline_name: Option<String>,
    pub model_name: Option<String>,
}

/// Row of `dim_ciudad`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityDimRow {
    /// Source city id
    pub id: i64,
    pub name: Option<String>,
}

/// Row of `dim_usuario`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDimRow {
    /// National identity number
    pub id: i64,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub residence_city_name: Option<String>,
}

/// Row of `hecho_vuelos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightFactRow {
    pub time_id: Option<i32>,
    pub plane_id: Option<i64>,
    pub user_id: Option<i64>,
    pub origin_city_id: Option<i64>,
    pub destination_city_id: Option<i64>,
    pub cost: Option<i64>,
    /// Always 1
    pub flight_count: u8,
}

/// Counts of tolerated data-quality problems found while transforming
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStats {
    /// Itineraries with a departure value that could not be parsed
    pub unparseable_departures: usize,
    /// Itineraries with no departure value at all
    pub missing_departures: usize,
    /// Planes whose airline id has no catalog entry
    pub planes_without_airline: usize,
    /// Planes whose model id has no catalog entry
    pub planes_without_model: usize,
    /// Users whose residence city has no catalog entry
    pub users_without_city: usize,
    /// Flights whose itinerary id has no itinerary row
    pub flights_without_itinerary: usize,
    /// Flights left without a time key
    pub flights_without_time: usize,
    /// Flights left without an origin city
    pub flights_without_origin_city: usize,
    /// Flights left without a destination city
    pub flights_without_destination_city: usize,
}

impl TransformStats {
    /// True when no lookup failed and every date parsed
    pub fn is_clean(&self) -> bool {
        *self == TransformStats::default()
    }
}

/// The five target tables, built in memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarSchema {
    pub time: Vec<TimeDimRow>,
    pub planes: Vec<PlaneDimRow>,
    pub cities: Vec<CityDimRow>,
    pub users: Vec<UserDimRow>,
    pub facts: Vec<FlightFactRow>,
}

impl StarSchema {
    /// Build all dimensions and the fact table from a snapshot
    pub fn build(snapshot: &SourceSnapshot) -> (Self, TransformStats) {
        let mut stats = TransformStats::default();

        let time = build_time_dimension(&snapshot.itineraries, &mut stats);
        let cities = build_city_dimension(&snapshot.cities);
        let planes = build_plane_dimension(
            &snapshot.planes,
            &snapshot.airlines,
            &snapshot.models,
            &mut stats,
        );
        let users = build_user_dimension(&snapshot.users, &snapshot.cities, &mut stats);
        let facts = build_fact_table(
            &snapshot.flights,
            &snapshot.itineraries,
            &snapshot.airports,
            &time,
            &mut stats,
        );

        let schema = Self {
            time: time.into_rows(),
            planes,
            cities,
            users,
            facts,
        };

        info!(
            dim_tiempo = schema.time.len(),
            dim_avion = schema.planes.len(),
            dim_ciudad = schema.cities.len(),
            dim_usuario = schema.users.len(),
            hecho_vuelos = schema.facts.len(),
            "Star schema built"
        );
        if !stats.is_clean() {
            warn!(?stats, "Tolerated data-quality problems during transform");
        }

        (schema, stats)
    }

    /// Row counts per target table, in load order
    pub fn row_counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("dim_tiempo", self.time.len()),
            ("dim_avion", self.planes.len()),
            ("dim_ciudad", self.cities.len()),
            ("dim_usuario", self.users.len()),
            ("hecho_vuelos", self.facts.len()),
        ]
    }

    /// SHA-256 over the serialized tables
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // Serializing plain structs and vectors cannot fail
        if let Ok(bytes) = serde_json::to_vec(self) {
            hasher.update(&bytes);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Build a lookup table keeping the first row for each key.
///
/// Duplicate catalog keys are an upstream data problem; keeping the first
/// occurrence guarantees a lookup never fans out.
pub(crate) fn index_by<'a, T, K, V>(
    items: &'a [T],
    key: impl Fn(&'a T) -> K,
    value: impl Fn(&'a T) -> V,
) -> HashMap<K, V>
where
    K: Eq + Hash,
{
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        map.entry(key(item)).or_insert_with(|| value(item));
    }
    map
}
