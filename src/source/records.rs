//! Typed rows of the eight operational tables

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Row of `aerolineas`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub id: i64,
    pub name: Option<String>,
}

/// Row of `ciudades`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: Option<String>,
}

/// Row of `aeropuertos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub id: i64,
    /// City the airport serves; `None` when the source has no mapping
    pub city_id: Option<i64>,
}

/// Row of `modelos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub name: Option<String>,
}

/// Row of `aviones`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plane {
    pub id: i64,
    pub name: Option<String>,
    pub airline_id: Option<i64>,
    pub model_id: Option<i64>,
}

/// Row of `itinerarios`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: i64,
    pub origin_airport_id: Option<i64>,
    pub destination_airport_id: Option<i64>,
    /// Departure as delivered by the source, parsed lazily
    pub departure: RawTimestamp,
    /// Arrival as delivered by the source (not used by the star schema)
    pub arrival: RawTimestamp,
}

/// Row of `usuarios`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// National identity number (`cedula`), the natural key
    pub national_id: i64,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    /// City of residence
    pub city_id: Option<i64>,
}

/// Row of `vuelos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub itinerary_id: Option<i64>,
    pub plane_id: Option<i64>,
    pub user_id: Option<i64>,
    pub cost: Option<i64>,
}

/// A timestamp column value before parsing.
///
/// Operational stores hand back native timestamps, bare dates or free text
/// depending on the column type; malformed text must survive extraction so
/// the transform can decide what to do with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawTimestamp {
    #[default]
    Missing,
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Text(String),
}

const TEXT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

impl RawTimestamp {
    /// Parse into a timestamp; `None` when missing or unparseable
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            RawTimestamp::Missing => None,
            RawTimestamp::Timestamp(ts) => Some(*ts),
            RawTimestamp::Date(date) => date.and_hms_opt(0, 0, 0),
            RawTimestamp::Text(text) => parse_text(text.trim()),
        }
    }

    /// True when a value was delivered but cannot be parsed
    pub fn is_malformed(&self) -> bool {
        !matches!(self, RawTimestamp::Missing) && self.to_datetime().is_none()
    }
}

fn parse_text(text: &str) -> Option<NaiveDateTime> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for format in TEXT_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Full snapshot of the operational store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub airlines: Vec<Airline>,
    pub cities: Vec<City>,
    pub airports: Vec<Airport>,
    pub models: Vec<Model>,
    pub planes: Vec<Plane>,
    pub itineraries: Vec<Itinerary>,
    pub users: Vec<User>,
    pub flights: Vec<Flight>,
    /// Catalog rows left out because their key column was NULL
    #[serde(default)]
    pub rows_without_key: usize,
}

impl SourceSnapshot {
    /// Row counts per source table, in extraction order
    pub fn table_counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("aerolineas", self.airlines.len()),
            ("ciudades", self.cities.len()),
            ("aeropuertos", self.airports.len()),
            ("modelos", self.models.len()),
            ("aviones", self.planes.len()),
            ("itinerarios", self.itineraries.len()),
            ("usuarios", self.users.len()),
            ("vuelos", self.flights.len()),
        ]
    }
}
