//! Dimension builders: time, city, plane and user

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use super::{CityDimRow, PlaneDimRow, TimeDimRow, TransformStats, UserDimRow, index_by};
use crate::source::{Airline, City, Itinerary, Model, Plane, RawTimestamp, User};

/// Half-year of a calendar month (1–6 → 1, 7–12 → 2)
pub fn half_year(month: u8) -> u8 {
    (month.saturating_sub(1)) / 6 + 1
}

/// Time dimension with its date → surrogate key map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeDimension {
    rows: Vec<TimeDimRow>,
    keys: BTreeMap<NaiveDate, i32>,
}

impl TimeDimension {
    /// Surrogate key of a calendar date
    pub fn key_for(&self, date: NaiveDate) -> Option<i32> {
        self.keys.get(&date).copied()
    }

    /// Surrogate key for an itinerary's departure
    pub fn key_for_departure(&self, departure: &RawTimestamp) -> Option<i32> {
        departure
            .to_datetime()
            .and_then(|ts| self.key_for(ts.date()))
    }

    /// Rows in key order
    pub fn rows(&self) -> &[TimeDimRow] {
        &self.rows
    }

    /// Number of distinct dates
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no itinerary had a usable departure date
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Take the rows
    pub fn into_rows(self) -> Vec<TimeDimRow> {
        self.rows
    }
}

/// Build `dim_tiempo` from itinerary departures.
///
/// Distinct calendar dates are sorted ascending and numbered from 1, so the
/// same itineraries always produce the same keys. Keys are not stable when
/// the set of dates changes between runs.
pub fn build_time_dimension(itineraries: &[Itinerary], stats: &mut TransformStats) -> TimeDimension {
    let mut dates = BTreeSet::new();

    for itinerary in itineraries {
        match itinerary.departure.to_datetime() {
            Some(ts) => {
                dates.insert(ts.date());
            }
            None if itinerary.departure == RawTimestamp::Missing => {
                stats.missing_departures += 1;
            }
            None => {
                stats.unparseable_departures += 1;
                debug!(
                    itinerary = itinerary.id,
                    value = ?itinerary.departure,
                    "Unparseable departure date"
                );
            }
        }
    }

    let mut rows = Vec::with_capacity(dates.len());
    let mut keys = BTreeMap::new();
    // Distinct chrono dates always fit in an i32
    for (i, date) in dates.into_iter().enumerate() {
        let id = i as i32 + 1;
        keys.insert(date, id);
        rows.push(TimeDimRow::new(id, date));
    }

    TimeDimension { rows, keys }
}

/// Build `dim_ciudad`: a projection of the city catalog
pub fn build_city_dimension(cities: &[City]) -> Vec<CityDimRow> {
    cities
        .iter()
        .map(|city| CityDimRow {
            id: city.id,
            name: city.name.clone(),
        })
        .collect()
}

/// Build `dim_avion` with airline and model names flattened in.
///
/// Left joins: a plane without a catalog match keeps a null name and is never
/// dropped.
pub fn build_plane_dimension(
    planes: &[Plane],
    airlines: &[Airline],
    models: &[Model],
    stats: &mut TransformStats,
) -> Vec<PlaneDimRow> {
    let airline_names = index_by(airlines, |a| a.id, |a| a.name.as_deref());
    let model_names = index_by(models, |m| m.id, |m| m.name.as_deref());

    planes
        .iter()
        .map(|plane| {
            let airline = plane
                .airline_id
                .and_then(|id| airline_names.get(&id).copied());
            let model = plane.model_id.and_then(|id| model_names.get(&id).copied());

            if airline.is_none() {
                stats.planes_without_airline += 1;
                debug!(plane = plane.id, airline = ?plane.airline_id, "Airline not in catalog");
            }
            if model.is_none() {
                stats.planes_without_model += 1;
                debug!(plane = plane.id, model = ?plane.model_id, "Model not in catalog");
            }

            PlaneDimRow {
                id: plane.id,
                name: plane.name.clone(),
                airline_name: airline.flatten().map(str::to_string),
                model_name: model.flatten().map(str::to_string),
            }
        })
        .collect()
}

/// Build `dim_usuario` with the residence city name flattened in
pub fn build_user_dimension(
    users: &[User],
    cities: &[City],
    stats: &mut TransformStats,
) -> Vec<UserDimRow> {
    let city_names = index_by(cities, |c| c.id, |c| c.name.as_deref());

    users
        .iter()
        .map(|user| {
            let city = user.city_id.and_then(|id| city_names.get(&id).copied());
            if city.is_none() {
                stats.users_without_city += 1;
                debug!(user = user.national_id, city = ?user.city_id, "Residence city not in catalog");
            }

            UserDimRow {
                id: user.national_id,
                full_name: full_name(user.given_name.as_deref(), user.family_name.as_deref()),
                email: user.email.clone(),
                residence_city_name: city.flatten().map(str::to_string),
            }
        })
        .collect()
}

/// Join given and family name with one space.
///
/// Missing or blank parts are left out; `None` when both are.
pub fn full_name(given: Option<&str>, family: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [given, family]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn itinerary(id: i64, departure: RawTimestamp) -> Itinerary {
        Itinerary {
            id,
            origin_airport_id: None,
            destination_airport_id: None,
            departure,
            arrival: RawTimestamp::Missing,
        }
    }

    fn text(s: &str) -> RawTimestamp {
        RawTimestamp::Text(s.to_string())
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_half_year() {
        for month in 1..=6 {
            assert_eq!(half_year(month), 1);
        }
        for month in 7..=12 {
            assert_eq!(half_year(month), 2);
        }
    }

    #[test]
    fn test_time_dimension_semester_boundary() {
        let mut stats = TransformStats::default();
        let time = build_time_dimension(
            &[
                itinerary(1, text("2019-07-01 08:00:00")),
                itinerary(2, text("2019-06-30 22:15:00")),
            ],
            &mut stats,
        );

        let rows = time.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date("2019-06-30"));
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].half_year, 1);
        assert_eq!(rows[1].date, date("2019-07-01"));
        assert_eq!(rows[1].id, 2);
        assert_eq!(rows[1].half_year, 2);
        assert_eq!(rows[1].year, 2019);
        assert_eq!(rows[1].month, 7);
    }

    #[test]
    fn test_time_dimension_distinct_dates_ignore_time_of_day() {
        let mut stats = TransformStats::default();
        let morning = NaiveDateTime::parse_from_str("2020-02-01 06:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let time = build_time_dimension(
            &[
                itinerary(1, RawTimestamp::Timestamp(morning)),
                itinerary(2, text("2020-02-01 23:59:59")),
                itinerary(3, RawTimestamp::Date(date("2020-02-01"))),
            ],
            &mut stats,
        );
        assert_eq!(time.len(), 1);
        assert_eq!(time.key_for(date("2020-02-01")), Some(1));
    }

    #[test]
    fn test_time_dimension_skips_bad_dates() {
        let mut stats = TransformStats::default();
        let time = build_time_dimension(
            &[
                itinerary(1, text("nonsense")),
                itinerary(2, RawTimestamp::Missing),
                itinerary(3, text("2019-01-15 10:00:00")),
                itinerary(4, text("2018-12-31 10:00:00")),
            ],
            &mut stats,
        );

        assert_eq!(stats.unparseable_departures, 1);
        assert_eq!(stats.missing_departures, 1);
        let keys: Vec<i32> = time.rows().iter().map(|r| r.id).collect();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(time.key_for(date("2018-12-31")), Some(1));
        assert_eq!(time.key_for_departure(&text("nonsense")), None);
    }

    #[test]
    fn test_plane_dimension_left_joins() {
        let mut stats = TransformStats::default();
        let planes = build_plane_dimension(
            &[
                Plane {
                    id: 1,
                    name: Some("HK-1".to_string()),
                    airline_id: Some(10),
                    model_id: Some(20),
                },
                Plane {
                    id: 2,
                    name: Some("HK-2".to_string()),
                    airline_id: Some(99),
                    model_id: None,
                },
            ],
            &[Airline {
                id: 10,
                name: Some("Avianca".to_string()),
            }],
            &[Model {
                id: 20,
                name: Some("A320".to_string()),
            }],
            &mut stats,
        );

        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0].airline_name.as_deref(), Some("Avianca"));
        assert_eq!(planes[0].model_name.as_deref(), Some("A320"));
        assert_eq!(planes[1].id, 2);
        assert_eq!(planes[1].airline_name, None);
        assert_eq!(planes[1].model_name, None);
        assert_eq!(stats.planes_without_airline, 1);
        assert_eq!(stats.planes_without_model, 1);
    }

    #[test]
    fn test_duplicate_catalog_keys_do_not_fan_out() {
        let mut stats = TransformStats::default();
        let planes = build_plane_dimension(
            &[Plane {
                id: 1,
                name: None,
                airline_id: Some(10),
                model_id: None,
            }],
            &[
                Airline {
                    id: 10,
                    name: Some("First".to_string()),
                },
                Airline {
                    id: 10,
                    name: Some("Second".to_string()),
                },
            ],
            &[],
            &mut stats,
        );
        assert_eq!(planes.len(), 1);
        assert_eq!(planes[0].airline_name.as_deref(), Some("First"));
    }

    #[test]
    fn test_user_dimension() {
        let mut stats = TransformStats::default();
        let users = build_user_dimension(
            &[
                User {
                    national_id: 1_020_304_050,
                    given_name: Some("Ana".to_string()),
                    family_name: Some("Gómez".to_string()),
                    email: Some("ana@example.com".to_string()),
                    city_id: Some(1),
                },
                User {
                    national_id: 7,
                    given_name: None,
                    family_name: Some("Ruiz".to_string()),
                    email: None,
                    city_id: Some(42),
                },
            ],
            &[City {
                id: 1,
                name: Some("Bogotá".to_string()),
            }],
            &mut stats,
        );

        assert_eq!(users[0].full_name.as_deref(), Some("Ana Gómez"));
        assert_eq!(users[0].residence_city_name.as_deref(), Some("Bogotá"));
        assert_eq!(users[1].full_name.as_deref(), Some("Ruiz"));
        assert_eq!(users[1].residence_city_name, None);
        assert_eq!(stats.users_without_city, 1);
    }

    #[test]
    fn test_full_name() {
        assert_eq!(full_name(Some("Ana"), Some("Gómez")).as_deref(), Some("Ana Gómez"));
        assert_eq!(full_name(Some(" Ana "), None).as_deref(), Some("Ana"));
        assert_eq!(full_name(Some(""), Some("Ruiz")).as_deref(), Some("Ruiz"));
        assert_eq!(full_name(None, None), None);
        assert_eq!(full_name(Some("  "), None), None);
    }

    #[test]
    fn test_city_dimension_is_projection() {
        let cities = [
            City {
                id: 3,
                name: Some("Roma".to_string()),
            },
            City { id: 1, name: None },
        ];
        let dim = build_city_dimension(&cities);
        assert_eq!(dim.len(), 2);
        assert_eq!(dim[0].id, 3);
        assert_eq!(dim[0].name.as_deref(), Some("Roma"));
        assert_eq!(dim[1].name, None);
    }
}
