//! Fact table builder: one `hecho_vuelos` row per source flight

use tracing::debug;

use super::dimensions::TimeDimension;
use super::{FlightFactRow, TransformStats, index_by};
use crate::source::{Airport, Flight, Itinerary};

/// What a flight needs from its itinerary, resolved once per itinerary
#[derive(Debug, Clone, Copy)]
struct ItineraryKeys {
    time_id: Option<i32>,
    origin_city_id: Option<i64>,
    destination_city_id: Option<i64>,
}

/// Build `hecho_vuelos`.
///
/// Every lookup is a left join anchored on the flight:
/// flight → itinerary → (departure date → time key,
/// origin/destination airport → city). A missing hop leaves the key null;
/// a flight whose itinerary cannot be found still yields a row with null
/// time and city keys. Output has exactly one row per flight, in source
/// order.
pub fn build_fact_table(
    flights: &[Flight],
    itineraries: &[Itinerary],
    airports: &[Airport],
    time: &TimeDimension,
    stats: &mut TransformStats,
) -> Vec<FlightFactRow> {
    let airport_city = index_by(airports, |a| a.id, |a| a.city_id);
    let resolve_city =
        |airport: Option<i64>| airport.and_then(|id| airport_city.get(&id).copied().flatten());

    let itinerary_keys = index_by(
        itineraries,
        |i| i.id,
        |i| ItineraryKeys {
            time_id: time.key_for_departure(&i.departure),
            origin_city_id: resolve_city(i.origin_airport_id),
            destination_city_id: resolve_city(i.destination_airport_id),
        },
    );

    flights
        .iter()
        .map(|flight| {
            let keys = flight
                .itinerary_id
                .and_then(|id| itinerary_keys.get(&id).copied());

            if keys.is_none() {
                stats.flights_without_itinerary += 1;
                debug!(itinerary = ?flight.itinerary_id, "Flight references unknown itinerary");
            }

            let row = FlightFactRow {
                time_id: keys.and_then(|k| k.time_id),
                plane_id: flight.plane_id,
                user_id: flight.user_id,
                origin_city_id: keys.and_then(|k| k.origin_city_id),
                destination_city_id: keys.and_then(|k| k.destination_city_id),
                cost: flight.cost,
                flight_count: 1,
            };

            if row.time_id.is_none() {
                stats.flights_without_time += 1;
            }
            if row.origin_city_id.is_none() {
                stats.flights_without_origin_city += 1;
            }
            if row.destination_city_id.is_none() {
                stats.flights_without_destination_city += 1;
            }

            row
        })
        .collect()
}
