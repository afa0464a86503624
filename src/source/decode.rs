//! Conversion of raw source tables into typed records

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use super::records::{Airline, Airport, City, Flight, Itinerary, Model, Plane, RawTimestamp, User};
use super::{RawTable, SourceValue};
use crate::error::SourceError;

/// Cell accessor bound to one table, for error context
struct Cells<'a> {
    table: &'a str,
}

impl Cells<'_> {
    fn invalid(&self, column: &str, message: String) -> SourceError {
        SourceError::InvalidValue {
            table: self.table.to_string(),
            column: column.to_string(),
            message,
        }
    }

    fn opt_i64(&self, value: &SourceValue, column: &str) -> Result<Option<i64>, SourceError> {
        match value {
            SourceValue::Null => Ok(None),
            SourceValue::Int(n) => Ok(Some(*n)),
            SourceValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(Some(*f as i64)),
            SourceValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                if let Ok(n) = s.parse::<i64>() {
                    return Ok(Some(n));
                }
                match s.parse::<f64>() {
                    Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(Some(f as i64)),
                    _ => Err(self.invalid(column, format!("not an integer: '{s}'"))),
                }
            }
            other => Err(self.invalid(column, format!("not an integer: {other:?}"))),
        }
    }

    /// Monetary amounts are stored as integers; decimals are rounded.
    fn opt_amount(&self, value: &SourceValue, column: &str) -> Result<Option<i64>, SourceError> {
        match value {
            SourceValue::Float(f) if f.is_finite() => Ok(Some(f.round() as i64)),
            SourceValue::Text(s) if s.trim().parse::<i64>().is_err() => {
                match s.trim().parse::<f64>() {
                    Ok(f) if f.is_finite() => Ok(Some(f.round() as i64)),
                    _ => Err(self.invalid(column, format!("not an amount: '{s}'"))),
                }
            }
            other => self.opt_i64(other, column),
        }
    }

    fn opt_string(value: &SourceValue) -> Option<String> {
        match value {
            SourceValue::Null => None,
            SourceValue::Int(n) => Some(n.to_string()),
            SourceValue::Float(f) => Some(f.to_string()),
            SourceValue::Text(s) | SourceValue::Other(s) => Some(s.clone()),
            SourceValue::Timestamp(ts) => Some(ts.to_string()),
            SourceValue::Date(d) => Some(d.to_string()),
        }
    }

    fn raw_timestamp(value: &SourceValue) -> RawTimestamp {
        match value {
            SourceValue::Null => RawTimestamp::Missing,
            SourceValue::Timestamp(ts) => RawTimestamp::Timestamp(*ts),
            SourceValue::Date(d) => RawTimestamp::Date(*d),
            SourceValue::Text(s) | SourceValue::Other(s) => RawTimestamp::Text(s.clone()),
            SourceValue::Int(n) => RawTimestamp::Text(n.to_string()),
            SourceValue::Float(f) => RawTimestamp::Text(f.to_string()),
        }
    }
}

fn cell<'r>(row: &'r [SourceValue], position: usize) -> &'r SourceValue {
    row.get(position).unwrap_or(&SourceValue::Null)
}

/// Rows of one catalog table plus the count of rows dropped for a NULL key
#[derive(Debug)]
pub(crate) struct Decoded<T> {
    pub rows: Vec<T>,
    pub without_key: usize,
}

/// Decode every row whose key column is set. A NULL key cannot be matched
/// by any lookup, so the row is left out instead of failing the run.
fn decode_keyed<T>(
    table: &RawTable,
    key_column: &str,
    mut decode: impl FnMut(&Cells<'_>, i64, &[SourceValue]) -> Result<T, SourceError>,
) -> Result<Decoded<T>, SourceError> {
    let c = Cells { table: table.name() };
    let key = table.columns.require(key_column)?;

    let mut decoded = Decoded {
        rows: Vec::with_capacity(table.rows.len()),
        without_key: 0,
    };
    for row in &table.rows {
        match c.opt_i64(cell(row, key), key_column)? {
            Some(id) => decoded.rows.push(decode(&c, id, row.as_slice())?),
            None => {
                debug!(table = c.table, column = key_column, "Skipping row without key");
                decoded.without_key += 1;
            }
        }
    }
    Ok(decoded)
}

/// Decode `aerolineas`
pub(crate) fn airlines(table: &RawTable) -> Result<Decoded<Airline>, SourceError> {
    let name = table.columns.require("nombre")?;

    decode_keyed(table, "id_aerolinea", |_, id, row| {
        Ok(Airline {
            id,
            name: Cells::opt_string(cell(row, name)),
        })
    })
}

/// Decode `ciudades`
pub(crate) fn cities(table: &RawTable) -> Result<Decoded<City>, SourceError> {
    let name = table.columns.require("nombre")?;

    decode_keyed(table, "id_ciudad", |_, id, row| {
        Ok(City {
            id,
            name: Cells::opt_string(cell(row, name)),
        })
    })
}

/// Decode `aeropuertos`
pub(crate) fn airports(table: &RawTable) -> Result<Decoded<Airport>, SourceError> {
    let city = table.columns.require("id_ciudad")?;

    decode_keyed(table, "id_aeropuerto", |c, id, row| {
        Ok(Airport {
            id,
            city_id: c.opt_i64(cell(row, city), "id_ciudad")?,
        })
    })
}

/// Decode `modelos`
pub(crate) fn models(table: &RawTable) -> Result<Decoded<Model>, SourceError> {
    let name = table.columns.require("nombre")?;

    decode_keyed(table, "id_modelo", |_, id, row| {
        Ok(Model {
            id,
            name: Cells::opt_string(cell(row, name)),
        })
    })
}

/// Decode `aviones`
pub(crate) fn planes(table: &RawTable) -> Result<Decoded<Plane>, SourceError> {
    let name = table.columns.require("nombre")?;
    let airline = table.columns.require("id_aerolinea")?;
    let model = table.columns.require("id_modelo")?;

    decode_keyed(table, "id_avion", |c, id, row| {
        Ok(Plane {
            id,
            name: Cells::opt_string(cell(row, name)),
            airline_id: c.opt_i64(cell(row, airline), "id_aerolinea")?,
            model_id: c.opt_i64(cell(row, model), "id_modelo")?,
        })
    })
}

/// Decode `itinerarios`
pub(crate) fn itineraries(table: &RawTable) -> Result<Decoded<Itinerary>, SourceError> {
    let origin = table.columns.require("id_aeropuerto_origen")?;
    let destination = table.columns.require("id_aeropuerto_destino")?;
    let departure = table.columns.require("fecha_salida")?;
    let arrival = table.columns.optional("fecha_llegada");

    decode_keyed(table, "id_itinerario", |c, id, row| {
        Ok(Itinerary {
            id,
            origin_airport_id: c.opt_i64(cell(row, origin), "id_aeropuerto_origen")?,
            destination_airport_id: c.opt_i64(cell(row, destination), "id_aeropuerto_destino")?,
            departure: Cells::raw_timestamp(cell(row, departure)),
            arrival: arrival
                .map(|position| Cells::raw_timestamp(cell(row, position)))
                .unwrap_or_default(),
        })
    })
}

/// Decode `usuarios`
pub(crate) fn users(table: &RawTable) -> Result<Decoded<User>, SourceError> {
    let given = table.columns.require("nombre")?;
    let family = table.columns.require("apellido")?;
    let email = table.columns.require("email")?;
    let city = table.columns.require("id_ciudad")?;

    decode_keyed(table, "cedula", |c, national_id, row| {
        Ok(User {
            national_id,
            given_name: Cells::opt_string(cell(row, given)),
            family_name: Cells::opt_string(cell(row, family)),
            email: Cells::opt_string(cell(row, email)),
            city_id: c.opt_i64(cell(row, city), "id_ciudad")?,
        })
    })
}

/// Decode `vuelos`
pub(crate) fn flights(table: &RawTable) -> Result<Vec<Flight>, SourceError> {
    let c = Cells { table: table.name() };
    let itinerary = table.columns.require("id_itinerario")?;
    let plane = table.columns.require("id_avion")?;
    let user = table.columns.require("id_usuario")?;
    let cost = table.columns.require("costo")?;

    table
        .rows
        .iter()
        .map(|row| {
            Ok(Flight {
                itinerary_id: c.opt_i64(cell(row, itinerary), "id_itinerario")?,
                plane_id: c.opt_i64(cell(row, plane), "id_avion")?,
                user_id: c.opt_i64(cell(row, user), "id_usuario")?,
                cost: c.opt_amount(cell(row, cost), "costo")?,
            })
        })
        .collect()
}

/// Days between 0001-01-01 and 1970-01-01, for DuckDB `DATE` values
pub(crate) const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert days since the Unix epoch into a date
pub(crate) fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Convert microseconds since the Unix epoch into a timestamp
pub(crate) fn timestamp_from_epoch_micros(micros: i64) -> Option<NaiveDateTime> {
    chrono::DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}
