//! The four business questions answered from the star schema

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::store::MartStore;

/// Parameters of the business questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionParams {
    /// Destination city for question 1, matched case-insensitively
    pub destination_city: String,
    /// Half-year (1 or 2) for question 2
    pub half_year: u8,
    /// Years for question 2
    pub years: Vec<i32>,
}

impl Default for QuestionParams {
    fn default() -> Self {
        Self {
            destination_city: "roma".to_string(),
            half_year: 1,
            years: vec![2019, 2020],
        }
    }
}

/// One of the fixed analytical questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessQuestion {
    /// Airline with the most flights to the destination city, per year
    TopAirlineToCity,
    /// Revenue per airline in a half-year, for a set of years
    HalfYearRevenue,
    /// Plane model with the most flights, per year
    TopModel,
    /// Residence city with the most travellers, per year
    TopResidenceCity,
}

impl BusinessQuestion {
    /// All questions in order
    pub fn all() -> [BusinessQuestion; 4] {
        [
            BusinessQuestion::TopAirlineToCity,
            BusinessQuestion::HalfYearRevenue,
            BusinessQuestion::TopModel,
            BusinessQuestion::TopResidenceCity,
        ]
    }

    /// Question number, 1 to 4
    pub fn number(&self) -> u8 {
        match self {
            BusinessQuestion::TopAirlineToCity => 1,
            BusinessQuestion::HalfYearRevenue => 2,
            BusinessQuestion::TopModel => 3,
            BusinessQuestion::TopResidenceCity => 4,
        }
    }

    /// Look up a question by number
    pub fn from_number(number: u8) -> Option<Self> {
        Self::all().into_iter().find(|q| q.number() == number)
    }

    /// Human-readable title with the parameters filled in
    pub fn title(&self, params: &QuestionParams) -> String {
        match self {
            BusinessQuestion::TopAirlineToCity => {
                format!("Top airline to {} per year", params.destination_city)
            }
            BusinessQuestion::HalfYearRevenue => format!(
                "Revenue per airline in half-year {} ({})",
                params.half_year,
                params
                    .years
                    .iter()
                    .map(|y| y.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            BusinessQuestion::TopModel => "Top plane model per year".to_string(),
            BusinessQuestion::TopResidenceCity => {
                "Residence city with the most travellers per year".to_string()
            }
        }
    }

    /// SQL text. Question 1 takes the destination city as its only bind
    /// parameter; the integer parameters of question 2 are inlined.
    ///
    /// Ties are broken by name so the winner of each year is stable.
    pub fn sql(&self, params: &QuestionParams) -> String {
        match self {
            BusinessQuestion::TopAirlineToCity => r#"
WITH destination AS (
    SELECT id_ciudad FROM dim_ciudad WHERE lower(nombre_ciudad) = lower(?)
)
SELECT t.anio, a.nombre_aerolinea, COUNT(*) AS vuelos
FROM hecho_vuelos f
JOIN dim_avion a ON f.id_avion = a.id_avion
JOIN destination d ON f.id_ciudad_destino = d.id_ciudad
JOIN dim_tiempo t ON f.id_tiempo = t.id_tiempo
GROUP BY 1, 2
QUALIFY ROW_NUMBER() OVER (PARTITION BY t.anio ORDER BY COUNT(*) DESC, a.nombre_aerolinea) = 1
ORDER BY t.anio"#
                .to_string(),
            BusinessQuestion::HalfYearRevenue => {
                let years = if params.years.is_empty() {
                    "NULL".to_string()
                } else {
                    params
                        .years
                        .iter()
                        .map(|y| y.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!(
                    r#"
SELECT t.anio, a.nombre_aerolinea, SUM(f.costo) AS recaudo
FROM hecho_vuelos f
JOIN dim_avion a ON f.id_avion = a.id_avion
JOIN dim_tiempo t ON f.id_tiempo = t.id_tiempo
WHERE t.semestre = {} AND t.anio IN ({years})
GROUP BY 1, 2
ORDER BY t.anio, recaudo DESC, a.nombre_aerolinea"#,
                    params.half_year
                )
            }
            BusinessQuestion::TopModel => r#"
SELECT t.anio, a.nombre_modelo, COUNT(*) AS vuelos
FROM hecho_vuelos f
JOIN dim_avion a ON f.id_avion = a.id_avion
JOIN dim_tiempo t ON f.id_tiempo = t.id_tiempo
GROUP BY 1, 2
QUALIFY ROW_NUMBER() OVER (PARTITION BY t.anio ORDER BY COUNT(*) DESC, a.nombre_modelo) = 1
ORDER BY t.anio"#
                .to_string(),
            BusinessQuestion::TopResidenceCity => r#"
SELECT t.anio, u.ciudad_residencia_nombre AS ciudad, COUNT(*) AS viajes
FROM hecho_vuelos f
JOIN dim_usuario u ON f.id_usuario = u.id_usuario
JOIN dim_tiempo t ON f.id_tiempo = t.id_tiempo
GROUP BY 1, 2
QUALIFY ROW_NUMBER() OVER (PARTITION BY t.anio ORDER BY COUNT(*) DESC, u.ciudad_residencia_nombre) = 1
ORDER BY t.anio"#
                .to_string(),
        }
    }

    /// Run the question against a loaded store
    pub fn run(
        &self,
        store: &MartStore,
        params: &QuestionParams,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let sql = self.sql(params);
        match self {
            BusinessQuestion::TopAirlineToCity => {
                store.query_with(&sql, &[&params.destination_city])
            }
            _ => store.query(&sql),
        }
    }
}

/// Answer to one question; a failed question carries its error instead
#[derive(Debug, Clone, Serialize)]
pub struct QuestionAnswer {
    pub number: u8,
    pub title: String,
    pub rows: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run all four questions. A failing question does not stop the others.
pub fn answer_all(store: &MartStore, params: &QuestionParams) -> Vec<QuestionAnswer> {
    BusinessQuestion::all()
        .into_iter()
        .map(|question| {
            let title = question.title(params);
            match question.run(store, params) {
                Ok(rows) => QuestionAnswer {
                    number: question.number(),
                    title,
                    rows,
                    error: None,
                },
                Err(e) => {
                    warn!(question = question.number(), error = %e, "Question failed");
                    QuestionAnswer {
                        number: question.number(),
                        title,
                        rows: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect()
}
