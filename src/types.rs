use geo::Point;
use serde::{Deserialize, Serialize};

/// One pole with free WiFi.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessPoint {
    pub borough: String,
    pub neighborhood: String,
    // x = longitude, y = latitude. None when the row has no usable coordinates.
    pub location: Option<Point<f64>>,
    pub access_points: u32,
}

/// Row of the per-borough table. Serialized with the dataset's column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoroughTotal {
    #[serde(rename = "Alcaldía")]
    pub borough: String,
    #[serde(rename = "Puntos_de_acceso")]
    pub access_points: u64,
}

/// Everything loaded at startup. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub points: Vec<AccessPoint>,
    pub borough_totals: Vec<BoroughTotal>,
    // Distinct boroughs in source order
    pub boroughs: Vec<String>,
}

/// Dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(value: &str) -> Self {
        SelectOption {
            label: value.to_string(),
            value: value.to_string(),
        }
    }
}
