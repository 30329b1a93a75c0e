use crate::config::{AppConfig, DataSource, Encoding};
use crate::types::{AccessPoint, BoroughTotal, Dataset};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use geo::Point;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::info;

pub const BOROUGH_COLUMN: &str = "Alcaldía";
pub const NEIGHBORHOOD_COLUMN: &str = "Colonia";
pub const LATITUDE_COLUMN: &str = "Latitud";
pub const LONGITUDE_COLUMN: &str = "Longitud";
pub const ACCESS_POINTS_COLUMN: &str = "Puntos_de_acceso";

const REQUIRED_COLUMNS: [&str; 5] = [
    BOROUGH_COLUMN,
    NEIGHBORHOOD_COLUMN,
    LATITUDE_COLUMN,
    LONGITUDE_COLUMN,
    ACCESS_POINTS_COLUMN,
];

// Raw spelling -> canonical spelling. Everything else is left alone.
const BOROUGH_FIXES: [(&str, &str); 3] = [
    ("Miguel Hidalgo", "MIGUEL HIDALGO"),
    ("Cuauhtémoc", "CUAUHTÉMOC"),
    ("La Magdalena Contreras", "LA MAGDALENA CONTRERAS"),
];

#[derive(Debug, Error)]
pub enum DataError {
    #[error("dataset request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("column '{0}' not found in CSV")]
    MissingColumn(String),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Alcaldía")]
    borough: String,
    #[serde(rename = "Colonia")]
    neighborhood: String,
    #[serde(rename = "Latitud", deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(rename = "Longitud", deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
    #[serde(rename = "Puntos_de_acceso", deserialize_with = "csv::invalid_option")]
    access_points: Option<u32>,
}

impl From<RawRecord> for AccessPoint {
    fn from(raw: RawRecord) -> Self {
        let location = match (raw.longitude, raw.latitude) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => Some(Point::new(lon, lat)),
            _ => None,
        };
        AccessPoint {
            borough: normalize_borough(&raw.borough),
            neighborhood: raw.neighborhood,
            location,
            access_points: raw.access_points.unwrap_or(0),
        }
    }
}

/// Fetches, decodes and parses the configured dataset, then builds the aggregates.
pub async fn load_data(config: &AppConfig) -> Result<Dataset> {
    let source = config.input.data_source();
    info!(?source, "Loading data");

    let bytes = fetch_bytes(&source).await?;
    let text = decode(&bytes, config.input.encoding)?;
    let dataset = build_dataset(parse_csv(&text)?);

    info!(
        rows = dataset.points.len(),
        boroughs = dataset.boroughs.len(),
        "Loaded access point data"
    );

    Ok(dataset)
}

async fn fetch_bytes(source: &DataSource) -> Result<Vec<u8>> {
    match source {
        DataSource::Url(url) => {
            let response = reqwest::get(url)
                .await
                .with_context(|| format!("Failed to fetch dataset: {}", url))?;
            let status = response.status();
            if !status.is_success() {
                return Err(DataError::HttpStatus {
                    url: url.clone(),
                    status: status.as_u16(),
                }
                .into());
            }
            let body = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read dataset body: {}", url))?;
            Ok(body.to_vec())
        }
        DataSource::File(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to open CSV file: {:?}", path)),
    }
}

pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<String> {
    match encoding {
        // Every Latin-1 byte is the code point of the same value.
        Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        Encoding::Utf8 => String::from_utf8(bytes.to_vec()).context("Dataset is not valid UTF-8"),
    }
}

pub fn parse_csv(text: &str) -> Result<Vec<AccessPoint>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = rdr.headers().context("Failed to read CSV header")?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DataError::MissingColumn(column.to_string()).into());
        }
    }

    let mut points = Vec::new();
    for (line, result) in rdr.deserialize::<RawRecord>().enumerate() {
        let raw = result.with_context(|| format!("Failed to parse CSV record {}", line + 1))?;
        points.push(AccessPoint::from(raw));
    }

    Ok(points)
}

pub fn normalize_borough(raw: &str) -> String {
    BOROUGH_FIXES
        .iter()
        .find(|(from, _)| *from == raw)
        .map_or(raw, |(_, to)| *to)
        .to_string()
}

/// Sum of access points per borough, largest first. Ties keep first-appearance order.
/// Rows with a blank borough are left out.
pub fn aggregate_by_borough(points: &[AccessPoint]) -> Vec<BoroughTotal> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<BoroughTotal> = Vec::new();

    for point in points.iter().filter(|p| has_borough(p)) {
        let slot = *index.entry(point.borough.as_str()).or_insert_with(|| {
            totals.push(BoroughTotal {
                borough: point.borough.clone(),
                access_points: 0,
            });
            totals.len() - 1
        });
        totals[slot].access_points += u64::from(point.access_points);
    }

    totals.sort_by(|a, b| b.access_points.cmp(&a.access_points));
    totals
}

pub fn distinct_boroughs(points: &[AccessPoint]) -> Vec<String> {
    let mut seen = HashSet::new();
    points
        .iter()
        .filter(|p| has_borough(p))
        .filter(|p| seen.insert(p.borough.as_str()))
        .map(|p| p.borough.clone())
        .collect()
}

fn has_borough(point: &AccessPoint) -> bool {
    !point.borough.trim().is_empty()
}

pub fn build_dataset(points: Vec<AccessPoint>) -> Dataset {
    let borough_totals = aggregate_by_borough(&points);
    let boroughs = distinct_boroughs(&points);
    Dataset {
        points,
        borough_totals,
        boroughs,
    }
}
