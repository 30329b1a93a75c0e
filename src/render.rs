use crate::config::MapConfig;
use crate::processing::{filter_points, mean_center, selected};
use crate::types::{AccessPoint, Dataset};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

const DARK_BACKGROUND: &str = "#121212";
const FONT_COLOR: &str = "#FFFFFF";
const GRID_COLOR: &str = "#333333";
const MARKER_OPACITY: f64 = 0.6;

const NO_RESULTS_TITLE: &str = "La data seleccionada no genera resultados. Intenta con otros datos";
const FAILURE_TITLE: &str =
    "No se ha seleccionado data en los dropdowns.<br>O los dropdowns seleccionados no generaron datos";

#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter(ScatterTrace),
    Scattermapbox(MapTrace),
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterTrace {
    pub name: String,
    pub mode: &'static str,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub customdata: Vec<String>,
    pub hovertemplate: String,
    pub marker: Marker,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapTrace {
    pub mode: &'static str,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub hovertext: Vec<String>,
    pub hoverinfo: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub opacity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub xanchor: &'static str,
    pub yanchor: &'static str,
    pub font: Font,
}

#[derive(Debug, Clone, Serialize)]
pub struct Font {
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Axis {
    pub title: AxisTitle,
    pub gridcolor: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisTitle {
    pub text: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Legend {
    pub title: AxisTitle,
}

#[derive(Debug, Clone, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Mapbox {
    pub style: String,
    pub zoom: u8,
    pub center: Center,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub title: Title,
    pub paper_bgcolor: &'static str,
    pub plot_bgcolor: &'static str,
    pub font: Font,
    pub margin: Margin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapbox: Option<Mapbox>,
}

/// Why a map query produced no plottable figure.
#[derive(Debug, Error, PartialEq)]
pub enum FigureError {
    #[error("borough and neighborhood must both be selected")]
    NoSelection,
    #[error("no located access points in {neighborhood}, {borough}")]
    NoMatches { borough: String, neighborhood: String },
    #[error("map center is not finite: lat={lat}, lon={lon}")]
    NonFiniteCenter { lat: f64, lon: f64 },
}

impl Title {
    fn centered(text: impl Into<String>) -> Self {
        Title {
            text: text.into(),
            x: 0.5,
            y: 0.95,
            xanchor: "center",
            yanchor: "top",
            font: Font {
                color: FONT_COLOR,
                size: Some(18),
            },
        }
    }
}

impl Layout {
    fn dark(title: Title) -> Self {
        Layout {
            title,
            paper_bgcolor: DARK_BACKGROUND,
            plot_bgcolor: DARK_BACKGROUND,
            font: Font {
                color: FONT_COLOR,
                size: None,
            },
            margin: Margin { l: 50, r: 50, t: 80, b: 50 },
            xaxis: None,
            yaxis: None,
            legend: None,
            mapbox: None,
        }
    }
}

/// All located poles, one trace per borough in first-appearance order.
pub fn scatter_figure(dataset: &Dataset) -> Figure {
    let mut order: Vec<&str> = Vec::new();
    let mut by_borough: HashMap<&str, Vec<&AccessPoint>> = HashMap::new();

    for point in dataset.points.iter().filter(|p| p.location.is_some()) {
        by_borough
            .entry(point.borough.as_str())
            .or_insert_with(|| {
                order.push(point.borough.as_str());
                Vec::new()
            })
            .push(point);
    }

    let data = order
        .into_iter()
        .map(|borough| {
            let points = by_borough.remove(borough).unwrap_or_default();
            let (x, y): (Vec<f64>, Vec<f64>) = points
                .iter()
                .filter_map(|p| p.location)
                .map(|loc| (loc.x(), loc.y()))
                .unzip();
            Trace::Scatter(ScatterTrace {
                name: borough.to_string(),
                mode: "markers",
                x,
                y,
                customdata: points.iter().map(|p| p.neighborhood.clone()).collect(),
                hovertemplate: format!(
                    "Alcaldía={}<br>Longitud=%{{x}}<br>Latitud=%{{y}}<br>Colonia=%{{customdata}}<extra></extra>",
                    borough
                ),
                marker: Marker { opacity: MARKER_OPACITY },
            })
        })
        .collect();

    let mut layout = Layout::dark(Title::centered(""));
    layout.xaxis = Some(Axis {
        title: AxisTitle { text: "Longitud" },
        gridcolor: GRID_COLOR,
    });
    layout.yaxis = Some(Axis {
        title: AxisTitle { text: "Latitud" },
        gridcolor: GRID_COLOR,
    });
    layout.legend = Some(Legend {
        title: AxisTitle { text: "Alcaldías" },
    });

    Figure { data, layout }
}

/// Map for the selected pair. Never fails: every error becomes a placeholder.
pub fn map_figure(
    dataset: &Dataset,
    borough: Option<&str>,
    neighborhood: Option<&str>,
    config: &MapConfig,
) -> Figure {
    match try_map_figure(dataset, borough, neighborhood, config) {
        Ok(figure) => figure,
        Err(err) => {
            match &err {
                FigureError::NoSelection | FigureError::NoMatches { .. } => {
                    debug!(error = %err, "Serving placeholder map")
                }
                FigureError::NonFiniteCenter { .. } => {
                    warn!(error = %err, "Map computation failed, serving placeholder")
                }
            }
            placeholder_for(&err, config)
        }
    }
}

pub fn try_map_figure(
    dataset: &Dataset,
    borough: Option<&str>,
    neighborhood: Option<&str>,
    config: &MapConfig,
) -> Result<Figure, FigureError> {
    let (Some(borough), Some(neighborhood)) = (selected(borough), selected(neighborhood)) else {
        return Err(FigureError::NoSelection);
    };

    let matched: Vec<&AccessPoint> = filter_points(dataset, borough, neighborhood)
        .into_iter()
        .filter(|p| p.location.is_some())
        .collect();

    let center = mean_center(&matched).ok_or_else(|| FigureError::NoMatches {
        borough: borough.to_string(),
        neighborhood: neighborhood.to_string(),
    })?;
    if !(center.x().is_finite() && center.y().is_finite()) {
        return Err(FigureError::NonFiniteCenter {
            lat: center.y(),
            lon: center.x(),
        });
    }

    let (lon, lat): (Vec<f64>, Vec<f64>) = matched
        .iter()
        .filter_map(|p| p.location)
        .map(|loc| (loc.x(), loc.y()))
        .unzip();

    let trace = MapTrace {
        mode: "markers",
        lat,
        lon,
        hovertext: matched.iter().map(|p| p.neighborhood.clone()).collect(),
        hoverinfo: "text",
    };

    let title = format!("Mapa de {} en {}", neighborhood, borough);
    Ok(map_with(
        vec![Trace::Scattermapbox(trace)],
        title,
        Center {
            lat: center.y(),
            lon: center.x(),
        },
        config,
    ))
}

pub fn placeholder_map(title: &str, config: &MapConfig) -> Figure {
    let empty = MapTrace {
        mode: "markers",
        lat: Vec::new(),
        lon: Vec::new(),
        hovertext: Vec::new(),
        hoverinfo: "text",
    };
    map_with(
        vec![Trace::Scattermapbox(empty)],
        title.to_string(),
        Center {
            lat: config.center_lat,
            lon: config.center_lon,
        },
        config,
    )
}

fn placeholder_for(err: &FigureError, config: &MapConfig) -> Figure {
    let title = match err {
        FigureError::NoSelection | FigureError::NoMatches { .. } => NO_RESULTS_TITLE,
        FigureError::NonFiniteCenter { .. } => FAILURE_TITLE,
    };
    placeholder_map(title, config)
}

fn map_with(data: Vec<Trace>, title: String, center: Center, config: &MapConfig) -> Figure {
    let mut layout = Layout::dark(Title::centered(title));
    layout.mapbox = Some(Mapbox {
        style: config.style.clone(),
        zoom: config.zoom,
        center,
    });
    Figure { data, layout }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::build_dataset;
    use geo::Point;

    fn point(borough: &str, neighborhood: &str, lon: f64, lat: f64) -> AccessPoint {
        AccessPoint {
            borough: borough.to_string(),
            neighborhood: neighborhood.to_string(),
            location: Some(Point::new(lon, lat)),
            access_points: 1,
        }
    }

    fn dataset() -> Dataset {
        build_dataset(vec![
            point("CUAUHTÉMOC", "ROMA NORTE", -99.16, 19.42),
            point("MIGUEL HIDALGO", "POLANCO", -99.20, 19.44),
            point("CUAUHTÉMOC", "ROMA NORTE", -99.18, 19.40),
            point("CUAUHTÉMOC", "CENTRO", -99.13, 19.43),
        ])
    }

    fn map_of(figure: &Figure) -> &Mapbox {
        figure.layout.mapbox.as_ref().unwrap()
    }

    fn map_trace(figure: &Figure) -> &MapTrace {
        match &figure.data[0] {
            Trace::Scattermapbox(trace) => trace,
            other => panic!("expected map trace, got {:?}", other),
        }
    }

    #[test]
    fn map_centers_on_mean_of_matched_points() {
        let config = MapConfig::default();
        let figure = map_figure(&dataset(), Some("CUAUHTÉMOC"), Some("ROMA NORTE"), &config);

        let mapbox = map_of(&figure);
        assert!((mapbox.center.lat - 19.41).abs() < 1e-9);
        assert!((mapbox.center.lon - (-99.17)).abs() < 1e-9);
        assert_eq!(mapbox.zoom, 12);
        assert_eq!(mapbox.style, "carto-positron");
        assert_eq!(figure.layout.title.text, "Mapa de ROMA NORTE en CUAUHTÉMOC");

        let trace = map_trace(&figure);
        assert_eq!(trace.lat, vec![19.42, 19.40]);
        assert_eq!(trace.lon, vec![-99.16, -99.18]);
        assert_eq!(trace.hovertext, vec!["ROMA NORTE", "ROMA NORTE"]);
    }

    #[test]
    fn empty_selection_returns_placeholder() {
        let config = MapConfig::default();
        let data = dataset();
        for (borough, neighborhood) in [
            (None, None),
            (Some("CUAUHTÉMOC"), None),
            (None, Some("ROMA NORTE")),
            (Some(""), Some("ROMA NORTE")),
        ] {
            let figure = map_figure(&data, borough, neighborhood, &config);
            assert_eq!(figure.layout.title.text, NO_RESULTS_TITLE);
            assert_eq!(map_of(&figure).center, Center { lat: 19.4326, lon: -99.1332 });
            assert!(map_trace(&figure).lat.is_empty());
        }
    }

    #[test]
    fn unmatched_pair_returns_no_results_placeholder() {
        let config = MapConfig::default();
        let figure = map_figure(&dataset(), Some("MIGUEL HIDALGO"), Some("ROMA NORTE"), &config);
        assert_eq!(figure.layout.title.text, NO_RESULTS_TITLE);
        assert_eq!(map_of(&figure).center, Center { lat: 19.4326, lon: -99.1332 });
        assert!(map_trace(&figure).lon.is_empty());
    }

    #[test]
    fn try_map_figure_distinguishes_the_failure() {
        let config = MapConfig::default();
        let data = dataset();
        assert_eq!(
            try_map_figure(&data, None, Some("CENTRO"), &config).unwrap_err(),
            FigureError::NoSelection
        );
        assert_eq!(
            try_map_figure(&data, Some("Tlalpan"), Some("CENTRO"), &config).unwrap_err(),
            FigureError::NoMatches {
                borough: "Tlalpan".to_string(),
                neighborhood: "CENTRO".to_string(),
            }
        );
    }

    #[test]
    fn overflowing_center_falls_back_to_failure_placeholder() {
        let config = MapConfig::default();
        let data = build_dataset(vec![
            point("Tlalpan", "CENTRO", f64::MAX, 19.29),
            point("Tlalpan", "CENTRO", f64::MAX, 19.29),
        ]);

        match try_map_figure(&data, Some("Tlalpan"), Some("CENTRO"), &config).unwrap_err() {
            FigureError::NonFiniteCenter { lon, .. } => assert!(!lon.is_finite()),
            other => panic!("expected non-finite center, got {:?}", other),
        }

        let figure = map_figure(&data, Some("Tlalpan"), Some("CENTRO"), &config);
        assert_eq!(figure.layout.title.text, FAILURE_TITLE);
        assert_eq!(map_of(&figure).center, Center { lat: 19.4326, lon: -99.1332 });
        assert!(map_trace(&figure).lat.is_empty());
    }

    #[test]
    fn rows_without_location_count_as_no_match() {
        let mut unlocated = point("Tlalpan", "CENTRO", 0.0, 0.0);
        unlocated.location = None;
        let data = build_dataset(vec![unlocated]);
        let figure = map_figure(&data, Some("Tlalpan"), Some("CENTRO"), &MapConfig::default());
        assert_eq!(figure.layout.title.text, NO_RESULTS_TITLE);
    }

    #[test]
    fn placeholder_uses_configured_center() {
        let config = MapConfig {
            center_lat: 20.0,
            center_lon: -100.0,
            ..MapConfig::default()
        };
        let figure = map_figure(&dataset(), None, None, &config);
        assert_eq!(map_of(&figure).center, Center { lat: 20.0, lon: -100.0 });
    }

    #[test]
    fn scatter_has_one_trace_per_borough_in_source_order() {
        let figure = scatter_figure(&dataset());
        let names: Vec<&str> = figure
            .data
            .iter()
            .map(|trace| match trace {
                Trace::Scatter(s) => s.name.as_str(),
                other => panic!("expected scatter trace, got {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["CUAUHTÉMOC", "MIGUEL HIDALGO"]);

        let Trace::Scatter(first) = &figure.data[0] else {
            unreachable!()
        };
        assert_eq!(first.x, vec![-99.16, -99.18, -99.13]);
        assert_eq!(first.y, vec![19.42, 19.40, 19.43]);
        assert_eq!(first.customdata, vec!["ROMA NORTE", "ROMA NORTE", "CENTRO"]);
        assert!((first.marker.opacity - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn figures_serialize_as_plotly_json() {
        let scatter = serde_json::to_value(scatter_figure(&dataset())).unwrap();
        assert_eq!(scatter["data"][0]["type"], "scatter");
        assert_eq!(scatter["layout"]["legend"]["title"]["text"], "Alcaldías");
        assert_eq!(scatter["layout"]["xaxis"]["title"]["text"], "Longitud");
        assert!(scatter["layout"].get("mapbox").is_none());

        let map = serde_json::to_value(map_figure(&dataset(), None, None, &MapConfig::default())).unwrap();
        assert_eq!(map["data"][0]["type"], "scattermapbox");
        assert_eq!(map["layout"]["mapbox"]["style"], "carto-positron");
        assert_eq!(map["layout"]["mapbox"]["center"]["lat"], 19.4326);
    }
}
