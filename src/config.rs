use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCE: &str = "https://datos.cdmx.gob.mx/dataset/909a033e-9a2c-41c7-a10e-ab1bd92a8095/resource/7cc6ff61-6178-4ba6-b39f-1f9eb3def57b/download/2023-06-26-wifi_gratuito_en_postes_c5.csv";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub server: ServerConfig,
    pub map: MapConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub source: String, // URL or local path
    pub encoding: Encoding,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[serde(alias = "latin-1", alias = "iso-8859-1")]
    Latin1,
    #[serde(alias = "utf-8")]
    Utf8,
}

/// Where the CSV comes from, derived from `InputConfig::source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Url(String),
    File(PathBuf),
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub style: String,
    pub zoom: u8,
    // City center, used by the placeholder map
    pub center_lat: f64,
    pub center_lon: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub title: String,
    pub subtitle: String,
    pub table_page_size: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            source: DEFAULT_SOURCE.to_string(),
            encoding: Encoding::Latin1,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8050,
            debug: true,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            style: "carto-positron".to_string(),
            zoom: 12,
            center_lat: 19.4326,
            center_lon: -99.1332,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            title: "Postes de la CDMX".to_string(),
            subtitle: "Puntos de acceso Wi-Fi gratuito en postes del C5".to_string(),
            table_page_size: 10,
        }
    }
}

impl InputConfig {
    pub fn data_source(&self) -> DataSource {
        let source = self.source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            DataSource::Url(source.to_string())
        } else {
            DataSource::File(PathBuf::from(source))
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Uses the file when one is given, the built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}
