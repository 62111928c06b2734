use crate::catalog::ProductQuery;
use crate::copernicus::BUCKET;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml;

/// Search and download settings read from a TOML file.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Selection {
    pub search: ProductQuery,
    #[serde(default)]
    pub download: DownloadSettings,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DownloadSettings {
    pub bucket: String,
    pub target_directory: PathBuf,
    pub start_row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_pattern: Option<String>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            bucket: BUCKET.to_string(),
            target_directory: PathBuf::new(),
            start_row: 0,
            image_pattern: None,
        }
    }
}

impl Selection {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let selection: Self = toml::from_str(&content)?;
        Ok(selection)
    }

    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_template(table: &toml::Table) -> Result<Self> {
        let selection: Self = toml::from_str(&table.to_string())?;
        Ok(selection)
    }
}

pub fn selection_toml() -> toml::Table {
    toml::toml! {
        [search]
        start_date = "2024-04-30T00:00:00.000Z"
        end_date = "2024-05-01T00:00:00.000Z"
        // longitude first, then latitude
        polygon = "-66.971000 21.651000, -66.911000 20.761000, -66.043000 20.822000, -66.043000 21.611000, -66.971000 21.651000"
        collection = "SENTINEL-2"
        product_type = "S2MSI1C"

        [download]
        bucket = "eodata"
        target_directory = "imagenes_descargadas"
        start_row = 0
    }
}
