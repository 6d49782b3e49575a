//! Utilities for printing stored locations
use anyhow::Result;
use clap::ValueEnum;
use libqrtrack::Location;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

/// Data format for printing locations
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// Human readable table of data
    Table,
    /// JSON-formatted objects
    Json,
    /// YAML-formatted objects
    Yaml,
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct LocationRow {
    timestamp: String,
    latitude: String,
    longitude: String,
    address: String,
}

impl From<&Location> for LocationRow {
    fn from(loc: &Location) -> Self {
        Self {
            timestamp: loc.timestamp.clone(),
            latitude: loc.lat.to_string(),
            longitude: loc.lon.to_string(),
            address: loc.address.clone(),
        }
    }
}

pub(crate) trait TrackctlTable {
    fn styled(&mut self) -> &mut Self;
}

impl TrackctlTable for Table {
    fn styled(&mut self) -> &mut Self {
        self.with(Style::rounded())
    }
}

/// Serialize a single location into the given data format
pub(crate) fn format_one(loc: &Location, fmt: OutputFormat) -> Result<String> {
    match fmt {
        OutputFormat::Table => {
            let tbuilder = Table::builder(vec![LocationRow::from(loc)])
                .index()
                .column(0)
                .transpose();
            Ok(format!("{}", tbuilder.build().styled()))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(loc)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(loc)?),
    }
}

/// Serialize a sequence of locations into the given data format
pub(crate) fn format_seq(locs: &[Location], fmt: OutputFormat) -> Result<String> {
    match fmt {
        OutputFormat::Table => {
            let mut table = Table::new(locs.iter().map(LocationRow::from));
            Ok(format!("{}\n{} records found", table.styled(), locs.len()))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(locs)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(locs)?),
    }
}
