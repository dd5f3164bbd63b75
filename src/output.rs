//! Output formatting and persistence for bus-location batches.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::model::BusLocation;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// One CSV row: a single observation plus when and for which route it was
/// fetched. The provider record is left out.
#[derive(Debug, Serialize)]
pub struct LocationRow<'a> {
    pub sampled_at: DateTime<Utc>,
    pub requested_route: u32,
    pub simulated: bool,
    pub id: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
    pub heading_name: &'a str,
    pub speed: f64,
    pub route_id: u32,
    pub route_name: &'a str,
    pub route_short_name: &'a str,
    pub next_stop: &'a str,
    pub timestamp: i64,
}

impl<'a> LocationRow<'a> {
    pub fn new(sampled_at: DateTime<Utc>, requested_route: u32, bus: &'a BusLocation) -> Self {
        Self {
            sampled_at,
            requested_route,
            simulated: bus.is_simulated(),
            id: &bus.id,
            latitude: bus.latitude,
            longitude: bus.longitude,
            heading: bus.heading,
            heading_name: &bus.heading_name,
            speed: bus.speed,
            route_id: bus.route_id,
            route_name: &bus.route_name,
            route_short_name: &bus.route_short_name,
            next_stop: &bus.next_stop,
            timestamp: bus.timestamp,
        }
    }
}

/// Logs a batch using Rust's debug pretty-print format.
pub fn print_pretty(batch: &[BusLocation]) {
    for bus in batch {
        info!("{:#?}", bus);
    }
}

/// Writes a batch to stdout as pretty-printed JSON.
pub fn print_json(batch: &[BusLocation]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(batch)?);
    Ok(())
}

/// Appends one row per location in `batch` to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_batch(path: &str, requested_route: u32, batch: &[BusLocation]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = batch.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    let sampled_at = Utc::now();
    for bus in batch {
        writer.serialize(LocationRow::new(sampled_at, requested_route, bus))?;
    }
    writer.flush()?;

    Ok(())
}
