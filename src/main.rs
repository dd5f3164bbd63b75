//! CLI entry point for the bus tracker.
//!
//! Provides subcommands for a one-off location fetch, continuous polling into
//! a CSV file, and inspecting the route reference data.

use anyhow::Result;
use bus_tracker::{
    config::ProviderConfig,
    fetch::BasicClient,
    output::{append_batch, print_json, print_pretty},
    poller::{Poller, PollerConfig},
    routes::{LIVE_ROUTE_ID, RouteTable},
    service::BusLocationService,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bus_tracker")]
#[command(about = "Live bus positions with a simulated fallback", long_about = None)]
struct Cli {
    /// Route table JSON file (defaults to the built-in table)
    #[arg(long, global = true, value_name = "FILE")]
    routes: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch bus locations once and print them
    Fetch {
        /// Route id to fetch
        #[arg(short, long, default_value_t = LIVE_ROUTE_ID)]
        route: u32,

        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Poll bus locations on an interval and append them to a CSV file
    Watch {
        /// Route id to poll
        #[arg(short, long, default_value_t = LIVE_ROUTE_ID)]
        route: u32,

        /// Seconds between cycles
        #[arg(short, long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Seconds a cycle may take before it is abandoned
        #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: u64,

        /// Number of cycles to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        num_samples: usize,

        /// CSV file to append results to
        #[arg(short, long, default_value = "locations.csv")]
        output: String,
    },
    /// List known routes and their stops
    Routes,
    /// Find the stop on the live route nearest to a coordinate
    Nearest {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bus_tracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bus_tracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let routes = Arc::new(match &cli.routes {
        Some(path) => RouteTable::load(path)?,
        None => RouteTable::builtin()?,
    });

    match cli.command {
        Commands::Fetch { route, format } => {
            let service =
                BusLocationService::new(BasicClient::new(), ProviderConfig::from_env()?, routes);
            let batch = service.fetch_bus_location(route).await;
            info!(route_id = route, count = batch.len(), "Bus locations fetched");

            match format {
                Format::Json => print_json(&batch)?,
                Format::Pretty => print_pretty(&batch),
            }
        }
        Commands::Watch {
            route,
            interval,
            timeout,
            num_samples,
            output,
        } => {
            let service = Arc::new(BusLocationService::new(
                BasicClient::new(),
                ProviderConfig::from_env()?,
                routes,
            ));
            let config = PollerConfig {
                interval: Duration::from_secs(interval),
                cycle_timeout: Duration::from_secs(timeout),
                num_samples,
            };

            if num_samples == 0 {
                info!(interval, "Polling infinitely. Press Ctrl+C to stop.");
            } else {
                info!(num_samples, interval, "Starting polling");
            }

            let (mut poller, _selector) = Poller::new(service, config, route);
            poller
                .run(|route_id, batch| {
                    if let Some(first) = batch.first() {
                        info!(
                            route_id,
                            count = batch.len(),
                            latitude = first.latitude,
                            longitude = first.longitude,
                            next_stop = %first.next_stop,
                            "Bus locations updated"
                        );
                    }
                    append_batch(&output, route_id, batch)
                })
                .await;

            info!(output = %output, "Finished polling");
        }
        Commands::Routes => {
            for route in routes.iter() {
                info!(
                    route_id = route.id,
                    name = %route.name,
                    short_name = %route.short_name,
                    path_points = route.path.len(),
                    stops = route.stops.len(),
                    "Route"
                );
                for stop in &route.stops {
                    info!(
                        route_id = route.id,
                        stop_id = %stop.id,
                        name = %stop.name,
                        latitude = stop.latitude,
                        longitude = stop.longitude,
                        "Stop"
                    );
                }
            }
        }
        Commands::Nearest { lat, lon } => {
            let stop = routes.primary().nearest_stop(lat, lon);
            info!(lat, lon, stop, "Nearest stop");
            println!("{stop}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_defaults() {
        let cli = Cli::try_parse_from(["bus_tracker", "watch"]).unwrap();
        match cli.command {
            Commands::Watch {
                interval, timeout, ..
            } => {
                assert_eq!(interval, 15);
                assert_eq!(timeout, 10);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_zero_interval_or_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["bus_tracker", "watch", "--interval", "0"]).is_err());
        assert!(Cli::try_parse_from(["bus_tracker", "watch", "--timeout", "0"]).is_err());
    }
}
