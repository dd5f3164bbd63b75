//! Periodic refresh of bus locations.
//!
//! Cycles run one at a time: a tick that comes due while a cycle is still in
//! flight is skipped rather than queued, so requests never overlap. Each cycle
//! is bounded by `cycle_timeout`; on timeout the previous batch stays current.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::fetch::HttpClient;
use crate::model::BusLocation;
use crate::service::BusLocationService;

/// Shown to users when a cycle does not complete in time.
pub const UNAVAILABLE_MESSAGE: &str = "Unable to fetch bus locations";

/// Shortest interval between cycles; smaller configured values are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub cycle_timeout: Duration,
    /// Number of cycles to run; `0` runs until the task is dropped.
    pub num_samples: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            cycle_timeout: Duration::from_secs(10),
            num_samples: 0,
        }
    }
}

pub struct Poller<C> {
    service: Arc<BusLocationService<C>>,
    config: PollerConfig,
    route: watch::Receiver<u32>,
    latest: Vec<BusLocation>,
}

impl<C: HttpClient> Poller<C> {
    /// Creates a poller for `initial_route`.
    ///
    /// The returned sender selects the route; sending a new id triggers an
    /// immediate cycle for it.
    pub fn new(
        service: Arc<BusLocationService<C>>,
        config: PollerConfig,
        initial_route: u32,
    ) -> (Self, watch::Sender<u32>) {
        let (selector, route) = watch::channel(initial_route);
        let poller = Self {
            service,
            config,
            route,
            latest: Vec::new(),
        };
        (poller, selector)
    }

    /// The most recent batch delivered, empty before the first one.
    pub fn latest(&self) -> &[BusLocation] {
        &self.latest
    }

    /// Runs cycles until `num_samples` is reached, handing every completed
    /// batch to `sink` together with the route it was fetched for.
    ///
    /// Sink errors are logged and do not stop polling.
    pub async fn run<F>(&mut self, mut sink: F)
    where
        F: FnMut(u32, &[BusLocation]) -> anyhow::Result<()>,
    {
        if self.config.interval < MIN_INTERVAL {
            warn!(
                interval_ms = self.config.interval.as_millis() as u64,
                "Polling interval too short, using {}ms",
                MIN_INTERVAL.as_millis()
            );
        }
        let mut ticker = tokio::time::interval(self.config.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut selector_open = true;
        let mut cycles = 0;

        while self.config.num_samples == 0 || cycles < self.config.num_samples {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = self.route.changed(), if selector_open => {
                    if changed.is_err() {
                        selector_open = false;
                        continue;
                    }
                    info!(route_id = *self.route.borrow(), "Route changed, refreshing now");
                    ticker.reset();
                }
            }

            cycles += 1;
            let route_id = *self.route.borrow_and_update();
            self.run_cycle(route_id, &mut sink).await;
        }

        info!(cycles, "Polling finished");
    }

    async fn run_cycle<F>(&mut self, route_id: u32, sink: &mut F)
    where
        F: FnMut(u32, &[BusLocation]) -> anyhow::Result<()>,
    {
        let fetch = self.service.fetch_bus_location(route_id);
        match tokio::time::timeout(self.config.cycle_timeout, fetch).await {
            Ok(batch) => {
                if let Err(e) = sink(route_id, &batch) {
                    error!(route_id, error = %e, "Failed to deliver bus locations");
                }
                self.latest = batch;
            }
            Err(_) => {
                warn!(
                    route_id,
                    timeout_ms = self.config.cycle_timeout.as_millis() as u64,
                    "{UNAVAILABLE_MESSAGE}, keeping previous locations"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::routes::RouteTable;
    use async_trait::async_trait;
    use reqwest::{Request, Response};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Never answers within the test timeouts.
    struct Stalled;

    #[async_trait]
    impl HttpClient for Stalled {
        async fn execute(&self, _req: Request) -> reqwest::Result<Response> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(reqwest::Client::new().get("not a url").build().unwrap_err())
        }
    }

    /// Answers the first request with one live vehicle, then stalls.
    #[derive(Default)]
    struct AnswersOnce {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for AnswersOnce {
        async fn execute(&self, req: Request) -> reqwest::Result<Response> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                return Stalled.execute(req).await;
            }
            let body = r#"{"meta": {}, "response": [{"vId": "v1", "la": 34.73, "lo": -86.58}]}"#;
            Ok(Response::from(
                http::Response::builder()
                    .status(200)
                    .body(body.to_string())
                    .unwrap(),
            ))
        }
    }

    fn service_with<C: HttpClient>(client: C) -> Arc<BusLocationService<C>> {
        Arc::new(BusLocationService::new(
            client,
            ProviderConfig::default(),
            Arc::new(RouteTable::builtin().unwrap()),
        ))
    }

    fn service() -> Arc<BusLocationService<Stalled>> {
        service_with(Stalled)
    }

    fn quick(num_samples: usize) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(5),
            cycle_timeout: Duration::from_millis(50),
            num_samples,
        }
    }

    fn ids(batch: &[BusLocation]) -> Vec<String> {
        batch.iter().map(|b| b.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_runs_requested_number_of_cycles() {
        // Route 1 is not live, so cycles never touch the stalled client.
        let (mut poller, _selector) = Poller::new(service(), quick(3), 1);
        let mut batches = Vec::new();

        poller
            .run(|route_id, batch| {
                batches.push((route_id, batch.len()));
                Ok(())
            })
            .await;

        assert_eq!(batches, vec![(1, 1), (1, 1), (1, 1)]);
        assert_eq!(poller.latest().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_interval_still_polls() {
        let config = PollerConfig {
            interval: Duration::ZERO,
            cycle_timeout: Duration::from_secs(1),
            num_samples: 2,
        };
        let (mut poller, _selector) = Poller::new(service(), config, 1);
        let mut delivered = 0;

        poller
            .run(|_, _| {
                delivered += 1;
                Ok(())
            })
            .await;

        assert_eq!(delivered, 2);
    }

    #[tokio::test]
    async fn test_stalled_first_cycle_delivers_nothing() {
        let (mut poller, _selector) = Poller::new(service(), quick(2), 0);
        let mut delivered = 0;

        poller
            .run(|_, _| {
                delivered += 1;
                Ok(())
            })
            .await;

        assert_eq!(delivered, 0);
        assert!(poller.latest().is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_cycle_keeps_previous_batch() {
        let service = service_with(AnswersOnce::default());
        let (mut poller, _selector) = Poller::new(service, quick(2), 0);
        let mut delivered = Vec::new();

        poller
            .run(|_, batch| {
                delivered.push(ids(batch));
                Ok(())
            })
            .await;

        assert_eq!(delivered, vec![vec!["v1".to_string()]]);
        assert_eq!(ids(poller.latest()), ["v1"]);
    }

    #[tokio::test]
    async fn test_route_change_refreshes_before_next_tick() {
        let config = PollerConfig {
            interval: Duration::from_secs(60),
            cycle_timeout: Duration::from_millis(50),
            num_samples: 2,
        };
        let (mut poller, selector) = Poller::new(service(), config, 1);
        let mut routes = Vec::new();

        let run = poller.run(|route_id, _| {
            routes.push(route_id);
            if route_id == 1 {
                selector.send(4)?;
            }
            Ok(())
        });
        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("second cycle should start without waiting for the interval");

        assert_eq!(routes, vec![1, 4]);
        assert_eq!(poller.latest().len(), 1);
    }

    #[tokio::test]
    async fn test_sink_errors_do_not_stop_polling() {
        let (mut poller, selector) = Poller::new(service(), quick(2), 2);
        drop(selector);
        let mut calls = 0;

        poller
            .run(|_, _| {
                calls += 1;
                anyhow::bail!("disk full")
            })
            .await;

        assert_eq!(calls, 2);
    }
}
