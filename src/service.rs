//! The bus-location pipeline: live provider first, simulator last.
//!
//! For the live route a cycle goes through up to three stages:
//!
//! 1. the primary request (full parameter set, browser-like headers, strict
//!    envelope check),
//! 2. the fallback request (reduced parameters, `Accept: application/json`
//!    only, `meta` not required), only if the primary one failed,
//! 3. one simulated bus, if neither produced any vehicles.
//!
//! A valid but empty primary response goes straight to stage 3. Other routes
//! always get stage 3.

use std::sync::Arc;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderValue, REFERER, USER_AGENT};
use reqwest::{Method, Request};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{ProviderConfig, TIME_HORIZON};
use crate::error::{FetchError, truncate};
use crate::fetch::auth::UrlParam;
use crate::fetch::{HttpClient, fetch_text};
use crate::model::BusLocation;
use crate::normalize::normalize_vehicles;
use crate::parser::{Envelope, parse_vehicle_list};
use crate::routes::{LIVE_ROUTE_ID, RouteTable};
use crate::simulator::simulate_single_bus;

const PRIMARY_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const FALLBACK_ACCEPT: &str = "application/json";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";
const TITLE_TEMPLATE: &str = "{@masterRouteShortName} - Vehicle {@internalVehicleId}";
const BODY_TEMPLATE: &str = "Heading {@tripDirection} on {@masterRouteLongName} at {@speed}mph";

pub struct BusLocationService<C> {
    client: UrlParam<C>,
    config: ProviderConfig,
    routes: Arc<RouteTable>,
}

impl<C: HttpClient> BusLocationService<C> {
    /// Wraps `client` so that every request carries the configured API key.
    pub fn new(client: C, config: ProviderConfig, routes: Arc<RouteTable>) -> Self {
        let client = UrlParam::new(client, "key", &config.api_key);
        Self {
            client,
            config,
            routes,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Current positions for `route_id`.
    ///
    /// Never fails and never returns an empty batch: when live data is
    /// unavailable the result is a single simulated bus.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_bus_location(&self, route_id: u32) -> Vec<BusLocation> {
        if route_id == LIVE_ROUTE_ID {
            if let Some(buses) = self.fetch_live().await {
                return buses;
            }
        } else {
            debug!("Route has no live feed");
        }

        info!("Using simulated data");
        self.simulate()
    }

    async fn fetch_live(&self) -> Option<Vec<BusLocation>> {
        match self.fetch_primary().await {
            Ok(vehicles) if vehicles.is_empty() => {
                warn!("No buses found in API response");
                None
            }
            Ok(vehicles) => Some(self.normalize(&vehicles)),
            Err(e) => {
                error!(error = %e, "Error fetching real bus data");
                info!("Attempting fallback request with minimal headers");
                match self.fetch_fallback().await {
                    Ok(vehicles) if vehicles.is_empty() => {
                        warn!("Fallback response contained no buses");
                        None
                    }
                    Ok(vehicles) => {
                        info!(count = vehicles.len(), "Fallback API succeeded");
                        Some(self.normalize(&vehicles))
                    }
                    Err(e) => {
                        error!(error = %e, "Fallback request also failed");
                        None
                    }
                }
            }
        }
    }

    async fn fetch_primary(&self) -> Result<Vec<Value>, FetchError> {
        let body = fetch_text(&self.client, self.primary_request()?).await?;
        debug!(body = truncate(&body, 200), "Raw response text");
        validate(&body, Envelope::Strict)
    }

    async fn fetch_fallback(&self) -> Result<Vec<Value>, FetchError> {
        let body = fetch_text(&self.client, self.fallback_request()).await?;
        debug!(body = truncate(&body, 200), "Fallback response text");
        validate(&body, Envelope::Relaxed)
    }

    fn primary_request(&self) -> Result<Request, FetchError> {
        let mut url = self.config.base_url.clone();
        url.query_pairs_mut()
            .append_pair("agency", &self.config.agency)
            .append_pair("routes", &self.config.routes)
            .append_pair("title", TITLE_TEMPLATE)
            .append_pair("body", BODY_TEMPLATE)
            .append_pair("timeHorizon", TIME_HORIZON)
            .append_pair("timeSensitive", "false")
            .append_pair("templates[]", "title")
            .append_pair("templates[]", "body");

        let mut req = Request::new(Method::GET, url);
        let headers = req.headers_mut();
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.config.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static(PRIMARY_ACCEPT));
        headers.insert(REFERER, HeaderValue::from_str(&self.config.referer)?);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
        Ok(req)
    }

    fn fallback_request(&self) -> Request {
        let mut url = self.config.base_url.clone();
        url.query_pairs_mut()
            .append_pair("agency", &self.config.agency)
            .append_pair("routes", &self.config.routes)
            .append_pair("timeHorizon", TIME_HORIZON)
            .append_pair("timeSensitive", "false");

        let mut req = Request::new(Method::GET, url);
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static(FALLBACK_ACCEPT));
        req
    }

    fn normalize(&self, vehicles: &[Value]) -> Vec<BusLocation> {
        normalize_vehicles(vehicles, self.routes.primary(), &mut rand::rng())
    }

    fn simulate(&self) -> Vec<BusLocation> {
        simulate_single_bus(self.routes.primary(), &mut rand::rng())
    }
}

fn validate(body: &str, envelope: Envelope) -> Result<Vec<Value>, FetchError> {
    parse_vehicle_list(body, envelope).inspect_err(|e| match e {
        FetchError::Markup => {
            error!(body = truncate(body, 500), "Received HTML instead of JSON")
        }
        FetchError::Parse(_) => {
            error!(body = truncate(body, 500), "Response that failed to parse")
        }
        _ => warn!(error = %e, "Invalid API response format"),
    })
}
