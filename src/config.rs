//! Provider endpoint settings.
//!
//! Values come from the environment (a `.env` file is honored by the binary)
//! and fall back to the public RouteShout adapter for Huntsville:
//!
//! | Variable                 | Default                                   |
//! |--------------------------|-------------------------------------------|
//! | `BUS_TRACKER_BASE_URL`   | the `rs.vehicle.getListByRoutes` endpoint |
//! | `BUS_TRACKER_API_KEY`    | `RouteShoutAPIAdapterv2.0`                |
//! | `BUS_TRACKER_AGENCY`     | `1`                                       |
//! | `BUS_TRACKER_ROUTES`     | `Meridian/A&M`                            |
//! | `BUS_TRACKER_REFERER`    | the provider's stop page                  |
//! | `BUS_TRACKER_USER_AGENT` | a mobile Chrome user agent                |

use anyhow::{Context, Result};
use reqwest::Url;

pub const DEFAULT_BASE_URL: &str =
    "https://huntsville.routematch.io/routeshout/api/v2.0/rs.vehicle.getListByRoutes";
pub const DEFAULT_API_KEY: &str = "RouteShoutAPIAdapterv2.0";
pub const DEFAULT_AGENCY: &str = "1";
pub const DEFAULT_ROUTES: &str = "Meridian/A&M";
pub const DEFAULT_REFERER: &str = "https://huntsville.routematch.io/routeshout/stop/Alabama+A+%26+M+College?mRouteId=Meridian/A&M";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 12; sdk_gphone64_arm64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.6668.81 Mobile Safari/537.36";

/// Look-ahead window requested from the provider.
pub const TIME_HORIZON: &str = "60";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: Url,
    pub api_key: String,
    pub agency: String,
    pub routes: String,
    pub referer: String,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            api_key: DEFAULT_API_KEY.to_string(),
            agency: DEFAULT_AGENCY.to_string(),
            routes: DEFAULT_ROUTES.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |name: &str, default: String| lookup(name).unwrap_or(default);

        let base_url = match lookup("BUS_TRACKER_BASE_URL") {
            Some(raw) => Url::parse(&raw)
                .with_context(|| format!("BUS_TRACKER_BASE_URL is not a valid url: '{raw}'"))?,
            None => defaults.base_url,
        };

        Ok(Self {
            base_url,
            api_key: var("BUS_TRACKER_API_KEY", defaults.api_key),
            agency: var("BUS_TRACKER_AGENCY", defaults.agency),
            routes: var("BUS_TRACKER_ROUTES", defaults.routes),
            referer: var("BUS_TRACKER_REFERER", defaults.referer),
            user_agent: var("BUS_TRACKER_USER_AGENT", defaults.user_agent),
        })
    }
}
