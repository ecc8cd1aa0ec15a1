use super::routing::provider::remote::DEFAULT_ENDPOINT;
use super::util::rate_limit::DEFAULT_ROUTES_PER_MINUTE;
use super::waypoints::HomeBase;
use std::{env, path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: \"{value}\"")]
    Invalid { var: &'static str, value: String },
}

/// Which routing provider to talk to.
#[derive(Debug, Clone, PartialEq)]
pub enum OrsConfig {
    Remote { api_key: String, endpoint: String },
    Local { endpoint: String },
}

impl OrsConfig {
    pub fn endpoint(&self) -> &str {
        match self {
            OrsConfig::Remote { endpoint, .. } | OrsConfig::Local { endpoint } => endpoint,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub tasks_endpoint: String,
    pub routing: OrsConfig,
    /// `None` when `HOME_BASE` is unset or malformed; the fallback depot applies.
    pub home_base: Option<HomeBase>,
    pub roster_csv: Option<PathBuf>,
    pub routes_per_minute: u32,
    pub http_timeout: Duration,
}

impl DispatchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tasks_endpoint = get("TASKS_ENDPOINT").ok_or(ConfigError::Missing("TASKS_ENDPOINT"))?;
        let endpoint = get("ROUTE_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let routing = match get("ORS_API_KEY") {
            Some(api_key) => OrsConfig::Remote { api_key, endpoint },
            None => OrsConfig::Local { endpoint },
        };

        let home_base = get("HOME_BASE").and_then(|raw| {
            let parsed = HomeBase::parse(&raw);
            if parsed.is_none() {
                log::warn!("Ignoring malformed HOME_BASE \"{}\", using the default depot", raw);
            }
            parsed
        });

        Ok(Self {
            tasks_endpoint,
            routing,
            home_base,
            roster_csv: get("ROSTER_CSV").map(PathBuf::from),
            routes_per_minute: parse_or("ROUTE_RATE_PER_MINUTE", get("ROUTE_RATE_PER_MINUTE"), DEFAULT_ROUTES_PER_MINUTE)?,
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), 15)?),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
