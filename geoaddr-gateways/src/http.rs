use std::{thread, time::Duration};

use geoaddr_core::entities::{Address, Coordinates};
use reqwest::{blocking::Client, StatusCode, Url};
use thiserror::Error;

/// Settings shared by all HTTP based providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSettings {
    pub timeout: Duration,
    /// Total number of attempts for transient failures.
    pub retry_times: u32,
    pub retry_sleep: Duration,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_times: 3,
            retry_sleep: Duration::from_millis(1000),
        }
    }
}

/// Reasons why a lookup did not yield coordinates.
#[derive(Debug, Error)]
pub(crate) enum LookupFailure {
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Transport(reqwest::Error),
    #[error("Unexpected response status {0}")]
    Status(StatusCode),
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("No results")]
    NoResults,
    #[error("Zero coordinates")]
    NullIsland,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LookupFailure {
    fn from(err: reqwest::Error) -> Self {
        // The URL may carry an API key
        Self::Transport(err.without_url())
    }
}

impl From<serde_json::Error> for LookupFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl LookupFailure {
    fn is_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials
                | Self::InvalidUrl(_)
                | Self::Transport(_)
                | Self::InvalidResponse(_)
        )
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Performs a GET request and returns the response body.
///
/// Transport errors and server side failures are retried according
/// to the settings.
pub(crate) fn get_text(
    url: Url,
    user_agent: Option<&str>,
    settings: &RequestSettings,
) -> Result<String, LookupFailure> {
    let mut builder = Client::builder().timeout(settings.timeout);
    if let Some(user_agent) = user_agent {
        builder = builder.user_agent(user_agent);
    }
    let client = builder.build()?;
    let attempts = settings.retry_times.max(1);
    let mut attempt = 1;
    loop {
        let failure = match client.get(url.clone()).send() {
            Ok(response) if response.status().is_success() => {
                return Ok(response.text()?);
            }
            Ok(response) if is_transient_status(response.status()) => {
                LookupFailure::Status(response.status())
            }
            Ok(response) => return Err(LookupFailure::Status(response.status())),
            Err(err) => LookupFailure::from(err),
        };
        if attempt >= attempts {
            return Err(failure);
        }
        log::debug!("Request attempt {attempt} of {attempts} failed: {failure}");
        attempt += 1;
        thread::sleep(settings.retry_sleep);
    }
}

pub(crate) fn parse_url<I, K, V>(base_url: &str, params: I) -> Result<Url, LookupFailure>
where
    I: IntoIterator,
    I::Item: std::borrow::Borrow<(K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    Url::parse_with_params(base_url, params)
        .map_err(|err| LookupFailure::InvalidUrl(err.to_string()))
}

pub(crate) fn checked_coordinates(lat: f64, lng: f64) -> Result<Coordinates, LookupFailure> {
    let coordinates = Coordinates::try_from_lat_lng(lat, lng)
        .map_err(|err| LookupFailure::InvalidResponse(err.to_string()))?;
    if coordinates.is_null_island() {
        return Err(LookupFailure::NullIsland);
    }
    Ok(coordinates)
}

/// Logs a failed lookup and turns the result into the soft outcome
/// every provider reports.
pub(crate) fn log_outcome(
    provider: &str,
    address: &Address,
    result: Result<Coordinates, LookupFailure>,
) -> Option<Coordinates> {
    match result {
        Ok(coordinates) => {
            log::debug!(
                "Provider '{provider}' resolved address {} to {coordinates}",
                address.id
            );
            Some(coordinates)
        }
        Err(failure) if failure.is_error() => {
            log::error!(
                "Geocoding with '{provider}' failed for address {} ({}): {failure}",
                address.id,
                address.formatted_address()
            );
            None
        }
        Err(failure) => {
            log::warn!(
                "Geocoding with '{provider}' found nothing for address {} ({}): {failure}",
                address.id,
                address.formatted_address()
            );
            None
        }
    }
}
