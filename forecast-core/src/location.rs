//! Location providers and the fallback policy used at startup.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;
use std::time::{Duration, Instant};

use crate::{error::LocationError, model::Coordinate};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(20_000);
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(1_000);

const IP_LOOKUP_URL: &str = "http://ip-api.com/json/";

/// Constraints for a single position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    /// Upper bound on the wait before the fallback coordinate is used.
    pub timeout: Duration,
    /// A cached fix younger than this may be returned without a new lookup.
    pub max_age: Duration,
    pub high_accuracy: bool,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_age: DEFAULT_MAX_AGE,
            high_accuracy: true,
        }
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    async fn locate(&self, request: &LocationRequest) -> Result<Coordinate, LocationError>;
}

/// Coordinates given explicitly on the command line or in config.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn locate(&self, _request: &LocationRequest) -> Result<Coordinate, LocationError> {
        Ok(self.0)
    }
}

/// Host without any positioning support.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl LocationProvider for Unavailable {
    async fn locate(&self, _request: &LocationRequest) -> Result<Coordinate, LocationError> {
        Err(LocationError::Unavailable)
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

/// Approximate position from the public IP address.
#[derive(Debug)]
pub struct IpLocation {
    http: Client,
    url: String,
    last_fix: Mutex<Option<(Instant, Coordinate)>>,
}

impl IpLocation {
    pub fn new() -> Self {
        Self::with_url(IP_LOOKUP_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, max_age: Duration) -> Option<Coordinate> {
        let last_fix = *self.last_fix.lock();
        last_fix
            .filter(|(at, _)| at.elapsed() <= max_age)
            .map(|(_, coordinate)| coordinate)
    }
}

impl Default for IpLocation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for IpLocation {
    async fn locate(&self, request: &LocationRequest) -> Result<Coordinate, LocationError> {
        if let Some(coordinate) = self.cached(request.max_age) {
            tracing::debug!(%coordinate, "reusing cached location fix");
            return Ok(coordinate);
        }

        if request.high_accuracy {
            tracing::debug!("IP lookup only provides city-level accuracy");
        }

        let res = self
            .http
            .get(&self.url)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LocationError::Timeout(request.timeout.as_millis())
                } else {
                    LocationError::Lookup(e.to_string())
                }
            })?;

        if !res.status().is_success() {
            return Err(LocationError::Lookup(format!(
                "lookup returned status {}",
                res.status()
            )));
        }

        let body: IpApiResponse = res
            .json()
            .await
            .map_err(|e| LocationError::Lookup(e.to_string()))?;

        if body.status != "success" {
            return Err(LocationError::Lookup(
                body.message
                    .unwrap_or_else(|| format!("lookup status '{}'", body.status)),
            ));
        }
        let (Some(lat), Some(lon)) = (body.lat, body.lon) else {
            return Err(LocationError::Lookup("lookup returned no coordinates".to_string()));
        };

        let coordinate = Coordinate::new(lat, lon);
        *self.last_fix.lock() = Some((Instant::now(), coordinate));
        Ok(coordinate)
    }
}

/// Where the app will fetch weather for, and why if it is not the user's
/// own position.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub coordinate: Coordinate,
    pub notice: Option<String>,
}

/// Ask `provider` for a position within `request.timeout`. Never fails: on
/// any error the `fallback` coordinate is used and a notice for the user is
/// attached.
pub async fn resolve_location(
    provider: &dyn LocationProvider,
    request: &LocationRequest,
    fallback: Coordinate,
) -> Resolution {
    let outcome = match tokio::time::timeout(request.timeout, provider.locate(request)).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout(request.timeout.as_millis())),
    };

    match outcome {
        Ok(coordinate) => {
            tracing::info!(%coordinate, "location resolved");
            Resolution {
                coordinate,
                notice: None,
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, %fallback, "location unavailable, using fallback");
            Resolution {
                coordinate: fallback,
                notice: Some(format!(
                    "{err}. Showing weather for {fallback} instead."
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NeverResolves;

    #[async_trait]
    impl LocationProvider for NeverResolves {
        async fn locate(&self, _request: &LocationRequest) -> Result<Coordinate, LocationError> {
            std::future::pending().await
        }
    }

    #[test]
    fn default_request_matches_geolocation_constraints() {
        let req = LocationRequest::default();
        assert_eq!(req.timeout, Duration::from_secs(20));
        assert_eq!(req.max_age, Duration::from_secs(1));
        assert!(req.high_accuracy);
    }

    #[tokio::test]
    async fn fixed_location_resolves_without_notice() {
        let coordinate = Coordinate::new(51.5072, -0.1276);
        let res = resolve_location(
            &FixedLocation(coordinate),
            &LocationRequest::default(),
            Coordinate::FALLBACK,
        )
        .await;

        assert_eq!(res.coordinate, coordinate);
        assert!(res.notice.is_none());
    }

    #[tokio::test]
    async fn unavailable_falls_back_with_notice() {
        let res =
            resolve_location(&Unavailable, &LocationRequest::default(), Coordinate::FALLBACK)
                .await;

        assert_eq!(res.coordinate, Coordinate::FALLBACK);
        let notice = res.notice.expect("notice for the user");
        assert!(notice.contains("Location service unavailable"));
        assert!(notice.contains("40.7128, -74.0060"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_to_fallback() {
        let request = LocationRequest {
            timeout: Duration::from_millis(20_000),
            ..LocationRequest::default()
        };
        let res = resolve_location(&NeverResolves, &request, Coordinate::FALLBACK).await;

        assert_eq!(res.coordinate, Coordinate::FALLBACK);
        assert!(res.notice.unwrap().contains("timed out after 20000 ms"));
    }

    #[test]
    fn cached_fix_respects_max_age() {
        let ip = IpLocation::with_url("http://127.0.0.1:9/");
        let coordinate = Coordinate::new(1.0, 2.0);
        *ip.last_fix.lock() = Some((Instant::now(), coordinate));

        assert_eq!(ip.cached(Duration::from_secs(60)), Some(coordinate));

        *ip.last_fix.lock() = Some((Instant::now() - Duration::from_secs(5), coordinate));
        assert_eq!(ip.cached(Duration::from_secs(1)), None);
    }
}
