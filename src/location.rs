//! User location resolution.
//!
//! [`Geolocator::acquire`] is the only entry point. It asks for consent
//! through a [`PermissionPrompt`] (once per call, when enabled), then
//! resolves a fresh position from the configured [`LocationSource`] within a
//! bounded wait. Nothing is cached between calls.

use std::fmt::Display;
use std::net::IpAddr;
use std::time::Duration;

use ipgeolocate::{Locator, Service};
use reqwest::Client;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::config::{LocationConfig, LocationSourceKind};
use crate::error::LocationError;
use crate::models::Coordinate;

/// Something that can ask the user whether their location may be used.
///
/// The answer arrives on the returned channel; a dropped sender counts as
/// "no".
pub trait PermissionPrompt: Send + Sync {
    fn ask(&self) -> oneshot::Receiver<bool>;
}

/// Where positions come from.
pub enum LocationSource {
    /// Geolocate the machine's public IP address.
    Ip(IpLocator),
    /// A fixed coordinate from the config file.
    Manual(Coordinate),
}

impl LocationSource {
    async fn lookup(&self) -> Result<Coordinate, LocationError> {
        match self {
            LocationSource::Ip(locator) => locator.locate().await,
            LocationSource::Manual(coord) => Ok(*coord),
        }
    }
}

/// IP based geolocation through the ip-api.com service.
pub struct IpLocator {
    client: Client,
    echo_url: String,
}

impl IpLocator {
    pub fn new(echo_url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            echo_url: echo_url.to_string(),
        })
    }

    async fn public_ip(&self) -> Result<IpAddr, LocationError> {
        let body = self
            .client
            .get(&self.echo_url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(unavailable)?
            .text()
            .await
            .map_err(unavailable)?;

        body.trim()
            .parse::<IpAddr>()
            .map_err(|e| unavailable(format!("bad public IP {:?}: {}", body.trim(), e)))
    }

    async fn locate(&self) -> Result<Coordinate, LocationError> {
        let ip = self.public_ip().await?;
        let loc = Locator::get(&ip.to_string(), Service::IpApi)
            .await
            .map_err(unavailable)?;

        let lat = loc.latitude.parse::<f64>().map_err(unavailable)?;
        let lon = loc.longitude.parse::<f64>().map_err(unavailable)?;
        info!("Geolocation successful - ({}, {})", lat, lon);
        Ok(Coordinate::new(lat, lon))
    }
}

fn unavailable(e: impl Display) -> LocationError {
    LocationError::Unavailable(e.to_string())
}

pub struct Geolocator {
    source: LocationSource,
    ask_permission: bool,
    timeout: Duration,
}

impl Geolocator {
    pub fn new(source: LocationSource, ask_permission: bool, timeout: Duration) -> Self {
        Self {
            source,
            ask_permission,
            timeout,
        }
    }

    pub fn from_config(config: &LocationConfig) -> Result<Self, reqwest::Error> {
        let source = match config.source {
            LocationSourceKind::Ip => LocationSource::Ip(IpLocator::new(&config.ip_echo_url)?),
            LocationSourceKind::Manual => LocationSource::Manual(config.manual_coordinate()),
        };
        Ok(Self::new(
            source,
            config.ask_permission,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    /// Resolves the user's current position.
    ///
    /// # Errors
    ///
    /// - [`LocationError::PermissionDenied`] if the user declines the prompt.
    /// - [`LocationError::Timeout`] if the lookup exceeds the configured wait.
    /// - [`LocationError::Unavailable`] for any other lookup failure,
    ///   including a result outside valid latitude/longitude ranges.
    pub async fn acquire(
        &self,
        prompt: &dyn PermissionPrompt,
    ) -> Result<Coordinate, LocationError> {
        if self.ask_permission {
            let granted = prompt.ask().await.unwrap_or(false);
            if !granted {
                info!("Location permission declined");
                return Err(LocationError::PermissionDenied);
            }
        }

        let coord = tokio::time::timeout(self.timeout, self.source.lookup())
            .await
            .map_err(|_| {
                error!("Location lookup exceeded {:?}", self.timeout);
                LocationError::Timeout(self.timeout)
            })??;

        if !coord.is_valid() {
            error!("Location lookup returned an invalid coordinate: {:?}", coord);
            return Err(unavailable(format!(
                "invalid coordinate ({}, {})",
                coord.latitude, coord.longitude
            )));
        }
        Ok(coord)
    }
}
