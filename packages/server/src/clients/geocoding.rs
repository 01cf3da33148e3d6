use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::GeocodingConfig;
use crate::utils::geo::Coordinates;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoding response is malformed: {0}")]
    Malformed(String),
}

/// Forward and reverse address lookups.
///
/// `Ok(None)` means the service answered but knows no match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn forward(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError>;
    async fn reverse(&self, point: Coordinates) -> Result<Option<String>, GeocodeError>;
}

/// Forward lookup that logs and swallows failures.
pub async fn forward_best_effort(geocoder: &dyn Geocoder, address: &str) -> Option<Coordinates> {
    match geocoder.forward(address).await {
        Ok(found) => found,
        Err(e) => {
            warn!(address, error = %e, "Forward geocoding failed");
            None
        }
    }
}

/// Reverse lookup that logs and swallows failures.
pub async fn reverse_best_effort(geocoder: &dyn Geocoder, point: Coordinates) -> Option<String> {
    match geocoder.reverse(point).await {
        Ok(found) => found,
        Err(e) => {
            warn!(lat = point.lat, lon = point.lon, error = %e, "Reverse geocoding failed");
            None
        }
    }
}

/// Geocoder used when lookups are disabled by configuration.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn forward(&self, _address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        Ok(None)
    }

    async fn reverse(&self, _point: Coordinates) -> Result<Option<String>, GeocodeError> {
        Ok(None)
    }
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

#[derive(Deserialize)]
struct ReverseHit {
    display_name: Option<String>,
    error: Option<String>,
}

/// Cache key for reverse lookups: coordinates rounded to ~1 m.
fn reverse_key(point: Coordinates) -> (i64, i64) {
    (
        (point.lat * 1e5).round() as i64,
        (point.lon * 1e5).round() as i64,
    )
}

fn forward_key(address: &str) -> String {
    address.trim().to_lowercase()
}

fn parse_search(hits: Vec<SearchHit>) -> Result<Option<Coordinates>, GeocodeError> {
    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };
    let lat = hit
        .lat
        .parse::<f64>()
        .map_err(|_| GeocodeError::Malformed(format!("latitude '{}'", hit.lat)))?;
    let lon = hit
        .lon
        .parse::<f64>()
        .map_err(|_| GeocodeError::Malformed(format!("longitude '{}'", hit.lon)))?;
    Coordinates::new(lat, lon)
        .map(Some)
        .ok_or_else(|| GeocodeError::Malformed(format!("out of range ({lat}, {lon})")))
}

fn parse_reverse(hit: ReverseHit) -> Option<String> {
    if hit.error.is_some() {
        return None;
    }
    hit.display_name.filter(|name| !name.trim().is_empty())
}

/// Client for a Nominatim-compatible HTTP API with an in-memory LRU cache.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    forward_cache: Mutex<LruCache<String, Option<Coordinates>>>,
    reverse_cache: Mutex<LruCache<(i64, i64), Option<String>>>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let capacity = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            forward_cache: Mutex::new(LruCache::new(capacity)),
            reverse_cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    fn cached_forward(&self, key: &str) -> Option<Option<Coordinates>> {
        self.forward_cache.lock().ok()?.get(key).copied()
    }

    fn cached_reverse(&self, key: (i64, i64)) -> Option<Option<String>> {
        self.reverse_cache.lock().ok()?.get(&key).cloned()
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn forward(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let key = forward_key(address);
        if let Some(hit) = self.cached_forward(&key) {
            debug!("Forward geocoding cache hit");
            return Ok(hit);
        }

        let hits: Vec<SearchHit> = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", address), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let found = parse_search(hits)?;

        if let Ok(mut cache) = self.forward_cache.lock() {
            cache.put(key, found);
        }
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn reverse(&self, point: Coordinates) -> Result<Option<String>, GeocodeError> {
        let key = reverse_key(point);
        if let Some(hit) = self.cached_reverse(key) {
            debug!("Reverse geocoding cache hit");
            return Ok(hit);
        }

        let hit: ReverseHit = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
                ("format", "jsonv2".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let found = parse_reverse(hit);

        if let Ok(mut cache) = self.reverse_cache.lock() {
            cache.put(key, found.clone());
        }
        Ok(found)
    }
}
