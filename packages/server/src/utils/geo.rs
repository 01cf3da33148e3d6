use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of latitude.
const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Coordinates {
    #[schema(example = 55.75)]
    pub lat: f64,
    #[schema(example = 37.61)]
    pub lon: f64,
}

impl Coordinates {
    /// Returns `None` unless both values are finite and within WGS84 bounds.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        (is_valid_lat(lat) && is_valid_lon(lon)).then_some(Self { lat, lon })
    }

    /// Pairs two optional columns; a half-filled pair counts as absent.
    pub fn from_pair(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Self { lat, lon }),
            _ => None,
        }
    }
}

pub fn is_valid_lat(lat: f64) -> bool {
    lat.is_finite() && (-90.0..=90.0).contains(&lat)
}

pub fn is_valid_lon(lon: f64) -> bool {
    lon.is_finite() && (-180.0..=180.0).contains(&lon)
}

/// Great-circle distance using the spherical law of cosines.
pub fn great_circle_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lon.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lon.to_radians());
    let cos_angle = lat1.cos() * lat2.cos() * (lon2 - lon1).cos() + lat1.sin() * lat2.sin();
    // Rounding can push the cosine slightly outside [-1, 1] for near-identical points.
    EARTH_RADIUS_KM * cos_angle.clamp(-1.0, 1.0).acos()
}

/// A radius search around a centre point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusFilter {
    pub center: Coordinates,
    pub radius_km: f64,
}

impl RadiusFilter {
    /// Builds a filter from raw query strings.
    ///
    /// Missing or non-numeric inputs yield `None`, meaning "no radius filter".
    /// Numeric but unusable input (a negative radius, a centre outside WGS84
    /// bounds) still yields a filter; it matches nothing.
    pub fn parse(
        lat: Option<&str>,
        lon: Option<&str>,
        radius_km: Option<&str>,
        default_radius_km: f64,
    ) -> Option<Self> {
        let lat = parse_finite(lat?)?;
        let lon = parse_finite(lon?)?;
        let radius_km = match radius_km.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_finite(raw)?,
            None => default_radius_km,
        };
        Some(Self {
            center: Coordinates { lat, lon },
            radius_km,
        })
    }

    /// True when no point can ever be within the filter.
    pub fn matches_nothing(&self) -> bool {
        self.radius_km < 0.0 || !is_valid_lat(self.center.lat) || !is_valid_lon(self.center.lon)
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        !self.matches_nothing() && great_circle_km(self.center, point) <= self.radius_km
    }

    /// Latitude band that encloses every point within the radius.
    ///
    /// Used as a coarse SQL prefilter before the exact distance check.
    pub fn latitude_band(&self) -> (f64, f64) {
        // Padded so points exactly on the radius survive the prefilter.
        let delta = self.radius_km / KM_PER_DEGREE + 1e-6;
        (self.center.lat - delta, self.center.lat + delta)
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
