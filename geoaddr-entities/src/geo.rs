use std::fmt;

use thiserror::Error;

/// WGS 84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum CoordinatesError {
    #[error("Latitude {0} is out of range")]
    Latitude(f64),
    #[error("Longitude {0} is out of range")]
    Longitude(f64),
}

impl Coordinates {
    pub const LAT_MAX: f64 = 90.0;
    pub const LNG_MAX: f64 = 180.0;

    pub fn try_from_lat_lng(lat: f64, lng: f64) -> Result<Self, CoordinatesError> {
        if !lat.is_finite() || lat.abs() > Self::LAT_MAX {
            return Err(CoordinatesError::Latitude(lat));
        }
        if !lng.is_finite() || lng.abs() > Self::LNG_MAX {
            return Err(CoordinatesError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }

    pub const fn lat(&self) -> f64 {
        self.lat
    }

    pub const fn lng(&self) -> f64 {
        self.lng
    }

    pub const fn to_lat_lng(self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    /// Several geocoding APIs answer `0,0` instead of "not found".
    pub fn is_null_island(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}
