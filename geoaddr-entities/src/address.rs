use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{geo::*, id::*, owner::*, time::*};

pub const DEFAULT_COUNTRY_CODE: &str = "BR";

/// Label printed in front of the postal code in the formatted address.
pub const POSTAL_CODE_LABEL: &str = "CEP";

/// Free-form key/value data attached to an address.
pub type Metadata = BTreeMap<String, String>;

/// The fields that determine the physical location of an address.
///
/// Changing any of them invalidates previously resolved coordinates.
#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostalAddress {
    pub street        : String,
    pub number        : Option<String>,
    pub complement    : Option<String>,
    pub neighbourhood : Option<String>,
    pub city          : String,
    pub state         : String,
    pub postal_code   : Option<String>,
    /// ISO 3166-1 alpha-2
    pub country_code  : String,
}

impl PostalAddress {
    /// Human readable, single line representation, e.g.
    /// `Avenida Paulista, 1578, Apto 101, Bela Vista, Sao Paulo - SP, CEP 01310-200, BR`.
    ///
    /// Empty parts are skipped.
    pub fn formatted(&self) -> String {
        let street = non_empty(&self.street).map(|street| {
            match self.number.as_deref().and_then(non_empty) {
                Some(number) => format!("{street}, {number}"),
                None => street.to_owned(),
            }
        });
        let city = non_empty(&self.city).map(|city| match non_empty(&self.state) {
            Some(state) => format!("{city} - {state}"),
            None => city.to_owned(),
        });
        let postal_code = self
            .postal_code
            .as_deref()
            .and_then(non_empty)
            .map(|code| format!("{POSTAL_CODE_LABEL} {code}"));
        [
            street,
            self.complement.as_deref().and_then(non_empty).map(ToOwned::to_owned),
            self.neighbourhood.as_deref().and_then(non_empty).map(ToOwned::to_owned),
            city,
            postal_code,
            non_empty(&self.country_code).map(ToOwned::to_owned),
        ]
        .into_iter()
        .flatten()
        .join(", ")
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomerContact {
    pub name               : Option<String>,
    pub phone              : Option<String>,
    pub phone_country_code : Option<String>,
    /// Tax id or any other personal document number
    pub document           : Option<String>,
}

/// Outcome of resolving the postal address into coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeocodingStatus {
    pub coordinates: Option<Coordinates>,
    pub geocoded_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub error: Option<String>,
}

impl GeocodingStatus {
    pub fn resolved(coordinates: Coordinates, geocoded_at: Timestamp) -> Self {
        Self {
            coordinates: Some(coordinates),
            geocoded_at: Some(geocoded_at),
            failed_at: None,
            error: None,
        }
    }

    pub fn is_cleared(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: AddressId,
    pub owner: OwnerRef,
    /// Free-form classification like `home`, `work` or `billing`.
    pub kind: Option<String>,
    pub nickname: Option<String>,
    pub is_primary: bool,
    /// Billing or virtual addresses are never geocoded and never
    /// carry coordinates.
    pub geocoding_enabled: bool,
    pub postal: PostalAddress,
    /// Free text that helps to locate the address.
    pub reference_point: Option<String>,
    pub customer: CustomerContact,
    pub notes: Option<String>,
    pub metadata: Metadata,
    pub geocoding: GeocodingStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Address {
    pub fn formatted_address(&self) -> String {
        self.postal.formatted()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.geocoding.coordinates
    }

    pub fn latitude(&self) -> Option<f64> {
        self.geocoding.coordinates.map(|c| c.lat())
    }

    pub fn longitude(&self) -> Option<f64> {
        self.geocoding.coordinates.map(|c| c.lng())
    }

    pub fn is_geocoded(&self) -> bool {
        self.geocoding.geocoded_at.is_some()
    }

    pub fn has_failed_geocoding(&self) -> bool {
        self.geocoding.failed_at.is_some()
    }

    /// Geocoding is enabled, no coordinates are known yet, and no
    /// previous attempt has failed.
    pub fn needs_geocoding(&self) -> bool {
        self.geocoding_enabled
            && self.geocoding.coordinates.is_none()
            && self.geocoding.failed_at.is_none()
    }
}
