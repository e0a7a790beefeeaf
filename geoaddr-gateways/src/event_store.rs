use std::{io, path::Path};

use geoaddr_core::entities::{Address, Timestamp};
use jfs::Store;
use serde::{Deserialize, Serialize};

use crate::notify::GeocodedListener;

/// Keeps every geocoded event as a JSON file in a directory.
#[derive(Clone)]
pub struct GeocodedEventStore {
    json_store: Store,
}

impl GeocodedEventStore {
    pub fn try_new<P: AsRef<Path>>(directory: P) -> io::Result<Self> {
        let json_store = Store::new(directory)?;
        Ok(Self { json_store })
    }

    pub fn path(&self) -> &Path {
        self.json_store.path()
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct JsonGeocodedEvent {
    pub address_id: String,
    pub owner_kind: String,
    pub owner_id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub formatted_address: String,
    pub geocoded_at: Option<i64>,
}

impl From<&Address> for JsonGeocodedEvent {
    fn from(from: &Address) -> Self {
        Self {
            address_id: from.id.to_string(),
            owner_kind: from.owner.kind.clone(),
            owner_id: from.owner.id.clone(),
            lat: from.latitude(),
            lng: from.longitude(),
            formatted_address: from.formatted_address(),
            geocoded_at: from.geocoding.geocoded_at.map(Timestamp::as_millis),
        }
    }
}

impl GeocodedListener for GeocodedEventStore {
    fn address_geocoded(&self, address: &Address) {
        let now = Timestamp::now().as_millis();
        let key = format!("{now}-{}", address.id);
        let event = JsonGeocodedEvent::from(address);
        if let Err(err) = self.json_store.save_with_id(&event, &key) {
            log::warn!("Unable to save geocoded event in JSON file: {err}");
        }
    }
}
