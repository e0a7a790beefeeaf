use std::cell::{Cell, RefCell};

use super::prelude::*;
use crate::{
    gateways::{
        geocode::GeoCodingGateway,
        notify::{NotificationEvent, NotificationGateway},
        queue::GeocodeJobQueue,
    },
    RepoError,
};

pub mod builders;

type RepoResult<T> = std::result::Result<T, RepoError>;

#[derive(Default)]
pub struct MockDb {
    pub addresses: RefCell<Vec<Address>>,
    pub status_updates: Cell<usize>,
}

impl MockDb {
    pub fn insert(&self, address: Address) {
        self.addresses.borrow_mut().push(address);
    }

    pub fn address(&self, id: &AddressId) -> Address {
        self.get_address(id).unwrap()
    }

    pub fn primary_count(&self, owner: &OwnerRef) -> usize {
        self.addresses
            .borrow()
            .iter()
            .filter(|a| a.owner == *owner && a.is_primary)
            .count()
    }
}

impl AddressRepo for MockDb {
    fn create_address(&self, address: &Address) -> RepoResult<()> {
        if self.addresses.borrow().iter().any(|a| a.id == address.id) {
            return Err(RepoError::AlreadyExists);
        }
        self.insert(address.clone());
        Ok(())
    }

    fn update_address(&self, address: &Address) -> RepoResult<()> {
        let mut addresses = self.addresses.borrow_mut();
        let stored = addresses
            .iter_mut()
            .find(|a| a.id == address.id)
            .ok_or(RepoError::NotFound)?;
        *stored = address.clone();
        Ok(())
    }

    fn get_address(&self, id: &AddressId) -> RepoResult<Address> {
        self.addresses
            .borrow()
            .iter()
            .find(|a| a.id == *id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    fn query_addresses(&self, query: &AddressQuery) -> RepoResult<Vec<Address>> {
        let mut found: Vec<_> = self
            .addresses
            .borrow()
            .iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at);
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    fn update_geocoding_status(&self, id: &AddressId, status: &GeocodingStatus) -> RepoResult<()> {
        let mut addresses = self.addresses.borrow_mut();
        let stored = addresses
            .iter_mut()
            .find(|a| a.id == *id)
            .ok_or(RepoError::NotFound)?;
        stored.geocoding = status.clone();
        self.status_updates.set(self.status_updates.get() + 1);
        Ok(())
    }

    fn demote_primary_addresses(&self, owner: &OwnerRef, keep: &AddressId) -> RepoResult<usize> {
        let mut count = 0;
        for a in self.addresses.borrow_mut().iter_mut() {
            if a.owner == *owner && a.id != *keep && a.is_primary {
                a.is_primary = false;
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Records enqueued ids and deduplicates pending ones.
#[derive(Default)]
pub struct MockQueue {
    pub enqueued: RefCell<Vec<AddressId>>,
}

impl MockQueue {
    pub fn count(&self, id: &AddressId) -> usize {
        self.enqueued.borrow().iter().filter(|x| *x == id).count()
    }
}

impl GeocodeJobQueue for MockQueue {
    fn enqueue_geocoding(&self, address_id: &AddressId) -> bool {
        if self.enqueued.borrow().contains(address_id) {
            return false;
        }
        self.enqueued.borrow_mut().push(*address_id);
        true
    }
}

#[derive(Default)]
pub struct MockNotify {
    pub geocoded: RefCell<Vec<AddressId>>,
}

impl NotificationGateway for MockNotify {
    fn notify(&self, event: NotificationEvent) {
        match event {
            NotificationEvent::AddressGeocoded { address } => {
                self.geocoded.borrow_mut().push(address.id);
            }
        }
    }
}

pub struct MockGeocoder {
    pub name: &'static str,
    pub result: Option<(f64, f64)>,
    pub calls: Cell<usize>,
}

impl MockGeocoder {
    pub fn found(name: &'static str, lat: f64, lng: f64) -> Self {
        Self {
            name,
            result: Some((lat, lng)),
            calls: Cell::new(0),
        }
    }

    pub fn not_found(name: &'static str) -> Self {
        Self {
            name,
            result: None,
            calls: Cell::new(0),
        }
    }
}

impl GeoCodingGateway for MockGeocoder {
    fn name(&self) -> &str {
        self.name
    }

    fn geocode(&self, _: &Address) -> Option<Coordinates> {
        self.calls.set(self.calls.get() + 1);
        self.result
            .and_then(|(lat, lng)| Coordinates::try_from_lat_lng(lat, lng).ok())
    }
}
