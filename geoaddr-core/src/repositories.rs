// Low-level database access traits.
// The repository only persists what it is given. All decisions about
// geocoding state are made by the use cases before calling it.

use crate::entities::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The requested object could not be found")]
    NotFound,
    #[error("The object already exists")]
    AlreadyExists,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Filter for loading addresses.
///
/// All criteria are combined with AND. `None` means "don't care".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressQuery {
    pub owner: Option<OwnerRef>,
    pub primary: Option<bool>,
    pub geocoding_enabled: Option<bool>,
    /// `geocoded_at` is (not) set
    pub geocoded: Option<bool>,
    /// `geocoding_failed_at` is (not) set
    pub failed: Option<bool>,
    /// Geocoding enabled, without coordinates and without failure
    pub needs_geocoding: bool,
    pub limit: Option<usize>,
}

impl AddressQuery {
    pub fn of_owner(owner: &OwnerRef) -> Self {
        Self {
            owner: Some(owner.clone()),
            ..Default::default()
        }
    }

    pub fn needs_geocoding() -> Self {
        Self {
            needs_geocoding: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, addr: &Address) -> bool {
        let Self {
            owner,
            primary,
            geocoding_enabled,
            geocoded,
            failed,
            needs_geocoding,
            limit: _,
        } = self;
        owner.as_ref().map_or(true, |o| *o == addr.owner)
            && primary.map_or(true, |p| p == addr.is_primary)
            && geocoding_enabled.map_or(true, |e| e == addr.geocoding_enabled)
            && geocoded.map_or(true, |g| g == addr.is_geocoded())
            && failed.map_or(true, |f| f == addr.has_failed_geocoding())
            && (!needs_geocoding || addr.needs_geocoding())
    }
}

pub trait AddressRepo {
    fn create_address(&self, address: &Address) -> Result<()>;
    fn update_address(&self, address: &Address) -> Result<()>;

    fn get_address(&self, id: &AddressId) -> Result<Address>;
    fn try_get_address(&self, id: &AddressId) -> Result<Option<Address>> {
        match self.get_address(id) {
            Ok(address) => Ok(Some(address)),
            Err(Error::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    // Ordered by creation time
    fn query_addresses(&self, query: &AddressQuery) -> Result<Vec<Address>>;
    fn addresses_of_owner(&self, owner: &OwnerRef) -> Result<Vec<Address>> {
        self.query_addresses(&AddressQuery::of_owner(owner))
    }

    /// Overwrites only the geocoding outcome of a record.
    ///
    /// This write never passes through the write path and thus never
    /// triggers re-geocoding.
    fn update_geocoding_status(&self, id: &AddressId, status: &GeocodingStatus) -> Result<()>;

    /// Resets the primary flag of all addresses of `owner` except `keep`.
    fn demote_primary_addresses(&self, owner: &OwnerRef, keep: &AddressId) -> Result<usize>;
}
