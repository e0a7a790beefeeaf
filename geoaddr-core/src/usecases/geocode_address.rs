use std::fmt;

use thiserror::Error;
use time::Duration;

use super::prelude::*;
use crate::{
    gateways::{
        geocode::GeoCodingGateway,
        notify::{NotificationEvent, NotificationGateway},
    },
    RepoError,
};

/// Failed lookups are not repeated within this period.
pub const DEFAULT_FAILURE_COOLDOWN: Duration = Duration::hours(24);

/// Stored as `geocoding_error` when all providers failed.
pub const GEOCODING_ERROR_MESSAGE: &str = "Unable to geocode address";

#[derive(Debug, Error)]
pub enum GeocodeJobError {
    #[error("Unable to geocode address {address_id}")]
    GeocodingFailed { address_id: AddressId },
    /// The location changed while the lookup was running.
    #[error("Address {address_id} has been modified during geocoding")]
    AddressChanged { address_id: AddressId },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl GeocodeJobError {
    /// Whether the job runner should schedule another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GeocodingFailed { .. } | Self::AddressChanged { .. } => true,
            Self::Repo(RepoError::NotFound) => false,
            Self::Repo(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodeSkipReason {
    NotFound,
    GeocodingDisabled,
    AlreadyGeocoded,
    RecentlyFailed,
}

impl fmt::Display for GeocodeSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::NotFound => "address not found",
            Self::GeocodingDisabled => "geocoding disabled",
            Self::AlreadyGeocoded => "already geocoded",
            Self::RecentlyFailed => "failed recently",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    Skipped(GeocodeSkipReason),
    Geocoded(Address),
}

/// Checks whether the job should leave the address alone.
pub fn geocoding_skip_reason(
    address: &Address,
    now: Timestamp,
    failure_cooldown: Duration,
) -> Option<GeocodeSkipReason> {
    if !address.geocoding_enabled {
        return Some(GeocodeSkipReason::GeocodingDisabled);
    }
    if address.geocoding.coordinates.is_some() {
        return Some(GeocodeSkipReason::AlreadyGeocoded);
    }
    match address.geocoding.failed_at {
        Some(failed_at) if now - failed_at < failure_cooldown => {
            Some(GeocodeSkipReason::RecentlyFailed)
        }
        _ => None,
    }
}

/// Loads the address if it is eligible for geocoding.
pub fn load_geocoding_candidate<R>(
    repo: &R,
    id: &AddressId,
    now: Timestamp,
    failure_cooldown: Duration,
) -> std::result::Result<std::result::Result<Address, GeocodeSkipReason>, GeocodeJobError>
where
    R: AddressRepo,
{
    let Some(address) = repo.try_get_address(id)? else {
        return Ok(Err(GeocodeSkipReason::NotFound));
    };
    match geocoding_skip_reason(&address, now, failure_cooldown) {
        Some(reason) => Ok(Err(reason)),
        None => Ok(Ok(address)),
    }
}

/// Asks the primary provider and then the fallback provider, unless
/// both are the same.
pub fn resolve_coordinates(
    primary: &dyn GeoCodingGateway,
    fallback: Option<&dyn GeoCodingGateway>,
    address: &Address,
) -> Option<Coordinates> {
    if let Some(coordinates) = primary.geocode(address) {
        return Some(coordinates);
    }
    let fallback = fallback.filter(|fallback| fallback.name() != primary.name())?;
    log::info!(
        "Provider '{}' found nothing for address {}, trying '{}'",
        primary.name(),
        address.id,
        fallback.name()
    );
    fallback.geocode(address)
}

/// Persists the outcome of a lookup.
///
/// Only the geocoding status is written, the address itself stays
/// untouched. A missing result is recorded as failure and reported
/// as [`GeocodeJobError::GeocodingFailed`].
pub fn store_geocoding_result<R>(
    repo: &R,
    mut address: Address,
    coordinates: Option<Coordinates>,
    now: Timestamp,
) -> std::result::Result<Address, GeocodeJobError>
where
    R: AddressRepo,
{
    match coordinates {
        Some(coordinates) => {
            address.geocoding = GeocodingStatus::resolved(coordinates, now);
            repo.update_geocoding_status(&address.id, &address.geocoding)?;
            log::info!("Geocoded address {} at {coordinates}", address.id);
            Ok(address)
        }
        None => {
            address.geocoding = GeocodingStatus {
                failed_at: Some(now),
                error: Some(GEOCODING_ERROR_MESSAGE.to_owned()),
                ..Default::default()
            };
            repo.update_geocoding_status(&address.id, &address.geocoding)?;
            log::warn!(
                "Unable to geocode address {}: {}",
                address.id,
                address.formatted_address()
            );
            Err(GeocodeJobError::GeocodingFailed {
                address_id: address.id,
            })
        }
    }
}

/// Runs a single geocoding attempt for one address.
pub fn geocode_address<R>(
    repo: &R,
    primary: &dyn GeoCodingGateway,
    fallback: Option<&dyn GeoCodingGateway>,
    notify: &dyn NotificationGateway,
    id: &AddressId,
    now: Timestamp,
    failure_cooldown: Duration,
) -> std::result::Result<GeocodeOutcome, GeocodeJobError>
where
    R: AddressRepo,
{
    let address = match load_geocoding_candidate(repo, id, now, failure_cooldown)? {
        Ok(address) => address,
        Err(reason) => {
            log::info!("Skipped geocoding of address {id}: {reason}");
            return Ok(GeocodeOutcome::Skipped(reason));
        }
    };
    let coordinates = resolve_coordinates(primary, fallback, &address);
    let address = store_geocoding_result(repo, address, coordinates, now)?;
    notify.notify(NotificationEvent::AddressGeocoded { address: &address });
    Ok(GeocodeOutcome::Geocoded(address))
}

#[cfg(test)]
mod tests {
    use super::{
        super::tests::{MockDb, MockGeocoder, MockNotify},
        *,
    };
    use geoaddr_entities::builders::*;

    fn pending_address(db: &MockDb) -> AddressId {
        let address = Address::build().street("Avenida Paulista").city("Sao Paulo").finish();
        let id = address.id;
        db.insert(address);
        id
    }

    #[test]
    fn geocode_with_primary_provider() {
        let db = MockDb::default();
        let notify = MockNotify::default();
        let id = pending_address(&db);
        let primary = MockGeocoder::found("google", -23.56, -46.65);
        let fallback = MockGeocoder::found("nominatim", 0.5, 0.5);
        let now = Timestamp::now();
        let outcome = geocode_address(
            &db,
            &primary,
            Some(&fallback),
            &notify,
            &id,
            now,
            DEFAULT_FAILURE_COOLDOWN,
        )
        .unwrap();
        let GeocodeOutcome::Geocoded(address) = outcome else {
            panic!("not geocoded");
        };
        assert_eq!(address.latitude(), Some(-23.56));
        assert_eq!(address.geocoding.geocoded_at, Some(now));
        assert_eq!(db.address(&id), address);
        assert_eq!(fallback.calls.get(), 0);
        assert_eq!(*notify.geocoded.borrow(), vec![id]);
    }

    #[test]
    fn fallback_is_called_once_before_failure() {
        let db = MockDb::default();
        let notify = MockNotify::default();
        let id = pending_address(&db);
        let primary = MockGeocoder::not_found("google");
        let fallback = MockGeocoder::not_found("nominatim");
        let now = Timestamp::now();
        let err = geocode_address(
            &db,
            &primary,
            Some(&fallback),
            &notify,
            &id,
            now,
            DEFAULT_FAILURE_COOLDOWN,
        )
        .unwrap_err();
        assert!(matches!(err, GeocodeJobError::GeocodingFailed { address_id } if address_id == id));
        assert!(err.is_retryable());
        assert_eq!(primary.calls.get(), 1);
        assert_eq!(fallback.calls.get(), 1);
        let stored = db.address(&id);
        assert_eq!(stored.geocoding.failed_at, Some(now));
        assert_eq!(stored.geocoding.error.as_deref(), Some(GEOCODING_ERROR_MESSAGE));
        assert!(stored.coordinates().is_none());
        assert!(notify.geocoded.borrow().is_empty());
    }

    #[test]
    fn fallback_resolves_address() {
        let db = MockDb::default();
        let id = pending_address(&db);
        let primary = MockGeocoder::not_found("google");
        let fallback = MockGeocoder::found("mapbox", 1.0, 2.0);
        let outcome = geocode_address(
            &db,
            &primary,
            Some(&fallback),
            &MockNotify::default(),
            &id,
            Timestamp::now(),
            DEFAULT_FAILURE_COOLDOWN,
        )
        .unwrap();
        assert!(matches!(outcome, GeocodeOutcome::Geocoded(_)));
        assert!(db.address(&id).geocoding.failed_at.is_none());
    }

    #[test]
    fn fallback_with_same_name_is_not_called() {
        let address = Address::build().finish();
        let primary = MockGeocoder::not_found("google");
        let fallback = MockGeocoder::found("google", 1.0, 2.0);
        assert!(resolve_coordinates(&primary, Some(&fallback), &address).is_none());
        assert_eq!(fallback.calls.get(), 0);
    }

    #[test]
    fn skip_recently_failed_address() {
        let db = MockDb::default();
        let now = Timestamp::now();
        let address = Address::build()
            .failed_at(now - Duration::hours(1), GEOCODING_ERROR_MESSAGE)
            .finish();
        let id = address.id;
        db.insert(address);
        let primary = MockGeocoder::found("google", 1.0, 2.0);
        let outcome = geocode_address(
            &db,
            &primary,
            None,
            &MockNotify::default(),
            &id,
            now,
            DEFAULT_FAILURE_COOLDOWN,
        )
        .unwrap();
        assert_eq!(
            outcome,
            GeocodeOutcome::Skipped(GeocodeSkipReason::RecentlyFailed)
        );
        assert_eq!(primary.calls.get(), 0);
        assert_eq!(db.status_updates.get(), 0);
    }

    #[test]
    fn retry_after_cooldown() {
        let db = MockDb::default();
        let now = Timestamp::now();
        let address = Address::build()
            .failed_at(now - Duration::hours(25), GEOCODING_ERROR_MESSAGE)
            .finish();
        let id = address.id;
        db.insert(address);
        let primary = MockGeocoder::found("google", 1.0, 2.0);
        let outcome = geocode_address(
            &db,
            &primary,
            None,
            &MockNotify::default(),
            &id,
            now,
            DEFAULT_FAILURE_COOLDOWN,
        )
        .unwrap();
        assert!(matches!(outcome, GeocodeOutcome::Geocoded(_)));
        assert!(db.address(&id).geocoding.error.is_none());
    }

    #[test]
    fn cooldown_longer_than_calendar_range() {
        let now = Timestamp::now();
        let failed = Address::build()
            .failed_at(now - Duration::hours(1), GEOCODING_ERROR_MESSAGE)
            .finish();
        assert_eq!(
            geocoding_skip_reason(&failed, now, Duration::days(365 * 20_000)),
            Some(GeocodeSkipReason::RecentlyFailed)
        );
        assert_eq!(geocoding_skip_reason(&failed, now, Duration::ZERO), None);
    }

    #[test]
    fn skip_ineligible_addresses() {
        let db = MockDb::default();
        let now = Timestamp::now();
        let disabled = Address::build().geocoding_enabled(false).finish();
        let resolved = Address::build().coordinates(1.0, 2.0).geocoded_at(now).finish();
        let (disabled_id, resolved_id) = (disabled.id, resolved.id);
        db.insert(disabled);
        db.insert(resolved);
        let primary = MockGeocoder::found("google", 1.0, 2.0);
        let run = |id: &AddressId| {
            geocode_address(
                &db,
                &primary,
                None,
                &MockNotify::default(),
                id,
                now,
                DEFAULT_FAILURE_COOLDOWN,
            )
            .unwrap()
        };
        assert_eq!(
            run(&AddressId::new()),
            GeocodeOutcome::Skipped(GeocodeSkipReason::NotFound)
        );
        assert_eq!(
            run(&disabled_id),
            GeocodeOutcome::Skipped(GeocodeSkipReason::GeocodingDisabled)
        );
        assert_eq!(
            run(&resolved_id),
            GeocodeOutcome::Skipped(GeocodeSkipReason::AlreadyGeocoded)
        );
        assert_eq!(primary.calls.get(), 0);
    }

    #[test]
    fn missing_record_is_not_retried() {
        assert!(!GeocodeJobError::Repo(RepoError::NotFound).is_retryable());
        assert!(GeocodeJobError::Repo(RepoError::Other(anyhow::anyhow!("locked"))).is_retryable());
    }
}
