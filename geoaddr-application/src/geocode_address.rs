use std::sync::Arc;

use super::*;

use geoaddr_core::{
    gateways::{
        geocode::GeoCodingGateway,
        notify::{NotificationEvent, NotificationGateway},
    },
    usecases::{GeocodeJobError, GeocodeOutcome},
    RepoError,
};

type Provider = Box<dyn GeoCodingGateway + Send + Sync>;

/// Executes geocoding jobs against the database.
///
/// The provider lookup runs without holding any database lock. The
/// candidate is loaded again before storing the result and the result
/// is discarded if the location changed in the meantime.
pub struct GeocodeAddressJob {
    connections: sqlite::Connections,
    primary: Provider,
    fallback: Option<Provider>,
    notify: Arc<dyn NotificationGateway + Send + Sync>,
    failure_cooldown: time::Duration,
}

impl GeocodeAddressJob {
    pub fn new(
        connections: sqlite::Connections,
        primary: Provider,
        fallback: Option<Provider>,
        notify: Arc<dyn NotificationGateway + Send + Sync>,
    ) -> Self {
        Self {
            connections,
            primary,
            fallback,
            notify,
            failure_cooldown: usecases::DEFAULT_FAILURE_COOLDOWN,
        }
    }

    pub fn with_failure_cooldown(mut self, failure_cooldown: time::Duration) -> Self {
        self.failure_cooldown = failure_cooldown;
        self
    }

    pub fn run(&self, id: &AddressId) -> std::result::Result<GeocodeOutcome, GeocodeJobError> {
        geocode_address(
            &self.connections,
            &*self.primary,
            self.fallback.as_deref().map(|p| p as &dyn GeoCodingGateway),
            &*self.notify,
            id,
            Timestamp::now(),
            self.failure_cooldown,
        )
    }
}

/// Runs a single geocoding attempt for one address.
pub fn geocode_address(
    connections: &sqlite::Connections,
    primary: &dyn GeoCodingGateway,
    fallback: Option<&dyn GeoCodingGateway>,
    notify: &dyn NotificationGateway,
    id: &AddressId,
    now: Timestamp,
    failure_cooldown: time::Duration,
) -> std::result::Result<GeocodeOutcome, GeocodeJobError> {
    let candidate = {
        let db = connections.shared().map_err(RepoError::Other)?;
        usecases::load_geocoding_candidate(&db, id, now, failure_cooldown)?
    };
    let address = match candidate {
        Ok(address) => address,
        Err(reason) => {
            info!("Skipped geocoding of address {id}: {reason}");
            return Ok(GeocodeOutcome::Skipped(reason));
        }
    };

    let coordinates = usecases::resolve_coordinates(primary, fallback, &address);

    let stored = connections
        .exclusive()
        .map_err(RepoError::Other)?
        .transaction(|conn| {
            let current = match usecases::load_geocoding_candidate(conn, id, now, failure_cooldown)? {
                Ok(current) => current,
                Err(reason) => return Ok(Err(reason)),
            };
            if current.postal != address.postal {
                return Err(GeocodeJobError::AddressChanged { address_id: *id });
            }
            match usecases::store_geocoding_result(conn, current, coordinates, now) {
                Ok(address) => Ok(Ok(Some(address))),
                // The failure must be committed
                Err(GeocodeJobError::GeocodingFailed { .. }) => Ok(Ok(None)),
                Err(err) => Err(err),
            }
        })?;

    match stored {
        Ok(Some(address)) => {
            notify.notify(NotificationEvent::AddressGeocoded { address: &address });
            Ok(GeocodeOutcome::Geocoded(address))
        }
        Ok(None) => Err(GeocodeJobError::GeocodingFailed { address_id: *id }),
        Err(reason) => {
            info!("Skipped geocoding of address {id}: {reason}");
            Ok(GeocodeOutcome::Skipped(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::prelude::*;
    use geoaddr_core::usecases::{GeocodeJobError, GeocodeOutcome, GeocodeSkipReason};

    #[test]
    fn geocode_pending_address() {
        let fixture = BackendFixture::new();
        let created = fixture.create_address("1", default_new_address()).unwrap();
        let primary = MockGeocoder::found("google", -23.561414, -46.656689);
        let outcome = fixture.geocode(&primary, None, &created.id).unwrap();
        let GeocodeOutcome::Geocoded(geocoded) = outcome else {
            panic!("not geocoded");
        };
        assert_eq!(geocoded, fixture.address(&created.id));
        assert_eq!(geocoded.latitude(), Some(-23.561414));
        assert!(geocoded.geocoding.geocoded_at.is_some());
        assert_eq!(fixture.notify.geocoded(), vec![created.id]);
        // nothing left to do
        assert_eq!(
            fixture.geocode(&primary, None, &created.id).unwrap(),
            GeocodeOutcome::Skipped(GeocodeSkipReason::AlreadyGeocoded)
        );
        assert_eq!(primary.calls(), 1);
    }

    #[test]
    fn persist_failure_and_cool_down() {
        let fixture = BackendFixture::new();
        let created = fixture.create_address("1", default_new_address()).unwrap();
        let primary = MockGeocoder::not_found("google");
        let fallback = MockGeocoder::not_found("nominatim");
        assert!(matches!(
            fixture.geocode(&primary, Some(&fallback), &created.id),
            Err(GeocodeJobError::GeocodingFailed { .. })
        ));
        let stored = fixture.address(&created.id);
        assert!(stored.has_failed_geocoding());
        assert_eq!(
            stored.geocoding.error.as_deref(),
            Some(usecases::GEOCODING_ERROR_MESSAGE)
        );
        assert_eq!(
            fixture.geocode(&primary, Some(&fallback), &created.id).unwrap(),
            GeocodeOutcome::Skipped(GeocodeSkipReason::RecentlyFailed)
        );
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
        assert!(fixture.notify.geocoded().is_empty());
    }

    #[test]
    fn skip_missing_address() {
        let fixture = BackendFixture::new();
        let primary = MockGeocoder::found("google", 1.0, 2.0);
        assert_eq!(
            fixture.geocode(&primary, None, &AddressId::new()).unwrap(),
            GeocodeOutcome::Skipped(GeocodeSkipReason::NotFound)
        );
        assert_eq!(primary.calls(), 0);
    }

    #[test]
    fn discard_result_for_changed_address() {
        let fixture = BackendFixture::new();
        let owner = OwnerRef::new("customer", "1");
        let created = fixture.create_address("1", default_new_address()).unwrap();
        let update = usecases::NewAddress {
            number: Some("2000".into()),
            ..usecases::NewAddress::from(&created)
        };
        let connections = fixture.db_connections.clone();
        let queue = fixture.queue.clone();
        let notify = fixture.notify.clone();
        let primary = MockGeocoder::found("google", 1.0, 2.0).on_lookup(move || {
            flows::update_address(&connections, &queue, &notify, &owner, &created.id, update.clone())
                .unwrap();
        });
        let err = fixture.geocode(&primary, None, &created.id).unwrap_err();
        assert!(matches!(err, GeocodeJobError::AddressChanged { .. }));
        assert!(err.is_retryable());
        let stored = fixture.address(&created.id);
        assert_eq!(stored.postal.number.as_deref(), Some("2000"));
        assert!(stored.needs_geocoding());
    }
}
