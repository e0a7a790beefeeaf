pub mod prelude {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use parking_lot::Mutex;

    use geoaddr_core::{
        gateways::{
            geocode::GeoCodingGateway,
            notify::{NotificationEvent, NotificationGateway},
            queue::GeocodeJobQueue,
        },
        owner::OwnerRegistry,
        usecases::{GeocodeJobError, GeocodeOutcome, GEOCODING_ERROR_MESSAGE},
    };

    pub use geoaddr_core::{
        entities::*,
        repositories::{Error as RepoError, *},
        usecases,
    };

    pub mod sqlite {
        pub use super::super::super::sqlite::*;
    }

    pub use crate::{
        error::{AppError, BError},
        prelude as flows,
    };

    pub fn default_new_address() -> usecases::NewAddress {
        usecases::NewAddress {
            street: "Avenida Paulista".into(),
            number: Some("1578".into()),
            neighbourhood: Some("Bela Vista".into()),
            city: "Sao Paulo".into(),
            state: "SP".into(),
            postal_code: Some("01310-200".into()),
            ..Default::default()
        }
    }

    /// Records enqueued jobs without running them.
    #[derive(Clone, Default)]
    pub struct DummyQueue {
        enqueued: Arc<Mutex<Vec<AddressId>>>,
    }

    impl DummyQueue {
        pub fn count(&self, id: &AddressId) -> usize {
            self.enqueued.lock().iter().filter(|x| *x == id).count()
        }

        pub fn is_empty(&self) -> bool {
            self.enqueued.lock().is_empty()
        }

        pub fn clear(&self) {
            self.enqueued.lock().clear();
        }
    }

    impl GeocodeJobQueue for DummyQueue {
        fn enqueue_geocoding(&self, address_id: &AddressId) -> bool {
            self.enqueued.lock().push(*address_id);
            true
        }
    }

    #[derive(Clone, Default)]
    pub struct RecordingNotify {
        geocoded: Arc<Mutex<Vec<AddressId>>>,
    }

    impl RecordingNotify {
        pub fn geocoded(&self) -> Vec<AddressId> {
            self.geocoded.lock().clone()
        }
    }

    impl NotificationGateway for RecordingNotify {
        fn notify(&self, event: NotificationEvent) {
            match event {
                NotificationEvent::AddressGeocoded { address } => {
                    self.geocoded.lock().push(address.id);
                }
            }
        }
    }

    pub struct MockGeocoder {
        name: &'static str,
        result: Option<Coordinates>,
        calls: AtomicUsize,
        on_lookup: Option<Box<dyn Fn() + Send + Sync>>,
    }

    impl MockGeocoder {
        pub fn found(name: &'static str, lat: f64, lng: f64) -> Self {
            Self {
                name,
                result: Some(Coordinates::try_from_lat_lng(lat, lng).unwrap()),
                calls: AtomicUsize::new(0),
                on_lookup: None,
            }
        }

        pub fn not_found(name: &'static str) -> Self {
            Self {
                name,
                result: None,
                calls: AtomicUsize::new(0),
                on_lookup: None,
            }
        }

        pub fn on_lookup(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
            self.on_lookup = Some(Box::new(f));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GeoCodingGateway for MockGeocoder {
        fn name(&self) -> &str {
            self.name
        }

        fn geocode(&self, _: &Address) -> Option<Coordinates> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(on_lookup) = &self.on_lookup {
                on_lookup();
            }
            self.result
        }
    }

    pub struct BackendFixture {
        pub db_connections: sqlite::Connections,
        pub owners: OwnerRegistry,
        pub queue: DummyQueue,
        pub notify: RecordingNotify,
    }

    impl BackendFixture {
        pub fn new() -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            let db_connections = sqlite::Connections::init(":memory:", 1).unwrap();
            geoaddr_db_sqlite::run_embedded_database_migrations(
                db_connections.exclusive().unwrap(),
            )
            .unwrap();
            let mut owners = OwnerRegistry::default();
            owners.register("customer", |id: &str| -> anyhow::Result<bool> {
                Ok(matches!(id, "1" | "2"))
            });
            Self {
                db_connections,
                owners,
                queue: DummyQueue::default(),
                notify: RecordingNotify::default(),
            }
        }

        pub fn create_address(
            &self,
            owner_id: &str,
            new_address: usecases::NewAddress,
        ) -> super::super::Result<Address> {
            flows::create_address(
                &self.db_connections,
                &self.owners,
                &self.queue,
                &self.notify,
                OwnerRef::new("customer", owner_id),
                new_address,
            )
        }

        pub fn update_address(
            &self,
            owner: &OwnerRef,
            id: &AddressId,
            update: usecases::NewAddress,
        ) -> super::super::Result<Address> {
            flows::update_address(
                &self.db_connections,
                &self.queue,
                &self.notify,
                owner,
                id,
                update,
            )
        }

        pub fn geocode(
            &self,
            primary: &MockGeocoder,
            fallback: Option<&MockGeocoder>,
            id: &AddressId,
        ) -> Result<GeocodeOutcome, GeocodeJobError> {
            flows::geocode_address(
                &self.db_connections,
                primary,
                fallback.map(|f| f as &dyn GeoCodingGateway),
                &self.notify,
                id,
                Timestamp::now(),
                usecases::DEFAULT_FAILURE_COOLDOWN,
            )
        }

        pub fn address(&self, id: &AddressId) -> Address {
            self.db_connections
                .shared()
                .unwrap()
                .get_address(id)
                .unwrap()
        }

        pub fn all_addresses(&self) -> Vec<Address> {
            self.db_connections
                .shared()
                .unwrap()
                .query_addresses(&AddressQuery::default())
                .unwrap()
        }

        pub fn mark_geocoded(&self, id: &AddressId, lat: f64, lng: f64) {
            let coordinates = Coordinates::try_from_lat_lng(lat, lng).unwrap();
            self.db_connections
                .exclusive()
                .unwrap()
                .update_geocoding_status(id, &GeocodingStatus::resolved(coordinates, Timestamp::now()))
                .unwrap();
        }

        pub fn mark_failed(&self, id: &AddressId) {
            let status = GeocodingStatus {
                failed_at: Some(Timestamp::now()),
                error: Some(GEOCODING_ERROR_MESSAGE.into()),
                ..Default::default()
            };
            self.db_connections
                .exclusive()
                .unwrap()
                .update_geocoding_status(id, &status)
                .unwrap();
        }
    }
}

mod queue_with_db {
    use std::sync::Arc;

    use super::prelude::*;
    use crate::queue::{GeocodeQueue, QueueSettings, QueueStats};
    use geoaddr_core::gateways::queue::GeocodeJobQueue;

    #[tokio::test(flavor = "multi_thread")]
    async fn geocode_enqueued_addresses() {
        let fixture = BackendFixture::new();
        let queue = GeocodeQueue::new(QueueSettings {
            backoff: std::time::Duration::from_millis(1),
            ..Default::default()
        });
        let first = fixture.create_address("1", default_new_address()).unwrap();
        let second = fixture.create_address("2", default_new_address()).unwrap();
        assert_eq!(
            flows::enqueue_pending_geocoding(&fixture.db_connections, &queue, None).unwrap(),
            2
        );
        assert!(!queue.enqueue_geocoding(&first.id));

        let job = flows::GeocodeAddressJob::new(
            fixture.db_connections.clone(),
            Box::new(MockGeocoder::found("google", -23.561414, -46.656689)),
            None,
            Arc::new(fixture.notify.clone()),
        );
        let stats = queue.process_pending(Arc::new(job)).await;
        assert_eq!(stats, QueueStats { completed: 2, failed: 0 });
        assert!(fixture.address(&first.id).is_geocoded());
        assert!(fixture.address(&second.id).is_geocoded());
        let mut geocoded = fixture.notify.geocoded();
        geocoded.sort();
        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(geocoded, expected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_job_hits_cool_down_on_retry() {
        let fixture = BackendFixture::new();
        let queue = GeocodeQueue::new(QueueSettings {
            backoff: std::time::Duration::from_millis(1),
            ..Default::default()
        });
        let address = fixture.create_address("1", default_new_address()).unwrap();
        queue.enqueue_geocoding(&address.id);
        let job = flows::GeocodeAddressJob::new(
            fixture.db_connections.clone(),
            Box::new(MockGeocoder::not_found("google")),
            Some(Box::new(MockGeocoder::not_found("nominatim"))),
            Arc::new(fixture.notify.clone()),
        );
        let stats = queue.process_pending(Arc::new(job)).await;
        // the second attempt is skipped within the cool-down period
        assert_eq!(stats, QueueStats { completed: 1, failed: 0 });
        assert!(fixture.address(&address.id).has_failed_geocoding());
        assert!(fixture.notify.geocoded().is_empty());
    }
}
