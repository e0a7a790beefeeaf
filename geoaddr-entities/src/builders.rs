pub trait Builder {
    type Build;
    fn build() -> Self::Build;
}

pub use self::address_builder::*;

pub mod address_builder {

    use super::*;
    use crate::{address::*, geo::*, id::*, owner::*, time::*};

    #[derive(Debug)]
    pub struct AddressBuild {
        addr: Address,
    }

    impl AddressBuild {
        pub fn id(mut self, id: AddressId) -> Self {
            self.addr.id = id;
            self
        }
        pub fn owner(mut self, kind: &str, id: &str) -> Self {
            self.addr.owner = OwnerRef::new(kind, id);
            self
        }
        pub fn kind(mut self, kind: &str) -> Self {
            self.addr.kind = Some(kind.into());
            self
        }
        pub fn primary(mut self, is_primary: bool) -> Self {
            self.addr.is_primary = is_primary;
            self
        }
        pub fn geocoding_enabled(mut self, enabled: bool) -> Self {
            self.addr.geocoding_enabled = enabled;
            self
        }
        pub fn street(mut self, x: &str) -> Self {
            self.addr.postal.street = x.into();
            self
        }
        pub fn number(mut self, x: &str) -> Self {
            self.addr.postal.number = Some(x.into());
            self
        }
        pub fn complement(mut self, x: &str) -> Self {
            self.addr.postal.complement = Some(x.into());
            self
        }
        pub fn neighbourhood(mut self, x: &str) -> Self {
            self.addr.postal.neighbourhood = Some(x.into());
            self
        }
        pub fn city(mut self, x: &str) -> Self {
            self.addr.postal.city = x.into();
            self
        }
        pub fn state(mut self, x: &str) -> Self {
            self.addr.postal.state = x.into();
            self
        }
        pub fn postal_code(mut self, x: &str) -> Self {
            self.addr.postal.postal_code = Some(x.into());
            self
        }
        pub fn country_code(mut self, x: &str) -> Self {
            self.addr.postal.country_code = x.into();
            self
        }
        pub fn customer_name(mut self, x: &str) -> Self {
            self.addr.customer.name = Some(x.into());
            self
        }
        pub fn coordinates(mut self, lat: f64, lng: f64) -> Self {
            self.addr.geocoding.coordinates = Coordinates::try_from_lat_lng(lat, lng).ok();
            self
        }
        pub fn geocoded_at(mut self, at: Timestamp) -> Self {
            self.addr.geocoding.geocoded_at = Some(at);
            self
        }
        pub fn failed_at(mut self, at: Timestamp, error: &str) -> Self {
            self.addr.geocoding.failed_at = Some(at);
            self.addr.geocoding.error = Some(error.into());
            self
        }
        pub fn finish(self) -> Address {
            self.addr
        }
    }

    impl Builder for Address {
        type Build = AddressBuild;
        fn build() -> AddressBuild {
            let now = Timestamp::now();
            AddressBuild {
                addr: Address {
                    id: AddressId::new(),
                    owner: OwnerRef::new("customer", "1"),
                    kind: None,
                    nickname: None,
                    is_primary: false,
                    geocoding_enabled: true,
                    postal: PostalAddress {
                        country_code: DEFAULT_COUNTRY_CODE.into(),
                        ..Default::default()
                    },
                    reference_point: None,
                    customer: CustomerContact::default(),
                    notes: None,
                    metadata: Metadata::new(),
                    geocoding: GeocodingStatus::default(),
                    created_at: now,
                    updated_at: now,
                },
            }
        }
    }

    #[test]
    fn needs_geocoding() {
        let now = Timestamp::now();
        assert!(Address::build().street("x").finish().needs_geocoding());
        assert!(!Address::build()
            .geocoding_enabled(false)
            .finish()
            .needs_geocoding());
        assert!(!Address::build()
            .coordinates(1.0, 2.0)
            .finish()
            .needs_geocoding());
        assert!(!Address::build()
            .failed_at(now, "Unable to geocode address")
            .finish()
            .needs_geocoding());
    }
}
