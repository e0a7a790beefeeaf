pub use self::new_address_builder::*;
pub use geoaddr_entities::builders::Builder;

pub mod new_address_builder {

    use super::*;
    use crate::usecases::NewAddress;

    #[derive(Debug)]
    pub struct NewAddressBuild {
        new_address: NewAddress,
    }

    impl NewAddressBuild {
        pub fn street(mut self, street: &str) -> Self {
            self.new_address.street = street.into();
            self
        }
        pub fn city(mut self, city: &str) -> Self {
            self.new_address.city = city.into();
            self
        }
        pub fn primary(mut self, is_primary: bool) -> Self {
            self.new_address.is_primary = is_primary;
            self
        }
        pub fn geocoding_enabled(mut self, enabled: bool) -> Self {
            self.new_address.geocoding_enabled = enabled;
            self
        }
        pub fn pos(mut self, lat: f64, lng: f64) -> Self {
            self.new_address.lat = Some(lat);
            self.new_address.lng = Some(lng);
            self
        }
        pub fn customer_name(mut self, name: &str) -> Self {
            self.new_address.customer_name = Some(name.into());
            self
        }
        pub fn finish(self) -> NewAddress {
            self.new_address
        }
    }

    impl Builder for NewAddress {
        type Build = NewAddressBuild;
        fn build() -> NewAddressBuild {
            NewAddressBuild {
                new_address: NewAddress {
                    street: "Avenida Paulista".into(),
                    number: Some("1578".into()),
                    city: "Sao Paulo".into(),
                    state: "SP".into(),
                    postal_code: Some("01310-200".into()),
                    ..Default::default()
                },
            }
        }
    }
}
