//! Adapters for the external services that the core talks to.

pub mod event_store;
pub mod factory;
pub mod google;
pub mod mapbox;
pub mod nominatim;
pub mod notify;

mod http;

pub use self::http::RequestSettings;
