use std::sync::Arc;

use anyhow::Result;
use geoaddr_application::prelude::GeocodeAddressJob;
use geoaddr_db_sqlite::Connections;
use geoaddr_gateways::{event_store::GeocodedEventStore, factory::GeocoderFactory, notify::Notify};

use crate::config::Config;

pub fn geocoder_factory(cfg: &Config) -> GeocoderFactory {
    GeocoderFactory::new(cfg.geocoding.clone())
}

pub fn notification_gateway(cfg: &Config) -> Result<Notify> {
    let mut notify = Notify::default();
    if let Some(dir) = &cfg.events.json_dir {
        let store = GeocodedEventStore::try_new(dir)?;
        log::info!("Storing geocoded events in {}", store.path().display());
        notify.subscribe(store);
    }
    Ok(notify)
}

pub fn geocode_job(cfg: &Config, connections: Connections) -> Result<GeocodeAddressJob> {
    let factory = geocoder_factory(cfg);
    factory.validate()?;
    let primary = factory.make(None)?;
    let fallback = factory.make_fallback()?;
    match &fallback {
        Some(fallback) => log::info!(
            "Geocoding with '{}' and fallback '{}'",
            primary.name(),
            fallback.name()
        ),
        None => log::info!("Geocoding with '{}'", primary.name()),
    }
    let notify = notification_gateway(cfg)?;
    Ok(
        GeocodeAddressJob::new(connections, primary, fallback, Arc::new(notify))
            .with_failure_cooldown(cfg.failure_cooldown),
    )
}
