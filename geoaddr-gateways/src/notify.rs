use std::{fmt, sync::Arc};

use geoaddr_core::{
    entities::Address,
    gateways::notify::{NotificationEvent, NotificationGateway},
};

/// Receives addresses whose coordinates became known.
pub trait GeocodedListener {
    fn address_geocoded(&self, address: &Address);
}

impl<F> GeocodedListener for F
where
    F: Fn(&Address),
{
    fn address_geocoded(&self, address: &Address) {
        self(address)
    }
}

/// In-process event bus that forwards events to its subscribers.
#[derive(Clone, Default)]
pub struct Notify {
    listeners: Vec<Arc<dyn GeocodedListener + Send + Sync + 'static>>,
}

impl fmt::Debug for Notify {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Notify")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Notify {
    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: GeocodedListener + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }
}

impl NotificationGateway for Notify {
    fn notify(&self, event: NotificationEvent) {
        use NotificationEvent as E;
        match event {
            E::AddressGeocoded { address } => {
                log::info!(
                    "Address {} of {} geocoded at {}",
                    address.id,
                    address.owner,
                    address
                        .coordinates()
                        .map(|c| c.to_string())
                        .unwrap_or_default(),
                );
                for listener in &self.listeners {
                    listener.address_geocoded(address);
                }
            }
        }
    }
}
