use crate::entities::Address;

#[derive(Debug)]
pub enum NotificationEvent<'a> {
    /// Coordinates of the address have been resolved or were
    /// explicitly supplied.
    AddressGeocoded { address: &'a Address },
}

/// Fire-and-forget publishing of domain events.
pub trait NotificationGateway {
    fn notify(&self, event: NotificationEvent);
}
