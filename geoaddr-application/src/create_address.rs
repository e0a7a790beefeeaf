use super::*;

use geoaddr_core::{
    gateways::{notify::NotificationGateway, queue::GeocodeJobQueue},
    owner::OwnerRegistry,
};

/// Adds a new address to an existing owner.
pub fn create_address(
    connections: &sqlite::Connections,
    owners: &OwnerRegistry,
    queue: &dyn GeocodeJobQueue,
    notify: &dyn NotificationGateway,
    owner: OwnerRef,
    new_address: usecases::NewAddress,
) -> Result<Address> {
    owners.resolve(&owner)?;
    let now = Timestamp::now();
    let stored = connections.exclusive()?.transaction(|conn| {
        let write = usecases::prepare_new_address(owner, new_address, now)?;
        usecases::store_address(conn, write, now).inspect_err(|err| {
            warn!("Failed to store new address: {err}");
        })
    })?;
    // Only committed records are announced
    usecases::dispatch_post_save(queue, notify, &stored);
    Ok(stored.address)
}
