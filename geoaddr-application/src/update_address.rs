use super::*;

use geoaddr_core::gateways::{notify::NotificationGateway, queue::GeocodeJobQueue};

pub fn update_address(
    connections: &sqlite::Connections,
    queue: &dyn GeocodeJobQueue,
    notify: &dyn NotificationGateway,
    owner: &OwnerRef,
    id: &AddressId,
    update_address: usecases::NewAddress,
) -> Result<Address> {
    let now = Timestamp::now();
    let stored = connections.exclusive()?.transaction(|conn| {
        let current = usecases::load_owned_address(conn, owner, id)?;
        let write = usecases::prepare_updated_address(current, update_address, now)?;
        usecases::store_address(conn, write, now).inspect_err(|err| {
            warn!("Failed to store updated address {id}: {err}");
        })
    })?;
    usecases::dispatch_post_save(queue, notify, &stored);
    Ok(stored.address)
}
