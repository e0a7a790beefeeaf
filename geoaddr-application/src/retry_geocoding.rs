use super::*;

use geoaddr_core::gateways::queue::GeocodeJobQueue;

/// Forgets a previous failure and schedules a new lookup.
pub fn retry_geocoding(
    connections: &sqlite::Connections,
    queue: &dyn GeocodeJobQueue,
    id: &AddressId,
) -> Result<bool> {
    let (address, needs_geocoding) = connections
        .exclusive()?
        .transaction(|conn| usecases::clear_geocoding_failure(conn, id))?;
    if !needs_geocoding {
        info!("Address {} doesn't need geocoding", address.id);
        return Ok(false);
    }
    Ok(queue.enqueue_geocoding(&address.id))
}
