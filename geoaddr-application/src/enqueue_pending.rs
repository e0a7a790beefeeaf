use super::*;

use geoaddr_core::gateways::queue::GeocodeJobQueue;

/// Schedules a lookup for every address that still waits for one.
pub fn enqueue_pending_geocoding(
    connections: &sqlite::Connections,
    queue: &dyn GeocodeJobQueue,
    limit: Option<usize>,
) -> Result<usize> {
    let db = connections.shared()?;
    Ok(usecases::enqueue_pending_geocoding(&db, queue, limit)?)
}
