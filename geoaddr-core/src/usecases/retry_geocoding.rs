use super::prelude::*;
use crate::gateways::queue::GeocodeJobQueue;

/// Forgets a previous geocoding failure.
///
/// Returns the updated address and whether it needs geocoding now.
pub fn clear_geocoding_failure<R>(repo: &R, id: &AddressId) -> Result<(Address, bool)>
where
    R: AddressRepo,
{
    let mut address = repo.get_address(id)?;
    if address.has_failed_geocoding() {
        log::info!("Clearing geocoding failure of address {id}");
        address.geocoding.failed_at = None;
        address.geocoding.error = None;
        repo.update_geocoding_status(id, &address.geocoding)?;
    }
    let needs_geocoding = address.needs_geocoding();
    Ok((address, needs_geocoding))
}

/// Clears the failure state and enqueues a new geocoding job if needed.
pub fn retry_geocoding<R>(repo: &R, queue: &dyn GeocodeJobQueue, id: &AddressId) -> Result<bool>
where
    R: AddressRepo,
{
    let (_, needs_geocoding) = clear_geocoding_failure(repo, id)?;
    if !needs_geocoding {
        return Ok(false);
    }
    Ok(queue.enqueue_geocoding(id))
}

/// Enqueues all addresses that are waiting for coordinates.
pub fn enqueue_pending_geocoding<R>(
    repo: &R,
    queue: &dyn GeocodeJobQueue,
    limit: Option<usize>,
) -> Result<usize>
where
    R: AddressRepo,
{
    let query = AddressQuery {
        limit,
        ..AddressQuery::needs_geocoding()
    };
    let pending = repo.query_addresses(&query)?;
    let enqueued = pending
        .iter()
        .filter(|address| queue.enqueue_geocoding(&address.id))
        .count();
    log::info!(
        "Enqueued {enqueued} of {} address(es) waiting for geocoding",
        pending.len()
    );
    Ok(enqueued)
}
