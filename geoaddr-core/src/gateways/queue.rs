use crate::entities::AddressId;

/// Uniqueness key of the geocoding job for a single address.
pub fn geocode_job_key(address_id: &AddressId) -> String {
    format!("geocode-address-{address_id}")
}

/// Background queue for geocoding jobs.
///
/// At most one job per address is pending at any time: enqueueing
/// an address that already has a pending job is a no-op.
pub trait GeocodeJobQueue {
    /// Returns `false` if the job has been deduplicated.
    fn enqueue_geocoding(&self, address_id: &AddressId) -> bool;
}
