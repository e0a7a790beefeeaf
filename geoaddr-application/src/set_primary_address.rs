use super::*;

/// Makes the address the single primary address of its owner.
///
/// Returns `false` if the owner has no such address.
pub fn set_primary_address(
    connections: &sqlite::Connections,
    owner: &OwnerRef,
    id: &AddressId,
) -> Result<bool> {
    Ok(connections
        .exclusive()?
        .transaction(|conn| usecases::set_primary_address(conn, owner, id))?)
}
