use super::*;

pub fn owner_addresses(connections: &sqlite::Connections, owner: &OwnerRef) -> Result<Vec<Address>> {
    let db = connections.shared()?;
    Ok(usecases::owner_addresses(&db, owner)?)
}

pub fn primary_address(
    connections: &sqlite::Connections,
    owner: &OwnerRef,
) -> Result<Option<Address>> {
    let db = connections.shared()?;
    Ok(usecases::primary_address(&db, owner)?)
}

/// Addresses of the owner that take part in geocoding.
pub fn geocodable_addresses(
    connections: &sqlite::Connections,
    owner: &OwnerRef,
) -> Result<Vec<Address>> {
    let db = connections.shared()?;
    Ok(usecases::geocodable_addresses(&db, owner)?)
}

pub fn full_address(connections: &sqlite::Connections, owner: &OwnerRef) -> Result<Option<String>> {
    let db = connections.shared()?;
    Ok(usecases::full_address(&db, owner)?)
}
