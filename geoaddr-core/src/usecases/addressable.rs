use super::{prelude::*, write_address::*};
use crate::gateways::{notify::NotificationGateway, queue::GeocodeJobQueue};

/// Capability of a host entity to own addresses.
///
/// ```
/// # use geoaddr_core::usecases::Addressable;
/// struct Customer {
///     id: u64,
/// }
///
/// impl Addressable for Customer {
///     const OWNER_KIND: &'static str = "customer";
///     fn owner_id(&self) -> String {
///         self.id.to_string()
///     }
/// }
///
/// assert_eq!(Customer { id: 7 }.owner_ref().to_string(), "customer#7");
/// ```
pub trait Addressable {
    const OWNER_KIND: &'static str;

    fn owner_id(&self) -> String;

    fn owner_ref(&self) -> OwnerRef {
        OwnerRef::new(Self::OWNER_KIND, self.owner_id())
    }

    fn add_address<R>(
        &self,
        repo: &R,
        queue: &dyn GeocodeJobQueue,
        notify: &dyn NotificationGateway,
        input: NewAddress,
    ) -> Result<Address>
    where
        R: AddressRepo,
        Self: Sized,
    {
        add_address(repo, queue, notify, self.owner_ref(), input)
    }

    fn addresses<R>(&self, repo: &R) -> Result<Vec<Address>>
    where
        R: AddressRepo,
        Self: Sized,
    {
        owner_addresses(repo, &self.owner_ref())
    }

    fn primary_address<R>(&self, repo: &R) -> Result<Option<Address>>
    where
        R: AddressRepo,
        Self: Sized,
    {
        primary_address(repo, &self.owner_ref())
    }

    fn set_primary_address<R>(&self, repo: &R, id: &AddressId) -> Result<bool>
    where
        R: AddressRepo,
        Self: Sized,
    {
        set_primary_address(repo, &self.owner_ref(), id)
    }

    fn geocodable_addresses<R>(&self, repo: &R) -> Result<Vec<Address>>
    where
        R: AddressRepo,
        Self: Sized,
    {
        geocodable_addresses(repo, &self.owner_ref())
    }

    fn full_address<R>(&self, repo: &R) -> Result<Option<String>>
    where
        R: AddressRepo,
        Self: Sized,
    {
        full_address(repo, &self.owner_ref())
    }
}

/// Creates a new address in a single step.
///
/// Callers that run inside a transaction should use
/// [`prepare_new_address`], [`store_address`] and
/// [`dispatch_post_save`] instead.
pub fn add_address<R>(
    repo: &R,
    queue: &dyn GeocodeJobQueue,
    notify: &dyn NotificationGateway,
    owner: OwnerRef,
    input: NewAddress,
) -> Result<Address>
where
    R: AddressRepo,
{
    let now = Timestamp::now();
    let write = prepare_new_address(owner, input, now)?;
    let stored = store_address(repo, write, now)?;
    dispatch_post_save(queue, notify, &stored);
    Ok(stored.address)
}

/// Loads an address and checks that it belongs to `owner`.
pub fn load_owned_address<R>(repo: &R, owner: &OwnerRef, id: &AddressId) -> Result<Address>
where
    R: AddressRepo,
{
    let address = repo.get_address(id)?;
    if address.owner != *owner {
        return Err(Error::Forbidden);
    }
    Ok(address)
}

pub fn update_address<R>(
    repo: &R,
    queue: &dyn GeocodeJobQueue,
    notify: &dyn NotificationGateway,
    owner: &OwnerRef,
    id: &AddressId,
    input: NewAddress,
) -> Result<Address>
where
    R: AddressRepo,
{
    let now = Timestamp::now();
    let current = load_owned_address(repo, owner, id)?;
    let write = prepare_updated_address(current, input, now)?;
    let stored = store_address(repo, write, now)?;
    dispatch_post_save(queue, notify, &stored);
    Ok(stored.address)
}

pub fn owner_addresses<R>(repo: &R, owner: &OwnerRef) -> Result<Vec<Address>>
where
    R: AddressRepo,
{
    Ok(repo.addresses_of_owner(owner)?)
}

pub fn primary_address<R>(repo: &R, owner: &OwnerRef) -> Result<Option<Address>>
where
    R: AddressRepo,
{
    let query = AddressQuery {
        primary: Some(true),
        limit: Some(1),
        ..AddressQuery::of_owner(owner)
    };
    Ok(repo.query_addresses(&query)?.into_iter().next())
}

/// Promotes the address and demotes all other addresses of the owner.
///
/// Returns `false` if the address doesn't exist or belongs to
/// someone else.
pub fn set_primary_address<R>(repo: &R, owner: &OwnerRef, id: &AddressId) -> Result<bool>
where
    R: AddressRepo,
{
    let Some(mut address) = repo.try_get_address(id)? else {
        return Ok(false);
    };
    if address.owner != *owner {
        log::debug!("Address {id} is not owned by {owner}");
        return Ok(false);
    }
    if !address.is_primary {
        address.is_primary = true;
        address.updated_at = Timestamp::now();
        repo.update_address(&address)?;
    }
    repo.demote_primary_addresses(owner, id)?;
    Ok(true)
}

pub fn geocodable_addresses<R>(repo: &R, owner: &OwnerRef) -> Result<Vec<Address>>
where
    R: AddressRepo,
{
    let query = AddressQuery {
        geocoding_enabled: Some(true),
        ..AddressQuery::of_owner(owner)
    };
    Ok(repo.query_addresses(&query)?)
}

/// The formatted primary address of the owner.
pub fn full_address<R>(repo: &R, owner: &OwnerRef) -> Result<Option<String>>
where
    R: AddressRepo,
{
    Ok(primary_address(repo, owner)?.map(|address| address.formatted_address()))
}
