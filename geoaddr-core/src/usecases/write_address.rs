use super::prelude::*;
use crate::gateways::{
    notify::{NotificationEvent, NotificationGateway},
    queue::GeocodeJobQueue,
};

/// Editable fields of an address.
///
/// Used both for creating and for updating a record. Updates replace all
/// editable fields, use `NewAddress::from(&address)` to start from the
/// stored state.
#[rustfmt::skip]
#[derive(Debug, Clone, PartialEq)]
pub struct NewAddress {
    pub kind                        : Option<String>,
    pub nickname                    : Option<String>,
    pub is_primary                  : bool,
    pub geocoding_enabled           : bool,
    pub street                      : String,
    pub number                      : Option<String>,
    pub complement                  : Option<String>,
    pub neighbourhood               : Option<String>,
    pub city                        : String,
    pub state                       : String,
    pub postal_code                 : Option<String>,
    pub country_code                : Option<String>,
    pub reference_point             : Option<String>,
    pub customer_name               : Option<String>,
    pub customer_phone              : Option<String>,
    pub customer_phone_country_code : Option<String>,
    pub customer_document           : Option<String>,
    pub notes                       : Option<String>,
    pub metadata                    : Metadata,
    /// Explicitly known position. Supplying it skips the geocoding lookup.
    pub lat                         : Option<f64>,
    pub lng                         : Option<f64>,
}

impl Default for NewAddress {
    fn default() -> Self {
        Self {
            kind: None,
            nickname: None,
            is_primary: false,
            geocoding_enabled: true,
            street: String::new(),
            number: None,
            complement: None,
            neighbourhood: None,
            city: String::new(),
            state: String::new(),
            postal_code: None,
            country_code: None,
            reference_point: None,
            customer_name: None,
            customer_phone: None,
            customer_phone_country_code: None,
            customer_document: None,
            notes: None,
            metadata: Metadata::new(),
            lat: None,
            lng: None,
        }
    }
}

impl From<&Address> for NewAddress {
    // Stored coordinates are not carried over into `lat`/`lng`.
    fn from(from: &Address) -> Self {
        let PostalAddress {
            street,
            number,
            complement,
            neighbourhood,
            city,
            state,
            postal_code,
            country_code,
        } = from.postal.clone();
        let CustomerContact {
            name,
            phone,
            phone_country_code,
            document,
        } = from.customer.clone();
        Self {
            kind: from.kind.clone(),
            nickname: from.nickname.clone(),
            is_primary: from.is_primary,
            geocoding_enabled: from.geocoding_enabled,
            street,
            number,
            complement,
            neighbourhood,
            city,
            state,
            postal_code,
            country_code: Some(country_code),
            reference_point: from.reference_point.clone(),
            customer_name: name,
            customer_phone: phone,
            customer_phone_country_code: phone_country_code,
            customer_document: document,
            notes: from.notes.clone(),
            metadata: from.metadata.clone(),
            lat: None,
            lng: None,
        }
    }
}

/// A validated record that is ready to be persisted, together with the
/// facts about this particular write that the post-save rules need.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub address: Address,
    pub is_new: bool,
    /// Coordinates were given explicitly in this write.
    pub coordinates_supplied: bool,
    /// At least one of the location defining fields differs from the
    /// stored record. Always `false` for new records.
    pub identity_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSaveAction {
    /// Set `geocoded_at` without touching anything else.
    StampGeocodedAt,
    NotifyGeocoded,
    EnqueueGeocoding,
    DemoteOtherPrimaries,
}

impl PostSaveAction {
    /// Actions that must only run once the write has been committed.
    pub fn is_deferred(self) -> bool {
        matches!(self, Self::NotifyGeocoded | Self::EnqueueGeocoding)
    }
}

/// The outcome of [`store_address`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAddress {
    pub address: Address,
    /// Side effects that are left for [`dispatch_post_save`].
    pub deferred: Vec<PostSaveAction>,
}

fn trimmed(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

fn supplied_coordinates(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Coordinates>> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Some(Coordinates::try_from_lat_lng(lat, lng)?)),
        (None, None) => Ok(None),
        _ => Err(Error::InvalidPosition),
    }
}

fn normalize_country_code(code: Option<String>) -> Result<String> {
    let Some(code) = trimmed(code) else {
        return Ok(DEFAULT_COUNTRY_CODE.to_owned());
    };
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidCountryCode);
    }
    Ok(code.to_ascii_uppercase())
}

struct ValidatedInput {
    kind: Option<String>,
    nickname: Option<String>,
    is_primary: bool,
    geocoding_enabled: bool,
    postal: PostalAddress,
    reference_point: Option<String>,
    customer: CustomerContact,
    notes: Option<String>,
    metadata: Metadata,
    coordinates: Option<Coordinates>,
}

fn validate(input: NewAddress) -> Result<ValidatedInput> {
    let NewAddress {
        kind,
        nickname,
        is_primary,
        geocoding_enabled,
        street,
        number,
        complement,
        neighbourhood,
        city,
        state,
        postal_code,
        country_code,
        reference_point,
        customer_name,
        customer_phone,
        customer_phone_country_code,
        customer_document,
        notes,
        metadata,
        lat,
        lng,
    } = input;
    let street = street.trim().to_owned();
    if street.is_empty() {
        return Err(Error::EmptyStreet);
    }
    let city = city.trim().to_owned();
    if city.is_empty() {
        return Err(Error::EmptyCity);
    }
    let postal = PostalAddress {
        street,
        number: trimmed(number),
        complement: trimmed(complement),
        neighbourhood: trimmed(neighbourhood),
        city,
        state: state.trim().to_owned(),
        postal_code: trimmed(postal_code),
        country_code: normalize_country_code(country_code)?,
    };
    let customer = CustomerContact {
        name: trimmed(customer_name),
        phone: trimmed(customer_phone),
        phone_country_code: trimmed(customer_phone_country_code),
        document: trimmed(customer_document),
    };
    Ok(ValidatedInput {
        kind: trimmed(kind),
        nickname: trimmed(nickname),
        is_primary,
        geocoding_enabled,
        postal,
        reference_point: trimmed(reference_point),
        customer,
        notes: trimmed(notes),
        metadata,
        coordinates: supplied_coordinates(lat, lng)?,
    })
}

// Applies supplied coordinates and enforces the disabled state.
fn apply_geocoding_rules(address: &mut Address, supplied: Option<Coordinates>) {
    if let Some(coordinates) = supplied {
        address.geocoding.coordinates = Some(coordinates);
        address.geocoding.failed_at = None;
        address.geocoding.error = None;
    }
    if !address.geocoding_enabled {
        address.geocoding.clear();
    }
}

pub fn prepare_new_address(
    owner: OwnerRef,
    input: NewAddress,
    now: Timestamp,
) -> Result<PendingWrite> {
    let ValidatedInput {
        kind,
        nickname,
        is_primary,
        geocoding_enabled,
        postal,
        reference_point,
        customer,
        notes,
        metadata,
        coordinates,
    } = validate(input)?;
    let mut address = Address {
        id: AddressId::new(),
        owner,
        kind,
        nickname,
        is_primary,
        geocoding_enabled,
        postal,
        reference_point,
        customer,
        notes,
        metadata,
        geocoding: GeocodingStatus::default(),
        created_at: now,
        updated_at: now,
    };
    apply_geocoding_rules(&mut address, coordinates);
    Ok(PendingWrite {
        address,
        is_new: true,
        coordinates_supplied: coordinates.is_some(),
        identity_changed: false,
    })
}

pub fn prepare_updated_address(
    current: Address,
    input: NewAddress,
    now: Timestamp,
) -> Result<PendingWrite> {
    let ValidatedInput {
        kind,
        nickname,
        is_primary,
        geocoding_enabled,
        postal,
        reference_point,
        customer,
        notes,
        metadata,
        coordinates,
    } = validate(input)?;
    let identity_changed = postal != current.postal;
    let mut address = Address {
        kind,
        nickname,
        is_primary,
        geocoding_enabled,
        postal,
        reference_point,
        customer,
        notes,
        metadata,
        updated_at: now,
        ..current
    };
    if identity_changed && coordinates.is_none() {
        log::debug!(
            "Location of address {} changed, clearing geocoding outcome",
            address.id
        );
        address.geocoding.clear();
    }
    apply_geocoding_rules(&mut address, coordinates);
    Ok(PendingWrite {
        address,
        is_new: false,
        coordinates_supplied: coordinates.is_some(),
        identity_changed,
    })
}

/// Decides what has to happen after a pending write has been persisted.
pub fn post_save_actions(write: &PendingWrite) -> Vec<PostSaveAction> {
    let PendingWrite {
        address,
        is_new,
        coordinates_supplied,
        identity_changed,
    } = write;
    let mut actions = Vec::new();
    if address.geocoding_enabled {
        if *coordinates_supplied && address.geocoding.coordinates.is_some() {
            if *is_new || address.geocoding.geocoded_at.is_none() {
                actions.push(PostSaveAction::StampGeocodedAt);
            }
            actions.push(PostSaveAction::NotifyGeocoded);
        } else if (*is_new || *identity_changed) && address.needs_geocoding() {
            actions.push(PostSaveAction::EnqueueGeocoding);
        }
    }
    if address.is_primary {
        actions.push(PostSaveAction::DemoteOtherPrimaries);
    }
    log::debug!("Post-save actions for address {}: {actions:?}", address.id);
    actions
}

/// Persists the pending write and runs all post-save actions that
/// belong into the same unit of work.
pub fn store_address<R>(repo: &R, write: PendingWrite, now: Timestamp) -> Result<StoredAddress>
where
    R: AddressRepo,
{
    let actions = post_save_actions(&write);
    let PendingWrite {
        mut address,
        is_new,
        ..
    } = write;
    if is_new {
        repo.create_address(&address)?;
    } else {
        repo.update_address(&address)?;
    }
    let mut deferred = Vec::with_capacity(actions.len());
    for action in actions {
        match action {
            PostSaveAction::StampGeocodedAt => {
                address.geocoding.geocoded_at = Some(now);
                repo.update_geocoding_status(&address.id, &address.geocoding)?;
            }
            PostSaveAction::DemoteOtherPrimaries => {
                let count = repo.demote_primary_addresses(&address.owner, &address.id)?;
                if count > 0 {
                    log::debug!("Demoted {count} primary address(es) of {}", address.owner);
                }
            }
            PostSaveAction::NotifyGeocoded | PostSaveAction::EnqueueGeocoding => {
                deferred.push(action);
            }
        }
    }
    Ok(StoredAddress { address, deferred })
}

/// Emits events and enqueues jobs for a committed write.
pub fn dispatch_post_save(
    queue: &dyn GeocodeJobQueue,
    notify: &dyn NotificationGateway,
    stored: &StoredAddress,
) {
    let StoredAddress { address, deferred } = stored;
    for action in deferred {
        match action {
            PostSaveAction::NotifyGeocoded => {
                notify.notify(NotificationEvent::AddressGeocoded { address });
            }
            PostSaveAction::EnqueueGeocoding => {
                if !queue.enqueue_geocoding(&address.id) {
                    log::debug!("Geocoding of address {} is already pending", address.id);
                }
            }
            PostSaveAction::StampGeocodedAt | PostSaveAction::DemoteOtherPrimaries => {
                debug_assert!(!action.is_deferred());
            }
        }
    }
}
