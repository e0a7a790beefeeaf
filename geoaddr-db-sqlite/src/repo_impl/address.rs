use super::*;

macro_rules! impl_address_repo {
    ($db:ty) => {
        impl AddressRepo for $db {
            fn create_address(&self, address: &Address) -> Result<()> {
                create_address(&mut self.conn.borrow_mut(), address)
            }

            fn update_address(&self, address: &Address) -> Result<()> {
                update_address(&mut self.conn.borrow_mut(), address)
            }

            fn get_address(&self, id: &AddressId) -> Result<Address> {
                get_address(&mut self.conn.borrow_mut(), id)
            }

            fn query_addresses(&self, query: &AddressQuery) -> Result<Vec<Address>> {
                query_addresses(&mut self.conn.borrow_mut(), query)
            }

            fn update_geocoding_status(
                &self,
                id: &AddressId,
                status: &GeocodingStatus,
            ) -> Result<()> {
                update_geocoding_status(&mut self.conn.borrow_mut(), id, status)
            }

            fn demote_primary_addresses(&self, owner: &OwnerRef, keep: &AddressId) -> Result<usize> {
                demote_primary_addresses(&mut self.conn.borrow_mut(), owner, keep)
            }
        }
    };
}

impl_address_repo!(DbReadWrite<'_>);
impl_address_repo!(DbConnection<'_>);

impl AddressRepo for DbReadOnly<'_> {
    fn create_address(&self, _address: &Address) -> Result<()> {
        Err(read_only_err())
    }

    fn update_address(&self, _address: &Address) -> Result<()> {
        Err(read_only_err())
    }

    fn get_address(&self, id: &AddressId) -> Result<Address> {
        get_address(&mut self.conn.borrow_mut(), id)
    }

    fn query_addresses(&self, query: &AddressQuery) -> Result<Vec<Address>> {
        query_addresses(&mut self.conn.borrow_mut(), query)
    }

    fn update_geocoding_status(&self, _id: &AddressId, _status: &GeocodingStatus) -> Result<()> {
        Err(read_only_err())
    }

    fn demote_primary_addresses(&self, _owner: &OwnerRef, _keep: &AddressId) -> Result<usize> {
        Err(read_only_err())
    }
}

fn into_new_address(address: &Address) -> Result<models::NewAddress> {
    let Address {
        id,
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
        geocoding,
        created_at,
        updated_at,
    } = address;
    let metadata = if metadata.is_empty() {
        None
    } else {
        Some(serde_json::to_string(metadata).map_err(anyhow::Error::from)?)
    };
    let (lat, lng) = geocoding
        .coordinates
        .map(Coordinates::to_lat_lng)
        .unzip();
    Ok(models::NewAddress {
        id: id.to_string(),
        owner_kind: owner.kind.clone(),
        owner_id: owner.id.clone(),
        kind: kind.clone(),
        nickname: nickname.clone(),
        is_primary: *is_primary,
        geocoding_enabled: *geocoding_enabled,
        street: postal.street.clone(),
        number: postal.number.clone(),
        complement: postal.complement.clone(),
        neighbourhood: postal.neighbourhood.clone(),
        city: postal.city.clone(),
        state: postal.state.clone(),
        postal_code: postal.postal_code.clone(),
        country_code: postal.country_code.clone(),
        reference_point: reference_point.clone(),
        customer_name: customer.name.clone(),
        customer_phone: customer.phone.clone(),
        customer_phone_country_code: customer.phone_country_code.clone(),
        customer_document: customer.document.clone(),
        notes: notes.clone(),
        metadata,
        lat,
        lng,
        geocoded_at: geocoding.geocoded_at.map(Timestamp::as_millis),
        geocoding_failed_at: geocoding.failed_at.map(Timestamp::as_millis),
        geocoding_error: geocoding.error.clone(),
        created_at: created_at.as_millis(),
        updated_at: updated_at.as_millis(),
    })
}

fn load_timestamp(millis: i64) -> Result<Timestamp> {
    Timestamp::try_from_millis(millis)
        .map_err(|err| anyhow!("Invalid timestamp {millis}: {err}").into())
}

fn load_address(row: models::Address) -> Result<Address> {
    let models::Address {
        id,
        owner_kind,
        owner_id,
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
        geocoded_at,
        geocoding_failed_at,
        geocoding_error,
        created_at,
        updated_at,
    } = row;
    let id = id
        .parse::<AddressId>()
        .map_err(|err| anyhow!("Invalid address id '{id}': {err}"))?;
    let coordinates = match (lat, lng) {
        (Some(lat), Some(lng)) => Some(
            Coordinates::try_from_lat_lng(lat, lng)
                .map_err(|err| anyhow!("Invalid coordinates of address {id}: {err}"))?,
        ),
        (None, None) => None,
        _ => {
            log::warn!("Incomplete coordinates of address {id}");
            None
        }
    };
    let metadata = match metadata {
        Some(json) => serde_json::from_str(&json)
            .map_err(|err| anyhow!("Invalid metadata of address {id}: {err}"))?,
        None => Metadata::new(),
    };
    Ok(Address {
        id,
        owner: OwnerRef::new(owner_kind, owner_id),
        kind,
        nickname,
        is_primary,
        geocoding_enabled,
        postal: PostalAddress {
            street,
            number,
            complement,
            neighbourhood,
            city,
            state,
            postal_code,
            country_code,
        },
        reference_point,
        customer: CustomerContact {
            name: customer_name,
            phone: customer_phone,
            phone_country_code: customer_phone_country_code,
            document: customer_document,
        },
        notes,
        metadata,
        geocoding: GeocodingStatus {
            coordinates,
            geocoded_at: geocoded_at.map(load_timestamp).transpose()?,
            failed_at: geocoding_failed_at.map(load_timestamp).transpose()?,
            error: geocoding_error,
        },
        created_at: load_timestamp(created_at)?,
        updated_at: load_timestamp(updated_at)?,
    })
}

fn create_address(conn: &mut SqliteConnection, address: &Address) -> Result<()> {
    let model = into_new_address(address)?;
    diesel::insert_into(schema::addresses::table)
        .values(&model)
        .execute(conn)
        .map_err(from_diesel_err)?;
    Ok(())
}

fn update_address(conn: &mut SqliteConnection, address: &Address) -> Result<()> {
    use schema::addresses::dsl;
    let model = into_new_address(address)?;
    let count = diesel::update(dsl::addresses.filter(dsl::id.eq(&model.id)))
        .set(&model)
        .execute(conn)
        .map_err(from_diesel_err)?;
    if count == 0 {
        return Err(repo::Error::NotFound);
    }
    debug_assert_eq!(1, count);
    Ok(())
}

fn get_address(conn: &mut SqliteConnection, id: &AddressId) -> Result<Address> {
    use schema::addresses::dsl;
    let row = dsl::addresses
        .filter(dsl::id.eq(id.to_string()))
        .first::<models::Address>(conn)
        .map_err(from_diesel_err)?;
    load_address(row)
}

fn query_addresses(conn: &mut SqliteConnection, query: &AddressQuery) -> Result<Vec<Address>> {
    use schema::addresses::dsl;
    let AddressQuery {
        owner,
        primary,
        geocoding_enabled,
        geocoded,
        failed,
        needs_geocoding,
        limit,
    } = query;
    let mut q = dsl::addresses.into_boxed();
    if let Some(owner) = owner {
        q = q
            .filter(dsl::owner_kind.eq(owner.kind.as_str()))
            .filter(dsl::owner_id.eq(owner.id.as_str()));
    }
    if let Some(primary) = primary {
        q = q.filter(dsl::is_primary.eq(*primary));
    }
    if let Some(enabled) = geocoding_enabled {
        q = q.filter(dsl::geocoding_enabled.eq(*enabled));
    }
    match geocoded {
        Some(true) => q = q.filter(dsl::geocoded_at.is_not_null()),
        Some(false) => q = q.filter(dsl::geocoded_at.is_null()),
        None => {}
    }
    match failed {
        Some(true) => q = q.filter(dsl::geocoding_failed_at.is_not_null()),
        Some(false) => q = q.filter(dsl::geocoding_failed_at.is_null()),
        None => {}
    }
    if *needs_geocoding {
        q = q
            .filter(dsl::geocoding_enabled.eq(true))
            .filter(dsl::lat.is_null())
            .filter(dsl::geocoding_failed_at.is_null());
    }
    if let Some(limit) = limit {
        let limit = i64::try_from(*limit).map_err(|err| anyhow!("Invalid limit: {err}"))?;
        q = q.limit(limit);
    }
    q.order_by((dsl::created_at, dsl::id))
        .load::<models::Address>(conn)
        .map_err(from_diesel_err)?
        .into_iter()
        .map(load_address)
        .collect()
}

fn update_geocoding_status(
    conn: &mut SqliteConnection,
    id: &AddressId,
    status: &GeocodingStatus,
) -> Result<()> {
    use schema::addresses::dsl;
    let (lat, lng) = status.coordinates.map(Coordinates::to_lat_lng).unzip();
    let changeset = models::GeocodingStatus {
        lat,
        lng,
        geocoded_at: status.geocoded_at.map(Timestamp::as_millis),
        geocoding_failed_at: status.failed_at.map(Timestamp::as_millis),
        geocoding_error: status.error.as_deref(),
    };
    let count = diesel::update(dsl::addresses.filter(dsl::id.eq(id.to_string())))
        .set(&changeset)
        .execute(conn)
        .map_err(from_diesel_err)?;
    if count == 0 {
        return Err(repo::Error::NotFound);
    }
    Ok(())
}

fn demote_primary_addresses(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    keep: &AddressId,
) -> Result<usize> {
    use schema::addresses::dsl;
    diesel::update(
        dsl::addresses
            .filter(dsl::owner_kind.eq(&owner.kind))
            .filter(dsl::owner_id.eq(&owner.id))
            .filter(dsl::is_primary.eq(true))
            .filter(dsl::id.ne(keep.to_string())),
    )
    .set(dsl::is_primary.eq(false))
    .execute(conn)
    .map_err(from_diesel_err)
}
