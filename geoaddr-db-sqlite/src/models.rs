#![allow(clippy::extra_unused_lifetimes)]

// NOTE:
// All timestamps with the `_at` postfix are stored
// as unix timestamp in **milli**seconds.

use super::schema::*;

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = addresses)]
#[diesel(treat_none_as_null = true)]
pub struct NewAddress {
    pub id: String,
    pub owner_kind: String,
    pub owner_id: String,
    pub kind: Option<String>,
    pub nickname: Option<String>,
    pub is_primary: bool,
    pub geocoding_enabled: bool,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighbourhood: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: Option<String>,
    pub country_code: String,
    pub reference_point: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_phone_country_code: Option<String>,
    pub customer_document: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geocoded_at: Option<i64>,
    pub geocoding_failed_at: Option<i64>,
    pub geocoding_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

// Same column order as the table
#[derive(Queryable)]
pub struct Address {
    pub id: String,
    pub owner_kind: String,
    pub owner_id: String,
    pub kind: Option<String>,
    pub nickname: Option<String>,
    pub is_primary: bool,
    pub geocoding_enabled: bool,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighbourhood: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: Option<String>,
    pub country_code: String,
    pub reference_point: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_phone_country_code: Option<String>,
    pub customer_document: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geocoded_at: Option<i64>,
    pub geocoding_failed_at: Option<i64>,
    pub geocoding_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(AsChangeset)]
#[diesel(table_name = addresses)]
#[diesel(treat_none_as_null = true)]
pub struct GeocodingStatus<'a> {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geocoded_at: Option<i64>,
    pub geocoding_failed_at: Option<i64>,
    pub geocoding_error: Option<&'a str>,
}
