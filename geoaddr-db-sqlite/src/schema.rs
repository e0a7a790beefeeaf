///////////////////////////////////////////////////////////////////////
// Addresses
///////////////////////////////////////////////////////////////////////

table! {
    addresses (id) {
        id -> Text,
        owner_kind -> Text,
        owner_id -> Text,
        kind -> Nullable<Text>,
        nickname -> Nullable<Text>,
        is_primary -> Bool,
        geocoding_enabled -> Bool,
        street -> Text,
        number -> Nullable<Text>,
        complement -> Nullable<Text>,
        neighbourhood -> Nullable<Text>,
        city -> Text,
        state -> Text,
        postal_code -> Nullable<Text>,
        country_code -> Text,
        reference_point -> Nullable<Text>,
        customer_name -> Nullable<Text>,
        customer_phone -> Nullable<Text>,
        customer_phone_country_code -> Nullable<Text>,
        customer_document -> Nullable<Text>,
        notes -> Nullable<Text>,
        metadata -> Nullable<Text>,
        lat -> Nullable<Double>,
        lng -> Nullable<Double>,
        geocoded_at -> Nullable<BigInt>,
        geocoding_failed_at -> Nullable<BigInt>,
        geocoding_error -> Nullable<Text>,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}
