#[macro_use]
extern crate log;

mod create_address;
mod enqueue_pending;
mod geocode_address;
mod owner_addresses;
mod retry_geocoding;
mod set_primary_address;
mod update_address;

pub mod error;
pub mod queue;

pub mod prelude {
    pub use super::{
        create_address::*, enqueue_pending::*, geocode_address::*, owner_addresses::*,
        retry_geocoding::*, set_primary_address::*, update_address::*,
    };
}

pub type Result<T> = std::result::Result<T, error::AppError>;

pub(crate) use geoaddr_core::{entities::*, usecases};

#[cfg(test)]
pub(crate) mod tests;

pub(crate) mod sqlite {
    pub use geoaddr_db_sqlite::Connections;
}
