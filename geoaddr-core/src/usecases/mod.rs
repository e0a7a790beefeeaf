mod addressable;
mod error;
mod geocode_address;
mod retry_geocoding;
mod write_address;

#[cfg(test)]
pub mod tests;

pub use self::{
    addressable::*, error::Error, geocode_address::*, retry_geocoding::*, write_address::*,
};

mod prelude {
    pub use super::error::Error;
    pub type Result<T> = std::result::Result<T, Error>;
    pub use crate::{entities::*, repositories::*};
}
