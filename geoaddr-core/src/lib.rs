pub mod gateways;
pub mod owner;
pub mod repositories;
pub mod usecases;

pub mod entities {
    pub use geoaddr_entities::{address::*, geo::*, id::*, owner::*, time::*};
}

pub use self::repositories::Error as RepoError;
