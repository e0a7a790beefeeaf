use crate::{entities::CoordinatesError, repositories};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid position")]
    InvalidPosition,
    #[error("The street is missing")]
    EmptyStreet,
    #[error("The city is missing")]
    EmptyCity,
    #[error("Invalid country code")]
    InvalidCountryCode,
    #[error("Unknown owner kind: {0}")]
    UnknownOwnerKind(String),
    #[error("The owner does not exist")]
    OwnerNotFound,
    #[error("This is not allowed")]
    Forbidden,
    #[error(transparent)]
    Repo(#[from] repositories::Error),
}

impl From<CoordinatesError> for Error {
    fn from(_: CoordinatesError) -> Self {
        Self::InvalidPosition
    }
}
