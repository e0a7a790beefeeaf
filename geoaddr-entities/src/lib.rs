#![deny(missing_debug_implementations)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # geoaddr-entities
//!
//! Reusable, agnostic domain entities for postal addresses that can be
//! attached to arbitrary owner entities.
//!
//! The entities only contain generic functionality that does not reveal any
//! application-specific business logic.

pub mod address;
pub mod geo;
pub mod id;
pub mod owner;
pub mod time;

#[cfg(any(test, feature = "builders"))]
pub mod builders;
