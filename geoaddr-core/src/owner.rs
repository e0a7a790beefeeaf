//! Resolution of polymorphic owner references.
//!
//! An address only stores the `(kind, id)` pair of its owner. The registry
//! maps each known kind to something that can tell whether an owner with
//! a given id exists.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{entities::OwnerRef, repositories, usecases::Error};

pub trait OwnerResolver {
    fn owner_exists(&self, owner_id: &str) -> anyhow::Result<bool>;
}

impl<F> OwnerResolver for F
where
    F: Fn(&str) -> anyhow::Result<bool>,
{
    fn owner_exists(&self, owner_id: &str) -> anyhow::Result<bool> {
        self(owner_id)
    }
}

#[derive(Clone, Default)]
pub struct OwnerRegistry {
    resolvers: HashMap<String, Arc<dyn OwnerResolver + Send + Sync>>,
}

impl fmt::Debug for OwnerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OwnerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl OwnerRegistry {
    pub fn register<R>(&mut self, kind: impl Into<String>, resolver: R)
    where
        R: OwnerResolver + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.resolvers.insert(kind.clone(), Arc::new(resolver)).is_some() {
            log::warn!("Replaced owner resolver for kind '{kind}'");
        }
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.resolvers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Checks that the owner kind is registered and the owner exists.
    pub fn resolve(&self, owner: &OwnerRef) -> Result<(), Error> {
        let resolver = self
            .resolvers
            .get(&owner.kind)
            .ok_or_else(|| Error::UnknownOwnerKind(owner.kind.clone()))?;
        let exists = resolver
            .owner_exists(&owner.id)
            .map_err(repositories::Error::Other)?;
        if !exists {
            return Err(Error::OwnerNotFound);
        }
        Ok(())
    }
}
