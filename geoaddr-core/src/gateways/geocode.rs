use crate::entities::{Address, Coordinates};

/// An external service that resolves postal addresses into coordinates.
///
/// Implementations never fail loudly: every kind of lookup failure is
/// logged and reported as `None`.
pub trait GeoCodingGateway {
    /// The name under which the provider is registered.
    fn name(&self) -> &str;

    fn geocode(&self, address: &Address) -> Option<Coordinates>;
}
