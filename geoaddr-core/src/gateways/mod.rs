pub mod geocode;
pub mod notify;
pub mod queue;
