pub mod parcel_api;

#[cfg(test)]
pub(crate) mod fake;

pub use parcel_api::{BackendRejection, ParcelApi};
