//! DNS service (zones)

mod zone;

pub use zone::{Zone, ZoneModule};
