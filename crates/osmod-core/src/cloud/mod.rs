// # Cloud Client Implementations
//
// Offline CloudClient backends. Real clouds are plugged in through a
// `CloudConfig::Custom` factory registered with the module registry.

pub mod file;
pub mod memory;

pub use file::{FileCloud, FileCloudFactory};
pub use memory::{MemoryCloud, MemoryCloudFactory};
