//! Block storage service (volumes)

mod volume;

pub use volume::{Volume, VolumeModule};
