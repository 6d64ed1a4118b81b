//! Compute service (flavors, keypairs)

mod flavor;
mod keypair;

pub use flavor::{Flavor, FlavorModule};
pub use keypair::{Keypair, KeypairModule};
