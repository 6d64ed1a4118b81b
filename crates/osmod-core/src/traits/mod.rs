//! Core traits for osmod
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`CloudClient`]: Talk to the cloud (external SDK boundary)
//! - [`Module`]: One declarative automation primitive

pub mod cloud_client;
pub mod module;

pub use cloud_client::{CloudClient, CloudClientFactory, Filters, ResourceKind};
pub use module::{Invocation, Module};
