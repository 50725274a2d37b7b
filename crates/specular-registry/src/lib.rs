//! OCI transport (C10): push/pull Specular bundles as single-layer artifacts.

pub mod client;
pub mod error;
pub mod media_types;
pub mod reference;

pub use client::RegistryClient;
pub use error::classify;
pub use media_types::{ARTIFACT_TYPE, BUNDLE_CONFIG_MEDIA_TYPE, BUNDLE_LAYER_MEDIA_TYPE};
pub use reference::Reference;
