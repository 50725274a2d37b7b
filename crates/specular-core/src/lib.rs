//! Core bundle format: digesting, archive codec, manifest model, build/verify
//! pipeline, structural diff, and apply.
//!
//! Signing, attestation, and registry transport live in sibling crates
//! (`specular-approval`, `specular-attestation`, `specular-registry`) that
//! depend on this one, not the other way around.

pub mod apply;
pub mod bundle;
pub mod diff;
pub mod digest;
pub mod error;
pub mod manifest;

pub use error::{ErrorKind, Result, SpecularError};
pub use manifest::{FileEntry, GovernanceLevel, IntegrityDescriptor, Manifest, SCHEMA_V1};
