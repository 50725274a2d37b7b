//! Attestation engine (C7): in-toto v1 statements, SLSA provenance, signing,
//! and verification against a bundle's manifest digest.

pub mod engine;
pub mod provenance;
pub mod signing;
pub mod statement;

pub use engine::{generate, AttestationMode, AttestationRecord, AttestationVerifier};
pub use provenance::SlsaProvenance;
pub use statement::{Statement, Subject, SLSA_PROVENANCE_PREDICATE_TYPE, STATEMENT_TYPE};
