//! Approval signing and verification (C6): canonical message, multi-scheme
//! signatures, key trust, and role quorum.

pub mod approval;
pub mod gpg;
pub mod message;
pub mod scheme;
pub mod ssh;
pub mod trust;

pub use approval::{parse_approvals, ApprovalRecord, QuorumChecker};
pub use message::build_approval_message;
pub use scheme::SignatureScheme;
pub use trust::{TrustStore, TrustedKey};
