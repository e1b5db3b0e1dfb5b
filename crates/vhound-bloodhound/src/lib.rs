//! BloodHound API integration.
//!
//! A small client for the BloodHound REST API authenticated with the
//! chained-HMAC request signature scheme, plus the resolver that joins
//! collected principals to BloodHound's Active Directory domains via
//! `match_by` edges.

pub mod client;
pub mod error;
pub mod signer;
pub mod sync;

pub use client::{BloodHoundClient, BloodHoundConfig};
pub use error::{BloodHoundError, BloodHoundResult};
pub use signer::{RequestSigner, SignedHeaders};
pub use sync::DomainSyncResolver;
