//! Storage traits for authentication data.
//!
//! The subsystem keeps its own runtime state (revocations, lockout records)
//! in memory. The only external data it reads is credentials, through
//! [`CredentialStore`]. Hosts plug in their own backend; an in-memory
//! implementation is provided for small deployments and tests.

pub mod credential;

pub use credential::{CredentialStore, InMemoryCredentialStore};
