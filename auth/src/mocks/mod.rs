//! Mock provider implementations for testing.
//!
//! In-memory implementations of the provider traits for unit and
//! integration tests.

pub mod session;
pub mod verifier;

pub use session::MemorySessionStore;
pub use verifier::MockVerifier;
