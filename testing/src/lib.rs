//! # Whop Embed Testing
//!
//! Testing utilities and helpers for the embedded-app reducer architecture.
//!
//! This crate provides:
//! - Mock implementations of core Environment traits
//! - A Given-When-Then harness for reducers
//! - Assertion helpers for effects
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```ignore
//! use whop_embed_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(AuthOrchestrator::new())
//!     .with_env(test_environment())
//!     .given_state(AuthState::default())
//!     .when_action(AuthAction::Initialize)
//!     .then_state(|s| assert!(s.is_loading))
//!     .then_effects(assertions::assert_has_future_effect)
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use whop_embed_core::environment::Clock;


/// Mock implementations of core Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use whop_embed_testing::mocks::FixedClock;
    /// use whop_embed_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

/// Test helpers
pub mod helpers {
    /// Install a `tracing` subscriber for tests.
    ///
    /// Honors `RUST_LOG` and defaults to `debug`. Output goes through the test
    /// writer so it is captured per test. Safe to call from every test.
    pub fn init_tracing() {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::init_tracing;
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
