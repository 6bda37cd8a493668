//! Authentication reducers.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.

pub mod orchestrator;

pub use orchestrator::AuthOrchestrator;
