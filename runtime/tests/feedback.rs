//! Integration tests for the Store feedback loop
//!
//! Tests the action observation features the auth facade builds on:
//! waiting for a terminal action of one attempt and ignoring stale ones.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use whop_embed_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use whop_embed_runtime::{Store, StoreConfig, StoreError};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum HandshakeAction {
    /// Start a new attempt
    Start,
    /// One step of attempt `attempt` finished
    StepCompleted { attempt: u64, step: u32 },
    /// Attempt finished (terminal action)
    Finished { attempt: u64 },
}

#[derive(Debug, Clone, Default)]
struct HandshakeState {
    attempt: u64,
    steps: Vec<u32>,
    finished: Option<u64>,
}

#[derive(Clone)]
struct HandshakeReducer;

impl Reducer for HandshakeReducer {
    type State = HandshakeState;
    type Action = HandshakeAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            HandshakeAction::Start => {
                state.attempt += 1;
                state.steps.clear();
                state.finished = None;
                let attempt = state.attempt;
                smallvec![Effect::Future(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Some(HandshakeAction::StepCompleted { attempt, step: 1 })
                }))]
            },

            HandshakeAction::StepCompleted { attempt, .. } if attempt != state.attempt => {
                smallvec![Effect::None]
            },

            HandshakeAction::StepCompleted { attempt, step } => {
                state.steps.push(step);
                if step < 2 {
                    smallvec![Effect::Future(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Some(HandshakeAction::StepCompleted { attempt, step: step + 1 })
                    }))]
                } else {
                    smallvec![Effect::Future(Box::pin(async move {
                        Some(HandshakeAction::Finished { attempt })
                    }))]
                }
            },

            HandshakeAction::Finished { attempt } => {
                if attempt == state.attempt {
                    state.finished = Some(attempt);
                }
                smallvec![Effect::None]
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_send_and_wait_for_terminal_action() {
    let store = Store::new(HandshakeState::default(), HandshakeReducer, ());

    let result = store
        .send_and_wait_for(
            HandshakeAction::Start,
            |action| matches!(action, HandshakeAction::Finished { .. }),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.unwrap(), HandshakeAction::Finished { attempt: 1 });
    assert_eq!(store.state(|s| s.steps.clone()).await, vec![1, 2]);
    assert_eq!(store.state(|s| s.finished).await, Some(1));
}

#[tokio::test]
async fn test_send_and_wait_for_timeout() {
    let store = Store::new(HandshakeState::default(), HandshakeReducer, ());

    let result = store
        .send_and_wait_for(
            HandshakeAction::Start,
            |action| matches!(action, HandshakeAction::Finished { attempt: 99 }),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn test_restart_supersedes_previous_attempt() {
    let store = Arc::new(Store::new(HandshakeState::default(), HandshakeReducer, ()));

    // First attempt is superseded before its first step lands.
    store.send(HandshakeAction::Start).await.unwrap();

    let result = store
        .send_and_wait_for(
            HandshakeAction::Start,
            |action| matches!(action, HandshakeAction::Finished { attempt: 2 }),
            Duration::from_secs(1),
        )
        .await;

    assert!(result.is_ok());
    // Give the stale attempt time to drain.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = store.state(Clone::clone).await;
    assert_eq!(state.attempt, 2);
    assert_eq!(state.steps, vec![1, 2]);
    assert_eq!(state.finished, Some(2));
}

#[tokio::test]
async fn test_subscribe_state_sees_latest_snapshot() {
    let store = Store::with_config(
        HandshakeState::default(),
        HandshakeReducer,
        (),
        StoreConfig::default().with_broadcast_capacity(4),
    );
    let mut rx = store.subscribe_state();

    store.send(HandshakeAction::Start).await.unwrap();

    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if rx.borrow_and_update().finished == Some(1) {
                break;
            }
            rx.changed().await.unwrap();
        }
    })
    .await;

    assert!(waited.is_ok());
}

#[tokio::test]
async fn test_effect_handle_waits_for_own_effects() {
    let store = Store::new(HandshakeState::default(), HandshakeReducer, ());

    let mut handle = store.send(HandshakeAction::Start).await.unwrap();
    assert_eq!(handle.pending(), 1);

    handle
        .wait_with_timeout(Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(handle.pending(), 0);
}

#[tokio::test]
async fn test_shutdown_waits_for_pending_effects() {
    let store = Store::new(HandshakeState::default(), HandshakeReducer, ());

    store.send(HandshakeAction::Start).await.unwrap();
    assert!(store.pending_effects() > 0);

    // Feedback actions are rejected once shutdown starts, so the chain ends early.
    assert!(store.shutdown(Duration::from_secs(1)).await.is_ok());
    assert_eq!(store.pending_effects(), 0);
}
