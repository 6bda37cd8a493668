//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// The block must evaluate to `Option<Action>`.
///
/// # Example
///
/// ```rust,ignore
/// use whop_embed_core::async_effect;
///
/// async_effect! {
///     let verified = backend.verify(&company_id).await;
///     Some(AuthAction::VerificationCompleted { attempt, result: verified })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}
