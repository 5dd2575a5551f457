//! Bounded single-retry policy for auth-class failures.

use fabula_error::FabulaResult;
use fabula_interface::CredentialReselector;
use std::future::Future;
use tracing::{debug, warn};

use crate::auth::is_auth_class;

/// Run an operation with at most one auth-class recovery attempt.
///
/// The operation receives an optional replacement key: `None` on the first
/// attempt, `Some` on the retry after a successful credential reselection.
/// Control flow is a plain two-step sequence, with no mutable "already
/// retried" state to thread around:
///
/// - first attempt fails non-auth-class, or no reselector is available, or
///   the user declines reselection → the original error propagates;
/// - otherwise the operation runs exactly once more with the new key, and
///   whatever that attempt produces is final.
pub async fn with_auth_retry<T, F, Fut>(
    reselector: Option<&dyn CredentialReselector>,
    op: F,
) -> FabulaResult<T>
where
    F: Fn(Option<String>) -> Fut,
    Fut: Future<Output = FabulaResult<T>>,
{
    let first_failure = match op(None).await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if !is_auth_class(&first_failure) {
        return Err(first_failure);
    }

    let Some(reselector) = reselector else {
        debug!("auth-class failure with no reselection capability, propagating");
        return Err(first_failure);
    };

    warn!(error = %first_failure, "auth-class failure, prompting for a new credential");
    let Some(new_key) = reselector.reselect().await else {
        return Err(first_failure);
    };

    op(Some(new_key)).await
}
