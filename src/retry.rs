use std::future::Future;

use crate::lightroom::LightroomError;

/// Number of times a single call may be re-issued after refreshing the token.
pub const MAX_AUTH_RETRIES: u32 = 1;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    RefreshAndRetry,
    Abort,
}

/// Classify an error from an authenticated call. Only a rejected access
/// token is worth a refresh; everything else is final for the call.
pub fn classify(err: &LightroomError) -> RetryAction {
    if err.is_auth_expired() {
        RetryAction::RefreshAndRetry
    } else {
        RetryAction::Abort
    }
}

/// Run `operation`, refreshing credentials and re-issuing it at most
/// [`MAX_AUTH_RETRIES`] times when the token is rejected.
///
/// - `refresh`: exchanges the refresh token; its errors are never retried
/// - `operation`: the authenticated call, re-invoked with the same inputs
///
/// An `AuthExpired` that survives the retry budget is escalated to
/// `AuthFailure`.
pub async fn retry_after_refresh<F, Fut, R, RFut, T>(
    refresh: R,
    operation: F,
) -> Result<T, LightroomError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LightroomError>>,
    R: Fn() -> RFut,
    RFut: Future<Output = Result<(), LightroomError>>,
{
    let mut retries = 0u32;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if classify(&e) == RetryAction::Abort {
                    return Err(e);
                }
                if retries >= MAX_AUTH_RETRIES {
                    tracing::warn!("Token rejected again after refresh: {}", e);
                    return Err(e.escalate());
                }
                retries += 1;
                tracing::info!("{}; refreshing access token and retrying", e);
                refresh().await?;
            }
        }
    }
}
