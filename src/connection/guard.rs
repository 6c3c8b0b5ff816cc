//! Task-scoped marker for work submitted by the SDK itself.
//!
//! Delivery workers and the buffer flusher run their sends under this marker
//! so the capture path can drop events generated by the SDK's own activity.
//! The marker travels with the task, not the thread, so it survives runtime
//! work-stealing and never leaks to unrelated tasks sharing the thread.

use std::future::Future;

tokio::task_local! {
    static SDK_INTERNAL: bool;
}

/// Run `future` with the SDK-internal marker set.
pub async fn with_sdk_internal<F>(future: F) -> F::Output
where
    F: Future,
{
    SDK_INTERNAL.scope(true, future).await
}

/// Whether the current task is running SDK-submitted work.
pub fn is_sdk_internal() -> bool {
    SDK_INTERNAL.try_with(|flag| *flag).unwrap_or(false)
}
