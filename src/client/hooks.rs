//! Client error hook.
//!
//! The hook fires whenever a send, receive or disconnect fails, before the
//! error is returned to the caller, giving host engines one place to log or
//! count failures.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::error::BridgeError;

/// A boxed future that is `Send` with a specified lifetime.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handler invoked when a client operation fails.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use mqbridge::client::ClientErrorHandler;
///
/// let error_handler: ClientErrorHandler = Arc::new(|err| {
///     Box::pin(async move {
///         eprintln!("bridge error: {err}");
///     })
/// });
/// let _ = error_handler;
/// ```
pub type ClientErrorHandler =
    Arc<dyn for<'a> Fn(&'a BridgeError) -> BoxFuture<'a, ()> + Send + Sync>;
