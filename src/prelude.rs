//! Optional convenience imports for common bridge workflows.
//!
//! Prefer importing specialised APIs directly from their owning modules.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mqbridge::prelude::*;
//!
//! async fn ping<T: Transport>(client: &Client<T>) -> Result<MessageId> {
//!     client
//!         .send("DEV.QUEUE.1", "DEV.QUEUE.2", "ping", &Properties::new(), false)
//!         .await
//! }
//! ```

pub use crate::{
    client::Client,
    config::ConnectionParams,
    error::{BridgeError, Result},
    ids::{CorrelationId, MessageId},
    message::{Payload, Properties, ReceiveOutcome},
    transport::Transport,
};
