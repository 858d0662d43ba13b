//! Tracing configuration for bridge operations.
//!
//! [`TracingConfig`] controls the level each operation's span is created at
//! and whether per-operation elapsed-time events are recorded.

use tracing::Level;

/// Controls tracing span levels and per-operation timing.
///
/// By default the lifecycle operations (`connect`, `disconnect`) emit spans
/// at `INFO` level and the messaging operations (`send`, `receive`,
/// `simulate`) at `DEBUG`. Timing is disabled for all operations.
///
/// When timing is enabled for an operation, an event recording
/// `elapsed_us` is emitted inside its span when the operation completes.
///
/// # Examples
///
/// ```
/// use mqbridge::TracingConfig;
/// use tracing::Level;
///
/// let config = TracingConfig::default()
///     .with_receive_timing(true)
///     .with_all_levels(Level::TRACE);
/// let _ = config;
/// ```
#[expect(
    clippy::struct_excessive_bools,
    reason = "five independent on/off timing flags, one per operation"
)]
#[derive(Clone, Debug)]
pub struct TracingConfig {
    pub(crate) connect_level: Level,
    pub(crate) send_level: Level,
    pub(crate) receive_level: Level,
    pub(crate) simulate_level: Level,
    pub(crate) disconnect_level: Level,
    pub(crate) connect_timing: bool,
    pub(crate) send_timing: bool,
    pub(crate) receive_timing: bool,
    pub(crate) simulate_timing: bool,
    pub(crate) disconnect_timing: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            connect_level: Level::INFO,
            send_level: Level::DEBUG,
            receive_level: Level::DEBUG,
            simulate_level: Level::DEBUG,
            disconnect_level: Level::INFO,
            connect_timing: false,
            send_timing: false,
            receive_timing: false,
            simulate_timing: false,
            disconnect_timing: false,
        }
    }
}

impl TracingConfig {
    /// Set the tracing level for connection establishment.
    #[must_use]
    pub fn with_connect_level(mut self, level: Level) -> Self {
        self.connect_level = level;
        self
    }

    /// Enable or disable timing for connection establishment.
    #[must_use]
    pub fn with_connect_timing(mut self, enabled: bool) -> Self {
        self.connect_timing = enabled;
        self
    }

    /// Set the tracing level for sends.
    #[must_use]
    pub fn with_send_level(mut self, level: Level) -> Self {
        self.send_level = level;
        self
    }

    /// Enable or disable timing for sends.
    #[must_use]
    pub fn with_send_timing(mut self, enabled: bool) -> Self {
        self.send_timing = enabled;
        self
    }

    /// Set the tracing level for receives.
    #[must_use]
    pub fn with_receive_level(mut self, level: Level) -> Self {
        self.receive_level = level;
        self
    }

    /// Enable or disable timing for receives.
    ///
    /// The recorded time includes the wait for a matching message.
    #[must_use]
    pub fn with_receive_timing(mut self, enabled: bool) -> Self {
        self.receive_timing = enabled;
        self
    }

    /// Set the tracing level for reply simulation.
    #[must_use]
    pub fn with_simulate_level(mut self, level: Level) -> Self {
        self.simulate_level = level;
        self
    }

    /// Enable or disable timing for reply simulation.
    #[must_use]
    pub fn with_simulate_timing(mut self, enabled: bool) -> Self {
        self.simulate_timing = enabled;
        self
    }

    /// Set the tracing level for disconnects.
    #[must_use]
    pub fn with_disconnect_level(mut self, level: Level) -> Self {
        self.disconnect_level = level;
        self
    }

    /// Enable or disable timing for disconnects.
    #[must_use]
    pub fn with_disconnect_timing(mut self, enabled: bool) -> Self {
        self.disconnect_timing = enabled;
        self
    }

    /// Set the tracing level for all operations at once.
    #[must_use]
    pub fn with_all_levels(mut self, level: Level) -> Self {
        self.connect_level = level;
        self.send_level = level;
        self.receive_level = level;
        self.simulate_level = level;
        self.disconnect_level = level;
        self
    }

    /// Enable or disable timing for all operations at once.
    #[must_use]
    pub fn with_all_timing(mut self, enabled: bool) -> Self {
        self.connect_timing = enabled;
        self.send_timing = enabled;
        self.receive_timing = enabled;
        self.simulate_timing = enabled;
        self.disconnect_timing = enabled;
        self
    }
}
