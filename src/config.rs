//! Connection parameters.
//!
//! [`ConnectionParams`] identifies the queue manager and how to reach it. It
//! can be built in code, deserialized with `serde`, or read from the `MQ_*`
//! environment variables. Validation happens when the parameters are handed
//! to [`crate::ConnectionManager::initialize`], before any connect attempt.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    transport::{ConnectRequest, Credentials, TlsSettings},
};

/// Cipher specification used when TLS is configured without one.
pub const DEFAULT_CIPHER_SPEC: &str = "ANY_TLS12_OR_HIGHER";
/// Application name reported to the queue manager by default.
pub const DEFAULT_APPLICATION_NAME: &str = "mqbridge";

/// Environment variable naming the queue manager.
pub const ENV_QUEUE_MANAGER: &str = "MQ_QMGR";
/// Environment variable naming the broker host.
pub const ENV_HOST: &str = "MQ_HOST";
/// Environment variable naming the listener port.
pub const ENV_PORT: &str = "MQ_PORT";
/// Environment variable naming the server-connection channel.
pub const ENV_CHANNEL: &str = "MQ_CHANNEL";
/// Environment variable naming the user id.
pub const ENV_USER_ID: &str = "MQ_USERID";
/// Environment variable holding the password.
pub const ENV_PASSWORD: &str = "MQ_PASSWORD";
/// Environment variable naming the TLS key repository.
pub const ENV_TLS_KEYSTORE: &str = "MQ_TLS_KEYSTORE";
/// Environment variable naming the TLS cipher specification.
pub const ENV_TLS_CIPHER_SPEC: &str = "MQ_TLS_CIPHER_SPEC";
/// Environment variable overriding the application name.
pub const ENV_APPLICATION_NAME: &str = "MQ_APPL_NAME";

fn default_cipher_spec() -> String { DEFAULT_CIPHER_SPEC.to_owned() }

fn default_application_name() -> String { DEFAULT_APPLICATION_NAME.to_owned() }

/// Parameters for connecting to a queue manager.
///
/// # Examples
///
/// ```
/// use mqbridge::ConnectionParams;
///
/// let params = ConnectionParams::new("QM1", "localhost", 1414, "DEV.APP.SVRCONN")
///     .with_credentials("app", "passw0rd");
/// assert_eq!(params.connection_name(), "localhost(1414)");
/// assert!(params.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    queue_manager: String,
    host: String,
    port: u16,
    channel: String,
    #[serde(default)]
    user_id: String,
    #[serde(default, skip_serializing)]
    password: String,
    #[serde(default)]
    tls_keystore: Option<String>,
    #[serde(default = "default_cipher_spec")]
    tls_cipher_spec: String,
    #[serde(default = "default_application_name")]
    application_name: String,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("queue_manager", &self.queue_manager)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("channel", &self.channel)
            .field("user_id", &self.user_id)
            .field("tls_keystore", &self.tls_keystore)
            .field("tls_cipher_spec", &self.tls_cipher_spec)
            .field("application_name", &self.application_name)
            .finish_non_exhaustive()
    }
}

impl ConnectionParams {
    /// Create parameters with the required fields and no credentials.
    #[must_use]
    pub fn new(
        queue_manager: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            queue_manager: queue_manager.into(),
            host: host.into(),
            port,
            channel: channel.into(),
            user_id: String::new(),
            password: String::new(),
            tls_keystore: None,
            tls_cipher_spec: default_cipher_spec(),
            application_name: default_application_name(),
        }
    }

    /// Authenticate with a user id and password.
    #[must_use]
    pub fn with_credentials(mut self, user_id: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.password = password.into();
        self
    }

    /// Use TLS with the key repository at `keystore`.
    #[must_use]
    pub fn with_tls_keystore(mut self, keystore: impl Into<String>) -> Self {
        self.tls_keystore = Some(keystore.into());
        self
    }

    /// Override the TLS cipher specification.
    #[must_use]
    pub fn with_cipher_spec(mut self, cipher_spec: impl Into<String>) -> Self {
        self.tls_cipher_spec = cipher_spec.into();
        self
    }

    /// Override the application name reported to the queue manager.
    #[must_use]
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Queue manager name.
    #[must_use]
    pub fn queue_manager(&self) -> &str { &self.queue_manager }

    /// Broker host.
    #[must_use]
    pub fn host(&self) -> &str { &self.host }

    /// Listener port.
    #[must_use]
    pub const fn port(&self) -> u16 { self.port }

    /// Server-connection channel.
    #[must_use]
    pub fn channel(&self) -> &str { &self.channel }

    /// Configured user id; empty when authentication is not used.
    #[must_use]
    pub fn user_id(&self) -> &str { &self.user_id }

    /// Configured TLS key repository.
    #[must_use]
    pub fn tls_keystore(&self) -> Option<&str> { self.tls_keystore.as_deref() }

    /// TLS cipher specification.
    #[must_use]
    pub fn cipher_spec(&self) -> &str { &self.tls_cipher_spec }

    /// Connection name in `host(port)` form.
    #[must_use]
    pub fn connection_name(&self) -> String { format!("{}({})", self.host, self.port) }

    /// Check that every required field is present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first empty required field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (ENV_QUEUE_MANAGER, self.queue_manager.trim().is_empty()),
            (ENV_HOST, self.host.trim().is_empty()),
            (ENV_PORT, self.port == 0),
            (ENV_CHANNEL, self.channel.trim().is_empty()),
        ];
        required
            .into_iter()
            .find_map(|(field, missing)| missing.then_some(ConfigError::Missing(field)))
            .map_or(Ok(()), Err)
    }

    /// Build the request handed to the transport.
    ///
    /// Credentials are only included when a user id is set and TLS only when
    /// a key repository is set.
    #[must_use]
    pub fn connect_request(&self) -> ConnectRequest {
        let credentials = (!self.user_id.is_empty()).then(|| Credentials {
            user_id: self.user_id.clone(),
            password: self.password.clone(),
        });
        let tls = self
            .tls_keystore
            .as_ref()
            .filter(|keystore| !keystore.is_empty())
            .map(|keystore| TlsSettings {
                key_repository: keystore.clone(),
                cipher_spec: self.tls_cipher_spec.clone(),
            });
        ConnectRequest {
            channel: self.channel.clone(),
            connection_name: self.connection_name(),
            application_name: self.application_name.clone(),
            client_binding: true,
            reconnect: true,
            share_handle_no_block: true,
            all_conversations_share: true,
            credentials,
            tls,
        }
    }

    /// Read parameters from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ConnectionParams::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read parameters through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// `MQ_QMGR`, `MQ_HOST`, `MQ_PORT`, `MQ_CHANNEL`, `MQ_USERID` and
    /// `MQ_PASSWORD` must be present. `MQ_TLS_KEYSTORE`,
    /// `MQ_TLS_CIPHER_SPEC` and `MQ_APPL_NAME` are optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an absent required variable and
    /// [`ConfigError::Invalid`] when `MQ_PORT` is not a port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let optional = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let queue_manager = required(ENV_QUEUE_MANAGER)?;
        let host = required(ENV_HOST)?;
        let port_text = required(ENV_PORT)?;
        let port = port_text
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid {
                field: ENV_PORT,
                value: port_text.clone(),
            })?;
        let channel = required(ENV_CHANNEL)?;
        let user_id = required(ENV_USER_ID)?;
        let password = required(ENV_PASSWORD)?;

        let mut params = Self::new(queue_manager, host, port, channel).with_credentials(user_id, password);
        if let Some(keystore) = optional(ENV_TLS_KEYSTORE) {
            params = params.with_tls_keystore(keystore);
        }
        if let Some(cipher_spec) = optional(ENV_TLS_CIPHER_SPEC) {
            params = params.with_cipher_spec(cipher_spec);
        }
        if let Some(name) = optional(ENV_APPLICATION_NAME) {
            params = params.with_application_name(name);
        }
        Ok(params)
    }
}
