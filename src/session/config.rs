//! Connection parameters.

use std::time::Duration;

use crate::bolt::packstream::ValueMap;

/// Default client identification sent in HELLO/INIT.
pub const DEFAULT_USER_AGENT: &str = concat!("mgbolt/", env!("CARGO_PKG_VERSION"));

/// Parameters for establishing a session, built in the usual
/// `with_*` style.
///
/// ```rust
/// use mgbolt::ConnectParams;
/// use std::time::Duration;
///
/// let params = ConnectParams::new("localhost", 7687)
///     .with_basic_auth("memgraph", "secret")
///     .with_connect_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectParams {
    host: String,
    port: u16,
    user_agent: String,
    auth: ValueMap,
    routing: Option<ValueMap>,
    connect_timeout: Option<Duration>,
}

impl ConnectParams {
    /// Parameters for `host:port` with no authentication.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let mut auth = ValueMap::new();
        auth.insert_unchecked("scheme", "none");
        Self {
            host: host.into(),
            port,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth,
            routing: None,
            connect_timeout: None,
        }
    }

    /// Authenticate with a username and password.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let mut auth = ValueMap::new();
        auth.insert_unchecked("scheme", "basic");
        auth.insert_unchecked("principal", username.into());
        auth.insert_unchecked("credentials", password.into());
        self.auth = auth;
        self
    }

    /// Override the client identification string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Attach a routing context, sent on protocol versions that carry one.
    pub fn with_routing_context(mut self, routing: ValueMap) -> Self {
        self.routing = Some(routing);
        self
    }

    /// Give up on TCP connect after `timeout`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// The `host:port` address string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The client identification string.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The authentication entries.
    pub fn auth(&self) -> &ValueMap {
        &self.auth
    }

    /// The routing context, if any.
    pub fn routing(&self) -> Option<&ValueMap> {
        self.routing.as_ref()
    }

    /// The connect timeout, if any.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }
}
