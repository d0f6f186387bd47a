//! Network configuration types for the gateway.

/// Top-level network configuration for the gateway.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Route prefix for dispatch; calls are served at `{api_prefix}/{*path}`.
    pub api_prefix: String,
}

impl NetworkConfig {
    /// The dispatch route pattern, e.g. `/api/{*path}`.
    #[must_use]
    pub fn dispatch_route(&self) -> String {
        let prefix = self.api_prefix.trim_end_matches('/');
        format!("{prefix}/{{*path}}")
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 1024 * 1024,
            api_prefix: "/api".to_string(),
        }
    }
}
