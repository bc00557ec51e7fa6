//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::decode::DuplicateKeys;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Router behavior.
    pub router: RouterConfig,

    /// CORS policy for the query API.
    pub cors: CorsConfig,

    /// Referer policy for the pixel beacon.
    pub referer: RefererConfig,

    /// API token policy for the query API.
    pub auth: AuthConfig,

    /// User-agent deny-list.
    pub bot_filter: BotFilterConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Key-value store settings.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// How long shutdown waits for deferred work, in seconds.
    pub drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            drain_secs: 10,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024, // 64KB
        }
    }
}

/// Router configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Install the request-meta middleware (request id, powered-by, duration).
    pub extended: bool,

    /// Tie-break for repeated query/cookie keys.
    pub duplicate_keys: DuplicateKeys,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            extended: true,
            duplicate_keys: DuplicateKeys::default(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable the CORS middleware on `/posts`.
    pub enabled: bool,

    /// Allowed origins (exact match, e.g. "https://example.com").
    pub origins: Vec<String>,

    /// Allowed methods; empty means `GET, OPTIONS`.
    pub methods: Vec<String>,

    /// Allowed request headers; empty means `content-type, x-api-token`.
    pub headers: Vec<String>,

    /// Value of `Access-Control-Allow-Credentials`.
    pub credentials: bool,

    /// Preflight cache lifetime; 0 or above 86400 means 300.
    pub max_age_secs: u64,

    /// `Vary` entries; empty means `Origin, Accept-Encoding`.
    pub vary: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["http://localhost:3000".to_string()],
            methods: Vec::new(),
            headers: Vec::new(),
            credentials: true,
            max_age_secs: 300,
            vary: Vec::new(),
        }
    }
}

/// Referer check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefererConfig {
    /// Enable the referer check on `/view.png`.
    pub enabled: bool,

    /// Allowed origins.
    pub origins: Vec<String>,
}

impl Default for RefererConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// API token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Enable the token check on `/posts`.
    pub enabled: bool,

    /// Expected value of `x-api-token`.
    pub api_token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_token: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// User-agent deny-list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotFilterConfig {
    /// Enable the user-agent check on `/`.
    pub enabled: bool,

    /// Case-insensitive markers; a user agent containing any is rejected.
    pub blocked_agents: Vec<String>,
}

impl Default for BotFilterConfig {
    fn default() -> Self {
        let blocked_agents = [
            "bot", "curl", "crawl", "slurp", "spider", "crawler", "python", "go-http", "wget",
            "libwww", "java", "httpclient", "http_request2", "php", "node", "headless",
            "phantomjs", "selenium", "postman", "yeti", "fasthttp",
        ];

        Self {
            enabled: true,
            blocked_agents: blocked_agents.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of cached aggregate responses in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Default and maximum page size for listings.
    pub list_limit: usize,

    /// Expiry for recorded page views; `None` keeps them forever.
    pub view_ttl_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            list_limit: 1000,
            view_ttl_secs: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
