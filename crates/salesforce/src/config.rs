//! Connection settings for the Salesforce client.

pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";
pub const DEFAULT_API_VERSION: &str = "v60.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DESCRIBE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesforceConfig {
    /// OAuth host used for token refresh and revocation.
    pub login_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// REST API version segment, e.g. `v60.0`.
    pub api_version: String,
    pub request_timeout_secs: u64,
    /// Lifetime of cached describe and object-catalog responses.
    pub describe_ttl_secs: u64,
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            describe_ttl_secs: DEFAULT_DESCRIBE_TTL_SECS,
        }
    }
}

impl SalesforceConfig {
    /// Defaults overridden by `SFSYNC_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            login_url: env_string("SFSYNC_LOGIN_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.login_url),
            client_id: env_string("SFSYNC_CLIENT_ID").unwrap_or(defaults.client_id),
            client_secret: env_string("SFSYNC_CLIENT_SECRET").unwrap_or(defaults.client_secret),
            api_version: env_string("SFSYNC_API_VERSION")
                .map(|v| normalize_api_version(&v))
                .unwrap_or(defaults.api_version),
            request_timeout_secs: env_string("SFSYNC_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.request_timeout_secs),
            describe_ttl_secs: defaults.describe_ttl_secs,
        }
    }

    /// `/services/data/<version>` prefix for REST paths.
    pub fn data_path(&self) -> String {
        format!("/services/data/{}", normalize_api_version(&self.api_version))
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts `60.0` or `v60.0`.
fn normalize_api_version(version: &str) -> String {
    let version = version.trim();
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{}", version)
    }
}
