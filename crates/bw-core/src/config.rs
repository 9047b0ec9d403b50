//! Configuration management
//!
//! Settings are read in this order of precedence:
//! 1. Environment variables
//! 2. `bw-gateway.toml`
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the TOML file is replaced with the variable's value.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.catapult.inetwork.com/v1";
pub const DEFAULT_CONFIG_FILE: &str = "bw-gateway.toml";

/// Credentials and endpoint of the Bandwidth REST API
#[derive(Clone, Serialize, Deserialize)]
pub struct BandwidthConfig {
    pub user_id: String,
    pub api_token: String,
    pub api_secret: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BandwidthConfig {
    pub fn new(
        user_id: impl Into<String>,
        api_token: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            api_token: api_token.into(),
            api_secret: api_secret.into(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fail when any credential is missing
    pub fn validate(&self) -> crate::Result<()> {
        let missing: Vec<&str> = [
            ("user_id", &self.user_id),
            ("api_token", &self.api_token),
            ("api_secret", &self.api_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Bandwidth credentials not set: {}",
                missing.join(", ")
            )))
        }
    }
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self::new("", "", "")
    }
}

// Keep the secret out of logs
impl std::fmt::Debug for BandwidthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandwidthConfig")
            .field("user_id", &self.user_id)
            .field("api_token", &self.api_token)
            .field("api_secret", &"***")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Application provisioned on startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_application_name")]
    pub name: String,

    /// Build callback URLs with `https` (otherwise `http`)
    #[serde(default = "default_use_https")]
    pub use_https_callbacks: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_application_name(),
            use_https_callbacks: default_use_https(),
        }
    }
}

fn default_application_name() -> String {
    "bw-gateway".to_string()
}

fn default_use_https() -> bool {
    true
}

/// Phone number allocated to the application
///
/// A local number is ordered when `area_code` is set, a toll-free one otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhoneNumberConfig {
    pub name: Option<String>,
    pub area_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

fn default_port() -> u16 {
    3000
}

/// Main configuration for bw-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bandwidth: BandwidthConfig,

    #[serde(default)]
    pub application: ApplicationConfig,

    /// Phone number to allocate (optional)
    #[serde(default)]
    pub phone_number: Option<PhoneNumberConfig>,

    /// SIP domain to provision (optional)
    #[serde(default)]
    pub domain_name: Option<String>,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Replace `${VAR_NAME}` with the variable's value (empty when unset)
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    if let Ok(env_value) = std::env::var(name) {
                        result.push_str(&env_value);
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    // unterminated, keep verbatim
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Parse TOML content (after `${VAR}` expansion)
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let toml: TomlConfig = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Ok(Self::from_toml_config(toml))
    }

    /// Load a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `bw-gateway.toml` if present, otherwise environment only
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }
        Ok(Self::from_env())
    }

    /// Configuration from environment variables and defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let bw = toml.bandwidth.unwrap_or_default();
        let bandwidth = BandwidthConfig {
            user_id: bw.user_id.unwrap_or_default(),
            api_token: bw.api_token.unwrap_or_default(),
            api_secret: bw.api_secret.unwrap_or_default(),
            base_url: bw.base_url.unwrap_or_else(default_base_url),
            timeout_secs: bw.timeout_secs.unwrap_or_else(default_timeout_secs),
        };

        let app = toml.application.unwrap_or_default();
        let application = ApplicationConfig {
            name: app.name.unwrap_or_else(default_application_name),
            use_https_callbacks: app.use_https_callbacks.unwrap_or_else(default_use_https),
        };

        let phone_number = toml.phone_number.map(|p| PhoneNumberConfig {
            name: p.name,
            area_code: p.area_code,
        });

        let domain_name = toml.domain.and_then(|d| d.name).filter(|n| !n.is_empty());

        let server = ServerConfig {
            port: toml
                .server
                .and_then(|s| s.port)
                .unwrap_or_else(default_port),
        };

        Config {
            bandwidth,
            application,
            phone_number,
            domain_name,
            server,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = non_empty_env("BANDWIDTH_USER_ID") {
            self.bandwidth.user_id = v;
        }
        if let Some(v) = non_empty_env("BANDWIDTH_API_TOKEN") {
            self.bandwidth.api_token = v;
        }
        if let Some(v) = non_empty_env("BANDWIDTH_API_SECRET") {
            self.bandwidth.api_secret = v;
        }
        if let Some(v) = non_empty_env("BANDWIDTH_BASE_URL") {
            self.bandwidth.base_url = v;
        }

        if let Some(v) = non_empty_env("BANDWIDTH_APPLICATION_NAME") {
            self.application.name = v;
        }
        if let Some(v) = non_empty_env("BANDWIDTH_USE_HTTPS") {
            self.application.use_https_callbacks = v.to_lowercase() != "false";
        }

        if let Some(v) = non_empty_env("BANDWIDTH_DOMAIN_NAME") {
            self.domain_name = Some(v);
        }

        if let Some(name) = non_empty_env("BANDWIDTH_PHONE_NUMBER_NAME") {
            self.phone_number.get_or_insert_with(Default::default).name = Some(name);
        }
        if let Some(area_code) = non_empty_env("BANDWIDTH_AREA_CODE") {
            self.phone_number.get_or_insert_with(Default::default).area_code = Some(area_code);
        }
        if let Some(v) = non_empty_env("BANDWIDTH_TOLL_FREE") {
            if v.to_lowercase() != "false" {
                self.phone_number.get_or_insert_with(Default::default).area_code = None;
            }
        }

        if let Some(port) = non_empty_env("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ============================================================================
// TOML file layout
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    bandwidth: Option<TomlBandwidthConfig>,
    application: Option<TomlApplicationConfig>,
    phone_number: Option<TomlPhoneNumberConfig>,
    domain: Option<TomlDomainConfig>,
    server: Option<TomlServerConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlBandwidthConfig {
    user_id: Option<String>,
    api_token: Option<String>,
    api_secret: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlApplicationConfig {
    name: Option<String>,
    use_https_callbacks: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlPhoneNumberConfig {
    name: Option<String>,
    area_code: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDomainConfig {
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlServerConfig {
    port: Option<u16>,
}
