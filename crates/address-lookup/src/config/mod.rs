use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub postcode_api: PostcodeApiSettings,
    pub lookup: AddressLookupConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let postcode_api = PostcodeApiSettings::from_env()?;
        let lookup = AddressLookupConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            postcode_api,
            lookup,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection settings for the upstream postcode service.
#[derive(Debug, Clone)]
pub struct PostcodeApiSettings {
    pub hostname: String,
    pub authorization: Option<String>,
    pub lookup_path: String,
    pub validate_path: String,
    pub timeout: Duration,
}

impl Default for PostcodeApiSettings {
    fn default() -> Self {
        Self {
            hostname: "https://postcodeinfo.service.justice.gov.uk".to_string(),
            authorization: None,
            lookup_path: "addresses".to_string(),
            validate_path: "postcodes".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl PostcodeApiSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let hostname = env::var("POSTCODE_API_HOSTNAME").unwrap_or(defaults.hostname);
        let authorization = env::var("POSTCODE_API_AUTHORIZATION").ok();
        let timeout = match env::var("POSTCODE_API_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| ConfigError::InvalidTimeout)?;
                Duration::from_secs(secs)
            }
            Err(_) => defaults.timeout,
        };

        Ok(Self {
            hostname,
            authorization,
            lookup_path: defaults.lookup_path,
            validate_path: defaults.validate_path,
            timeout,
        })
    }
}

/// Per-flow settings: the session namespace, the optional country allow-list,
/// and the postcode prefixes the lookup service has no coverage for.
#[derive(Debug, Clone)]
pub struct AddressLookupConfig {
    pub address_key: String,
    pub allowed_countries: Vec<String>,
    pub unsupported_prefixes: Vec<String>,
    pub messages: FlowMessages,
}

impl AddressLookupConfig {
    pub fn new(address_key: impl Into<String>) -> Result<Self, ConfigError> {
        let address_key = address_key.into();
        if address_key.trim().is_empty() {
            return Err(ConfigError::MissingAddressKey);
        }

        Ok(Self {
            address_key,
            allowed_countries: Vec::new(),
            unsupported_prefixes: vec!["BT".to_string()],
            messages: FlowMessages::default(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let address_key = env::var("ADDRESS_KEY").map_err(|_| ConfigError::MissingAddressKey)?;
        let mut config = Self::new(address_key)?;

        if let Ok(raw) = env::var("ALLOWED_COUNTRIES") {
            config.allowed_countries = raw
                .split(',')
                .map(|country| country.trim().to_string())
                .filter(|country| !country.is_empty())
                .collect();
        }

        Ok(config)
    }

    pub fn with_allowed_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_countries = countries.into_iter().map(Into::into).collect();
        self
    }
}

/// User-facing strings the host wizard renders; overridable per flow instead
/// of living as module-level defaults.
#[derive(Debug, Clone)]
pub struct FlowMessages {
    pub postcode_label: String,
    pub change_link: String,
    pub cant_find_link: String,
    pub not_found: String,
    pub cant_connect: String,
}

impl Default for FlowMessages {
    fn default() -> Self {
        Self {
            postcode_label: "Postcode".to_string(),
            change_link: "Change".to_string(),
            cant_find_link: "I can't find the address in the list".to_string(),
            not_found:
                "Sorry \u{2013} we couldn\u{2019}t find any addresses for that postcode, enter your address manually"
                    .to_string(),
            cant_connect:
                "Sorry \u{2013} we couldn\u{2019}t connect to the postcode lookup service at this time, enter your address manually"
                    .to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    MissingAddressKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "POSTCODE_API_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::MissingAddressKey => {
                write!(f, "an address key must be provided to namespace session state")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
