//! Channel configuration loaded from a channel profile document.
//!
//! The hub hands every operation a channel profile: settings that describe
//! which iQmetrix environment and subscription lists to use, plus the auth
//! values for the company and location being integrated.
//!
//! # Profile Shape
//!
//! ```json
//! {
//!   "channelSettingsValues": {
//!     "protocol": "https",
//!     "environment": "demo",
//!     "canPostInvoice": "SalesOrders",
//!     "subscriptionLists": [{ "listId": "...", "supplierId": 7187 }]
//!   },
//!   "channelAuthValues": {
//!     "company_id": "1234",
//!     "location_id": "5678",
//!     "access_token": "..."
//!   },
//!   "paymentCaptureBusinessReferences": ["invoiceNumber"],
//!   "salesOrderBusinessReferences": ["dropshipOrderItems.0.dropshipOrderId"]
//! }
//! ```
//!
//! # Environment Variables
//!
//! ## Required (for `from_env`)
//! - `DROPSHIP_CHANNEL_PROFILE` - Path to the channel profile JSON file
//!
//! ## Optional
//! - `DROPSHIP_REQUEST_TIMEOUT_SECS` - Vendor request timeout (default: 30)
//! - `DROPSHIP_RATE_LIMIT_SLEEP_SECS` - Sleep before retrying a throttled request
//! - `DROPSHIP_MAX_CONCURRENCY` - Parallel vendor requests per fan-out (default: 10)

use std::path::{Path, PathBuf};
use std::time::Duration;

use iqmetrix_dropship_core::SubscriptionList;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::document::{is_integer, is_non_empty_array, is_non_empty_object, is_non_empty_string};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENCY: usize = 10;
const DEFAULT_BASE_URL_TEMPLATE: &str = "{protocol}://{service}{environment}.iqmetrix.net";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ChannelProfile validation failed: {}", format_errors(.0))]
    InvalidProfile(Vec<String>),
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Failed to read channel profile {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse channel profile: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid base URL for service '{service}': {reason}")]
    InvalidBaseUrl { service: String, reason: String },
    #[error(
        "paymentCaptureBusinessReferences and salesOrderBusinessReferences must be configured in the channel profile"
    )]
    MissingBusinessReferences,
}

fn format_errors(errors: &[String]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| errors.join("; "))
}

/// Business reference paths for payment capture results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessReferences {
    pub payment_capture: Vec<String>,
    pub sales_order: Vec<String>,
}

impl BusinessReferences {
    /// Whether both path lists are configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.payment_capture.is_empty() && !self.sales_order.is_empty()
    }
}

/// Validated channel configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ChannelConfig {
    /// URL scheme for vendor services (e.g., https)
    pub protocol: String,
    /// Environment suffix appended to service host names (may be empty)
    pub environment: String,
    /// Catalog source lists this integration is subscribed to
    pub subscription_lists: Vec<SubscriptionList>,
    /// Sales order endpoint segment (`canPostInvoice`)
    pub sales_order_endpoint: String,
    /// iQmetrix company id
    pub company_id: String,
    /// iQmetrix location (entity) id used for pricing and fulfillment
    pub location_id: String,
    /// Bearer token for every vendor request
    pub access_token: SecretString,
    /// Base URL template with `{protocol}`, `{service}` and `{environment}` placeholders
    pub base_url_template: String,
    /// Sleep before retrying a throttled request (no retry when unset)
    pub rate_limit_sleep: Option<Duration>,
    /// Timeout for each vendor request
    pub request_timeout: Duration,
    /// Maximum parallel vendor requests per fan-out
    pub max_concurrency: usize,
    /// Business reference paths for payment captures
    pub business_references: BusinessReferences,
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("protocol", &self.protocol)
            .field("environment", &self.environment)
            .field("subscription_lists", &self.subscription_lists)
            .field("sales_order_endpoint", &self.sales_order_endpoint)
            .field("company_id", &self.company_id)
            .field("location_id", &self.location_id)
            .field("access_token", &"[REDACTED]")
            .field("base_url_template", &self.base_url_template)
            .field("rate_limit_sleep", &self.rate_limit_sleep)
            .field("request_timeout", &self.request_timeout)
            .field("max_concurrency", &self.max_concurrency)
            .field("business_references", &self.business_references)
            .finish()
    }
}

impl ChannelConfig {
    /// Validate a channel profile document.
    ///
    /// Every failed rule is collected so the hub sees the complete list.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidProfile` when any rule fails.
    pub fn from_profile(profile: &Value) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();

        let settings = required_object(profile, "channelSettingsValues", &mut errors);
        let auth = required_object(profile, "channelAuthValues", &mut errors);

        let mut protocol = String::new();
        let mut environment = String::new();
        let mut sales_order_endpoint = String::new();
        let mut subscription_lists = Vec::new();
        let mut base_url_template = DEFAULT_BASE_URL_TEMPLATE.to_string();
        let mut rate_limit_sleep = None;
        let mut request_timeout = Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS);
        let mut max_concurrency = DEFAULT_MAX_CONCURRENCY;

        if let Some(settings) = settings {
            protocol = required_string(settings, "channelSettingsValues", "protocol", &mut errors);
            sales_order_endpoint =
                required_string(settings, "channelSettingsValues", "canPostInvoice", &mut errors);

            match settings.get("environment") {
                None | Some(Value::Null) => {
                    errors.push("The channelProfile.channelSettingsValues.environment string is missing.".to_string());
                }
                Some(Value::String(env)) => environment = env.trim().to_string(),
                Some(_) => {
                    errors.push("The channelProfile.channelSettingsValues.environment string is invalid.".to_string());
                }
            }

            subscription_lists = parse_subscription_lists(settings.get("subscriptionLists"), &mut errors);

            if let Some(template) = settings.get("baseUrlTemplate") {
                match template.as_str() {
                    Some(t) if is_non_empty_string(template) => base_url_template = t.to_string(),
                    _ => errors.push("The channelProfile.channelSettingsValues.baseUrlTemplate string is invalid.".to_string()),
                }
            }
            if let Some(secs) = optional_seconds(settings, "rateLimitSleepSeconds", &mut errors) {
                rate_limit_sleep = Some(Duration::from_secs(secs));
            }
            if let Some(secs) = optional_seconds(settings, "requestTimeoutSeconds", &mut errors) {
                request_timeout = Duration::from_secs(secs);
            }
            if let Some(n) = optional_seconds(settings, "maxConcurrency", &mut errors) {
                if n == 0 {
                    errors.push("The channelProfile.channelSettingsValues.maxConcurrency number is invalid.".to_string());
                } else {
                    max_concurrency = usize::try_from(n).unwrap_or(DEFAULT_MAX_CONCURRENCY);
                }
            }
        }

        let mut company_id = String::new();
        let mut location_id = String::new();
        let mut access_token = String::new();
        if let Some(auth) = auth {
            company_id = required_string(auth, "channelAuthValues", "company_id", &mut errors);
            location_id = required_string(auth, "channelAuthValues", "location_id", &mut errors);
            access_token = required_string(auth, "channelAuthValues", "access_token", &mut errors);
        }

        let business_references = BusinessReferences {
            payment_capture: optional_string_array(profile, "paymentCaptureBusinessReferences", &mut errors),
            sales_order: optional_string_array(profile, "salesOrderBusinessReferences", &mut errors),
        };

        if !errors.is_empty() {
            return Err(ConfigError::InvalidProfile(errors));
        }

        warn_if_placeholder(&access_token);

        Ok(Self {
            protocol,
            environment,
            subscription_lists,
            sales_order_endpoint,
            company_id,
            location_id,
            access_token: SecretString::from(access_token),
            base_url_template,
            rate_limit_sleep,
            request_timeout,
            max_concurrency,
            business_references,
        })
    }

    /// Load the profile named by `DROPSHIP_CHANNEL_PROFILE` and apply
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the variable is missing, the file cannot be
    /// read or parsed, the profile is invalid, or an override is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let path = get_required_env("DROPSHIP_CHANNEL_PROFILE")?;
        let mut config = Self::from_path(Path::new(&path))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load and validate a profile from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let profile: Value = serde_json::from_str(&raw)?;
        Self::from_profile(&profile)
    }

    /// Apply `DROPSHIP_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` when an override is not a
    /// positive integer.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(secs) = get_optional_u64("DROPSHIP_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = get_optional_u64("DROPSHIP_RATE_LIMIT_SLEEP_SECS")? {
            self.rate_limit_sleep = Some(Duration::from_secs(secs));
        }
        if let Some(n) = get_optional_u64("DROPSHIP_MAX_CONCURRENCY")? {
            self.max_concurrency = usize::try_from(n).map_err(|e| {
                ConfigError::InvalidEnvVar("DROPSHIP_MAX_CONCURRENCY".to_string(), e.to_string())
            })?;
        }
        Ok(())
    }

    /// Base URL for a vendor service.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` when the service name is empty or
    /// the expanded template is not a valid URL.
    pub fn base_url(&self, service: &str) -> Result<Url, ConfigError> {
        if service.trim().is_empty() {
            return Err(ConfigError::InvalidBaseUrl {
                service: service.to_string(),
                reason: "service name is empty".to_string(),
            });
        }

        let expanded = self
            .base_url_template
            .replace("{protocol}", &self.protocol)
            .replace("{service}", service)
            .replace("{environment}", &self.environment);

        Url::parse(&expanded).map_err(|e| ConfigError::InvalidBaseUrl {
            service: service.to_string(),
            reason: e.to_string(),
        })
    }

    /// Supplier ids across every subscription list, first-seen order.
    #[must_use]
    pub fn supplier_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for list in &self.subscription_lists {
            let id = list.supplier_id.as_i64();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Payment capture business references, or an error when not configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingBusinessReferences` when either list is empty.
    pub fn require_business_references(&self) -> Result<&BusinessReferences, ConfigError> {
        if self.business_references.is_configured() {
            Ok(&self.business_references)
        } else {
            Err(ConfigError::MissingBusinessReferences)
        }
    }

    pub(crate) fn expose_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

// =============================================================================
// Profile Validation Helpers
// =============================================================================

fn required_object<'a>(
    profile: &'a Value,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    match profile.get(key) {
        None | Some(Value::Null) => {
            errors.push(format!("The channelProfile.{key} object is missing."));
            None
        }
        Some(value) if is_non_empty_object(value) => value.as_object(),
        Some(_) => {
            errors.push(format!("The channelProfile.{key} object is invalid."));
            None
        }
    }
}

fn required_string(
    parent: &Map<String, Value>,
    parent_key: &str,
    key: &str,
    errors: &mut Vec<String>,
) -> String {
    match parent.get(key) {
        None | Some(Value::Null) => {
            errors.push(format!("The channelProfile.{parent_key}.{key} string is missing."));
            String::new()
        }
        Some(value) if is_non_empty_string(value) => value.as_str().unwrap_or_default().to_string(),
        Some(_) => {
            errors.push(format!("The channelProfile.{parent_key}.{key} string is invalid."));
            String::new()
        }
    }
}

fn parse_subscription_lists(value: Option<&Value>, errors: &mut Vec<String>) -> Vec<SubscriptionList> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        errors.push("The channelProfile.channelSettingsValues.subscriptionLists array is missing.".to_string());
        return Vec::new();
    };
    if !is_non_empty_array(value) {
        errors.push("The channelProfile.channelSettingsValues.subscriptionLists array is invalid.".to_string());
        return Vec::new();
    }

    let entries = value.as_array().map(Vec::as_slice).unwrap_or_default();
    let mut lists = Vec::with_capacity(entries.len());
    for entry in entries {
        let list_id = entry.get("listId").filter(|v| is_non_empty_string(v)).and_then(Value::as_str);
        let supplier_id = entry.get("supplierId").filter(|v| is_integer(v)).and_then(as_integral_i64);
        match (list_id, supplier_id) {
            (Some(list_id), Some(supplier_id)) => lists.push(SubscriptionList::new(list_id, supplier_id)),
            _ => {
                errors.push(
                    "Every object in the subscriptionLists array must have both a listId and a supplierId."
                        .to_string(),
                );
                return Vec::new();
            }
        }
    }
    lists
}

#[allow(clippy::cast_possible_truncation)] // is_integer guarantees an integral value
fn as_integral_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn optional_seconds(settings: &Map<String, Value>, key: &str, errors: &mut Vec<String>) -> Option<u64> {
    let value = settings.get(key).filter(|v| !v.is_null())?;
    let parsed = value.as_u64();
    if parsed.is_none() {
        errors.push(format!("The channelProfile.channelSettingsValues.{key} number is invalid."));
    }
    parsed
}

fn optional_string_array(profile: &Value, key: &str, errors: &mut Vec<String>) -> Vec<String> {
    let Some(value) = profile.get(key).filter(|v| !v.is_null()) else {
        return Vec::new();
    };
    let strings = value.as_array().and_then(|items| {
        items
            .iter()
            .map(|v| v.as_str().map(ToString::to_string))
            .collect::<Option<Vec<_>>>()
    });
    strings.unwrap_or_else(|| {
        errors.push(format!("The channelProfile.{key} array is invalid."));
        Vec::new()
    })
}

fn warn_if_placeholder(token: &str) {
    let lower = token.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        tracing::warn!(
            pattern = %pattern,
            "channelAuthValues.access_token appears to be a placeholder"
        );
    }
}

// =============================================================================
// Environment Helpers
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an optional environment variable parsed as a positive integer.
fn get_optional_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    get_optional_env(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
                .and_then(|n| {
                    if n == 0 {
                        Err(ConfigError::InvalidEnvVar(key.to_string(), "must be greater than zero".to_string()))
                    } else {
                        Ok(n)
                    }
                })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn profile() -> Value {
        json!({
            "channelSettingsValues": {
                "protocol": "https",
                "environment": " demo ",
                "canPostInvoice": "SalesOrders",
                "subscriptionLists": [
                    {"listId": "list-a", "supplierId": 7187},
                    {"listId": "list-b", "supplierId": 188979}
                ]
            },
            "channelAuthValues": {
                "company_id": "13149",
                "location_id": "13150",
                "access_token": "b3JkZXJzOnJlYWQ6MTM1NDk"
            },
            "paymentCaptureBusinessReferences": ["invoiceNumber"],
            "salesOrderBusinessReferences": ["dropshipOrderItems.0.dropshipOrderId"]
        })
    }

    pub(crate) fn config() -> ChannelConfig {
        ChannelConfig::from_profile(&profile()).unwrap()
    }

    #[test]
    fn test_valid_profile() {
        let config = config();
        assert_eq!(config.protocol, "https");
        assert_eq!(config.environment, "demo");
        assert_eq!(config.sales_order_endpoint, "SalesOrders");
        assert_eq!(config.subscription_lists.len(), 2);
        assert_eq!(config.subscription_lists[1].supplier_id.as_i64(), 188_979);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrency, 10);
        assert!(config.rate_limit_sleep.is_none());
        assert!(config.business_references.is_configured());
    }

    #[test]
    fn test_missing_sections() {
        let err = ChannelConfig::from_profile(&json!({})).unwrap_err();
        let ConfigError::InvalidProfile(errors) = err else {
            panic!("expected InvalidProfile");
        };
        assert_eq!(
            errors,
            vec![
                "The channelProfile.channelSettingsValues object is missing.",
                "The channelProfile.channelAuthValues object is missing.",
            ]
        );
    }

    #[test]
    fn test_collects_every_error() {
        let mut profile = profile();
        profile["channelSettingsValues"]["protocol"] = json!("");
        profile["channelSettingsValues"]["environment"] = json!(5);
        profile["channelAuthValues"] = json!({"company_id": "1"});
        let ConfigError::InvalidProfile(errors) = ChannelConfig::from_profile(&profile).unwrap_err() else {
            panic!("expected InvalidProfile");
        };
        assert!(errors.contains(&"The channelProfile.channelSettingsValues.protocol string is invalid.".to_string()));
        assert!(errors.contains(&"The channelProfile.channelSettingsValues.environment string is invalid.".to_string()));
        assert!(errors.contains(&"The channelProfile.channelAuthValues.location_id string is missing.".to_string()));
        assert!(errors.contains(&"The channelProfile.channelAuthValues.access_token string is missing.".to_string()));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_empty_environment_is_allowed() {
        let mut profile = profile();
        profile["channelSettingsValues"]["environment"] = json!("");
        let config = ChannelConfig::from_profile(&profile).unwrap();
        assert_eq!(config.base_url("crm").unwrap().as_str(), "https://crm.iqmetrix.net/");
    }

    #[test]
    fn test_subscription_list_entries() {
        let mut profile = profile();
        profile["channelSettingsValues"]["subscriptionLists"] = json!([{"listId": "a"}]);
        let err = ChannelConfig::from_profile(&profile).unwrap_err();
        assert!(err.to_string().contains("must have both a listId and a supplierId"));

        profile["channelSettingsValues"]["subscriptionLists"] = json!([]);
        let err = ChannelConfig::from_profile(&profile).unwrap_err();
        assert!(err.to_string().contains("subscriptionLists array is invalid"));

        profile["channelSettingsValues"]["subscriptionLists"] = json!([{"listId": "a", "supplierId": 12.0}]);
        let config = ChannelConfig::from_profile(&profile).unwrap();
        assert_eq!(config.subscription_lists[0].supplier_id.as_i64(), 12);

        profile["channelSettingsValues"]["subscriptionLists"] = json!([{"listId": "a", "supplierId": 12.5}]);
        assert!(ChannelConfig::from_profile(&profile).is_err());
    }

    #[test]
    fn test_base_url() {
        let config = config();
        assert_eq!(config.base_url("catalogs").unwrap().as_str(), "https://catalogsdemo.iqmetrix.net/");
        assert!(matches!(config.base_url(" "), Err(ConfigError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn test_base_url_template() {
        let mut profile = profile();
        profile["channelSettingsValues"]["baseUrlTemplate"] = json!("http://127.0.0.1:8080/{service}");
        let config = ChannelConfig::from_profile(&profile).unwrap();
        assert_eq!(config.base_url("order").unwrap().as_str(), "http://127.0.0.1:8080/order");
    }

    #[test]
    fn test_supplemental_settings() {
        let mut profile = profile();
        profile["channelSettingsValues"]["rateLimitSleepSeconds"] = json!(2);
        profile["channelSettingsValues"]["requestTimeoutSeconds"] = json!(5);
        profile["channelSettingsValues"]["maxConcurrency"] = json!(3);
        let config = ChannelConfig::from_profile(&profile).unwrap();
        assert_eq!(config.rate_limit_sleep, Some(Duration::from_secs(2)));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_concurrency, 3);

        profile["channelSettingsValues"]["maxConcurrency"] = json!(0);
        assert!(ChannelConfig::from_profile(&profile).is_err());
    }

    #[test]
    fn test_business_references_optional() {
        let mut profile = profile();
        profile.as_object_mut().unwrap().remove("salesOrderBusinessReferences");
        let config = ChannelConfig::from_profile(&profile).unwrap();
        assert!(matches!(
            config.require_business_references(),
            Err(ConfigError::MissingBusinessReferences)
        ));

        profile["paymentCaptureBusinessReferences"] = json!([1, 2]);
        assert!(ChannelConfig::from_profile(&profile).is_err());
    }

    #[test]
    fn test_supplier_ids_unique() {
        let mut profile = profile();
        profile["channelSettingsValues"]["subscriptionLists"] = json!([
            {"listId": "a", "supplierId": 1},
            {"listId": "b", "supplierId": 1},
            {"listId": "c", "supplierId": 2}
        ]);
        let config = ChannelConfig::from_profile(&profile).unwrap();
        assert_eq!(config.supplier_ids(), vec![1, 2]);
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", config());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("b3JkZXJzOnJlYWQ6MTM1NDk"));
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidProfile(vec!["a".to_string()]);
        assert_eq!(err.to_string(), r#"ChannelProfile validation failed: ["a"]"#);
    }
}
