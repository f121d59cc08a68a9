use crate::error::MixpanelError;
use mixpanel_agent_common_api::{Payload, Value, ValueExt};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const MIXPANEL_API_KEY_ENV: &str = "MIXPANEL_API_KEY";
pub const MIXPANEL_SECRET_KEY_ENV: &str = "MIXPANEL_SECRET_KEY";

pub const DEFAULT_API_URL: &str = "https://mixpanel.com/api/2.0";
pub const DEFAULT_DATA_API_URL: &str = "https://data.mixpanel.com/api/2.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Lookback window used when `time` is not set.
pub const DEFAULT_TIME: u64 = 24;

/// The time unit of the Mixpanel buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Minute,
    #[default]
    Hour,
    Day,
    Month,
    Year,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute => "minute",
            Interval::Hour => "hour",
            Interval::Day => "day",
            Interval::Month => "month",
            Interval::Year => "year",
        }
    }
}

/// The options of a single Mixpanel agent instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixpanelOptions {
    /// The name of the Mixpanel event to count
    #[serde(default)]
    pub event_name: String,

    /// The event property used as filter. It must be set together with `value`.
    #[serde(default)]
    pub property: Option<String>,

    /// The value the `property` must have. It must be set together with `property`.
    #[serde(default)]
    pub value: Option<Value>,

    /// The lookback window, expressed in `interval` units. Default is 24
    #[serde(default)]
    pub time: Option<u64>,

    /// The time unit of the lookback window. Default is `hour`
    #[serde(default)]
    pub interval: Option<Interval>,

    /// One of `unique`, `general` or `average`. Default is `general`
    #[serde(default, rename = "type")]
    pub query_type: Option<String>,

    /// Per-instance API key; overrides the one of the client configuration
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-instance API secret; overrides the one of the client configuration
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl Default for MixpanelOptions {
    fn default() -> Self {
        MixpanelOptions {
            event_name: "Page Visit".to_owned(),
            property: Some("Page".to_owned()),
            value: Some(Value::String("home".to_owned())),
            time: Some(DEFAULT_TIME),
            interval: Some(Interval::Hour),
            query_type: None,
            api_key: None,
            secret_key: None,
        }
    }
}

impl MixpanelOptions {
    /// Builds the options from the key/value mapping supplied by the host.
    pub fn from_payload(payload: &Payload) -> Result<MixpanelOptions, MixpanelError> {
        serde_json::from_value(Value::Object(payload.clone())).map_err(|err| {
            MixpanelError::ValidationError { message: format!("Invalid options: {}", err) }
        })
    }

    /// Returns the property filter, if both `property` and `value` are present.
    pub fn property_filter(&self) -> Option<(&str, &Value)> {
        match (self.present_property(), self.present_value()) {
            (Some(property), Some(value)) => Some((property, value)),
            _ => None,
        }
    }

    pub fn time(&self) -> u64 {
        self.time.unwrap_or(DEFAULT_TIME)
    }

    pub fn interval(&self) -> Interval {
        self.interval.unwrap_or_default()
    }

    /// Checks the options without performing any request.
    pub fn validate(&self) -> Result<(), MixpanelError> {
        if self.event_name.trim().is_empty() {
            return Err(MixpanelError::ValidationError {
                message: "event_name is required".to_owned(),
            });
        }

        if self.present_property().is_some() != self.present_value().is_some() {
            return Err(MixpanelError::ValidationError {
                message: "Must specify both 'property' and 'value' or none".to_owned(),
            });
        }

        Ok(())
    }

    fn present_property(&self) -> Option<&str> {
        self.property.as_deref().filter(|property| !property.trim().is_empty())
    }

    fn present_value(&self) -> Option<&Value> {
        self.value.as_ref().filter(|value| !value.is_blank())
    }
}

/// The connection settings of the Mixpanel API client
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MixpanelClientConfig {
    /// The base URL of the query API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// The base URL of the raw data export API
    #[serde(default = "default_data_api_url")]
    pub data_api_url: String,

    /// The project API key. If not set, it is read from the MIXPANEL_API_KEY env variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// The project API secret. If not set, it is read from the MIXPANEL_SECRET_KEY env variable
    #[serde(default)]
    pub secret_key: Option<String>,

    /// The call timeout in seconds. Default is 10 seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// If true, the client will not verify the SSL certificate
    #[serde(default)]
    pub disable_ssl_verification: bool,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_data_api_url() -> String {
    DEFAULT_DATA_API_URL.to_owned()
}

impl Default for MixpanelClientConfig {
    fn default() -> Self {
        MixpanelClientConfig {
            api_url: default_api_url(),
            data_api_url: default_data_api_url(),
            api_key: None,
            secret_key: None,
            timeout_secs: None,
            disable_ssl_verification: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub secret_key: String,
}

impl MixpanelClientConfig {
    /// Returns a copy of this configuration where the credentials set in the agent options
    /// take precedence.
    pub fn with_credentials_from(&self, options: &MixpanelOptions) -> MixpanelClientConfig {
        let mut config = self.clone();
        if let Some(api_key) = non_blank(&options.api_key) {
            config.api_key = Some(api_key.to_owned());
        }
        if let Some(secret_key) = non_blank(&options.secret_key) {
            config.secret_key = Some(secret_key.to_owned());
        }
        config
    }

    pub fn validate(&self) -> Result<(), MixpanelError> {
        validate_url("api_url", &self.api_url)?;
        validate_url("data_api_url", &self.data_api_url)?;
        self.resolve_credentials().map(|_| ())
    }

    /// Resolves the credentials from the configuration, falling back to the process environment.
    pub fn resolve_credentials(&self) -> Result<Credentials, MixpanelError> {
        self.resolve_credentials_with(|key| std::env::var(key).ok())
    }

    pub fn resolve_credentials_with<F: Fn(&str) -> Option<String>>(
        &self,
        env: F,
    ) -> Result<Credentials, MixpanelError> {
        let api_key = non_blank(&self.api_key)
            .map(ToOwned::to_owned)
            .or_else(|| env(MIXPANEL_API_KEY_ENV).filter(|key| !key.trim().is_empty()));
        let secret_key = non_blank(&self.secret_key)
            .map(ToOwned::to_owned)
            .or_else(|| env(MIXPANEL_SECRET_KEY_ENV).filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| MixpanelError::ValidationError {
                message: format!(
                    "The Mixpanel secret key must be provided either in the configuration or in the {} env variable",
                    MIXPANEL_SECRET_KEY_ENV
                ),
            })?;
        Ok(Credentials { api_key, secret_key })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}

fn validate_url(name: &str, url: &str) -> Result<(), MixpanelError> {
    let parsed = Url::parse(url).map_err(|err| MixpanelError::ValidationError {
        message: format!("Invalid {} [{}]: {}", name, url, err),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(MixpanelError::ValidationError {
            message: format!("Invalid {} [{}]: unsupported scheme {}", name, url, scheme),
        }),
    }
}
