use mixpanel_agent_collector::error::MixpanelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Could not load config file for the agent: {0}")]
    ConfigError(#[from] config_rs::ConfigError),
    #[error("Could not instantiate logger: {0}")]
    LoggerError(#[from] mixpanel_agent_common_logger::LoggerError),
    #[error("{0}")]
    MixpanelError(#[from] MixpanelError),
    #[error("Cannot count events using export: {message}")]
    ExportArgumentError { message: String },
    #[error("Cannot serialize the event: {0}")]
    SerializationError(#[from] serde_json::Error),
}
