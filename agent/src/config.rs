use clap::{Parser, Subcommand};
use config_rs::{Config, ConfigError, File};
use mixpanel_agent_collector::config::MixpanelClientConfig;
use mixpanel_agent_collector::export::DEFAULT_EXPORT_NUM_DAYS;
use mixpanel_agent_common_api::Payload;
use mixpanel_agent_common_logger::LoggerConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_DIR_DEFAULT: Option<&'static str> =
    option_env!("MIXPANEL_AGENT_CONFIG_DIR_DEFAULT");

pub const CONFIG_FILE_NAME: &str = "mixpanel_agent.toml";

#[derive(Parser, Debug)]
#[clap(name = "mixpanel_agent")]
pub struct AgentArgs {
    /// The filesystem folder where the Mixpanel Agent configuration is saved
    #[clap(long = "config-dir", default_value = CONFIG_DIR_DEFAULT.unwrap_or("/etc/mixpanel_agent"))]
    pub config_dir: String,

    #[clap(subcommand)]
    pub command: AgentCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum AgentCommand {
    /// Counts the configured Mixpanel event and prints the resulting Event
    Check,
    /// Counts the events with a boolean property value through the raw data export API
    ExportCount {
        /// The number of days to look back
        #[clap(long = "num-days", default_value_t = DEFAULT_EXPORT_NUM_DAYS)]
        num_days: u32,
    },
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AgentConfig {
    /// The logger configuration
    pub logger: LoggerConfig,

    /// The Mixpanel client configuration
    #[serde(default)]
    pub mixpanel: MixpanelClientConfig,

    /// The agent options, as they would be supplied by the host
    pub options: Payload,
}

pub fn build_config(config_dir: &str) -> Result<AgentConfig, ConfigError> {
    let config_file_path = format!("{}/{}", config_dir, CONFIG_FILE_NAME);
    let mut s = Config::new();
    s.merge(File::with_name(&config_file_path))?;
    s.try_into()
}
