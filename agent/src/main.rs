use crate::config::{AgentArgs, AgentCommand, AgentConfig};
use crate::error::AgentError;
use chrono::Local;
use clap::Parser;
use log::*;
use mixpanel_agent_collector::client::MixpanelApi;
use mixpanel_agent_collector::config::MixpanelOptions;
use mixpanel_agent_collector::MixpanelAgent;
use mixpanel_agent_common_api::{Event, Payload, Value, ValueExt};
use mixpanel_agent_common_logger::setup_logger;

mod config;
mod error;

pub const MIXPANEL_EXPORT_EVENT_TYPE: &str = "mixpanel_export";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Mixpanel Agent failed. Err: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AgentError> {
    let args = AgentArgs::parse();

    let agent_config = config::build_config(&args.config_dir)?;

    // The guard flushes the buffered log lines when dropped at the end of the run
    let _guard = setup_logger(&agent_config.logger)?;

    info!("Starting Mixpanel Agent with config dir [{}]", args.config_dir);

    let event = execute_and_log(&agent_config, &args.command).await?;

    // The Event is handed over to the host through the standard output, one JSON per line
    println!("{}", serde_json::to_string(&event)?);

    info!("Mixpanel Agent - event [{}] emitted", event.trace_id);
    Ok(())
}

/// Runs the command, logging the failure while the log writers are still alive.
async fn execute_and_log(
    agent_config: &AgentConfig,
    command: &AgentCommand,
) -> Result<Event, AgentError> {
    let result = execute(agent_config, command).await;
    if let Err(err) = &result {
        error!("Mixpanel Agent failed. Err: {}", err);
    }
    result
}

async fn execute(agent_config: &AgentConfig, command: &AgentCommand) -> Result<Event, AgentError> {
    let options = MixpanelOptions::from_payload(&agent_config.options)?;
    let agent = MixpanelAgent::build(options, &agent_config.mixpanel)?;

    match command {
        AgentCommand::Check => Ok(agent.check().await?),
        AgentCommand::ExportCount { num_days } => export_count(&agent, *num_days).await,
    }
}

async fn export_count<C: MixpanelApi>(
    agent: &MixpanelAgent<C>,
    num_days: u32,
) -> Result<Event, AgentError> {
    let options = &agent.options;
    let (property, value) = boolean_filter(options)?;

    let today = Local::now().date_naive();
    let count = agent
        .number_for_event_using_export(&options.event_name, property, value, num_days, today)
        .await?;

    let mut payload = Payload::new();
    payload.insert("count".to_owned(), Value::Number(count.into()));
    payload.insert("event_name".to_owned(), Value::String(options.event_name.clone()));
    payload.insert("property".to_owned(), Value::String(property.to_owned()));
    payload.insert("value".to_owned(), Value::Bool(value));
    payload.insert("num_days".to_owned(), Value::Number(num_days.into()));
    Ok(Event::new_with_payload(MIXPANEL_EXPORT_EVENT_TYPE, payload))
}

fn boolean_filter(options: &MixpanelOptions) -> Result<(&str, bool), AgentError> {
    match options.property_filter() {
        Some((property, value)) => match value.get_bool() {
            Some(value) => Ok((property, *value)),
            None => Err(AgentError::ExportArgumentError {
                message: format!("the value of property [{}] must be a boolean", property),
            }),
        },
        None => Err(AgentError::ExportArgumentError {
            message: "both 'property' and 'value' must be set".to_owned(),
        }),
    }
}
