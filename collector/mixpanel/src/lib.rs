use crate::aggregate::total_for_events;
use crate::client::{ApiClient, MixpanelApi};
use crate::config::{MixpanelClientConfig, MixpanelOptions};
use crate::error::MixpanelError;
use crate::export::{count_records, ExportQuery};
use crate::query::MixpanelQuery;
use chrono::NaiveDate;
use log::*;
use mixpanel_agent_common_api::{Event, Number, Payload, Value};
use tracing::instrument;

pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod query;

pub const MIXPANEL_EVENT_TYPE: &str = "mixpanel";

/// An agent that counts the occurrences of a Mixpanel event and reports the count as an Event.
/// Each check is independent; the only state is the API client, created once per agent.
pub struct MixpanelAgent<C: MixpanelApi> {
    pub options: MixpanelOptions,
    api_client: C,
}

impl<C: MixpanelApi> std::fmt::Display for MixpanelAgent<C> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "MixpanelAgent[{}]", self.options.event_name)
    }
}

impl MixpanelAgent<ApiClient> {
    /// Builds an agent connected to the Mixpanel API.
    /// The credentials of the options take precedence over the ones of the client configuration.
    pub fn build(
        options: MixpanelOptions,
        client_config: &MixpanelClientConfig,
    ) -> Result<MixpanelAgent<ApiClient>, MixpanelError> {
        options.validate()?;
        let api_client = ApiClient::new(&client_config.with_credentials_from(&options))?;
        Ok(MixpanelAgent { options, api_client })
    }
}

impl<C: MixpanelApi> MixpanelAgent<C> {
    pub fn new(options: MixpanelOptions, api_client: C) -> MixpanelAgent<C> {
        MixpanelAgent { options, api_client }
    }

    pub fn api_client(&self) -> &C {
        &self.api_client
    }

    /// Queries Mixpanel and returns the Event with the event count.
    #[instrument(level = "info", skip_all, err, fields(event_name = %self.options.event_name))]
    pub async fn check(&self) -> Result<Event, MixpanelError> {
        let count = self.mixpanel_event_number().await?;
        debug!("{} - counted {} events", self, count);
        Ok(Event::new_with_payload(MIXPANEL_EVENT_TYPE, self.event_payload(count)))
    }

    async fn mixpanel_event_number(&self) -> Result<Number, MixpanelError> {
        self.options.validate()?;
        let request = MixpanelQuery::from_options(&self.options)?.to_request()?;

        trace!("{} - performing request: {:?}", self, request);
        let body = self.api_client.request(&request).await?;
        let response: Value = serde_json::from_str(&body)?;

        total_for_events(&response)
    }

    fn event_payload(&self, count: Number) -> Payload {
        let options = &self.options;
        let mut payload = Payload::new();
        payload.insert("count".to_owned(), Value::Number(count));
        payload.insert("event_name".to_owned(), Value::String(options.event_name.clone()));
        payload.insert(
            "property".to_owned(),
            options.property.clone().map(Value::String).unwrap_or(Value::Null),
        );
        payload.insert("value".to_owned(), options.value.clone().unwrap_or(Value::Null));
        payload.insert(
            "time".to_owned(),
            options.time.map(|time| Value::Number(time.into())).unwrap_or(Value::Null),
        );
        payload.insert(
            "interval".to_owned(),
            options
                .interval
                .map(|interval| Value::String(interval.as_str().to_owned()))
                .unwrap_or(Value::Null),
        );
        payload
    }

    /// Counts the events whose boolean `property` equals `value` over the last `num_days` days,
    /// using the raw data export API.
    /// This is not part of `check`: it is the manual workaround for boolean filters.
    #[instrument(level = "info", skip(self), err)]
    pub async fn number_for_event_using_export(
        &self,
        event_name: &str,
        property: &str,
        value: bool,
        num_days: u32,
        today: NaiveDate,
    ) -> Result<u64, MixpanelError> {
        let request = ExportQuery::new(event_name, property, value, num_days).to_request(today)?;

        trace!("{} - performing export request: {:?}", self, request);
        let body = self.api_client.request(&request).await?;

        count_records(&body)
    }
}
