use crate::error::MixpanelError;
use crate::query::{QueryRequest, EXPORT_ENDPOINT};
use chrono::{Duration, NaiveDate};

pub const DEFAULT_EXPORT_NUM_DAYS: u32 = 30;

/// Counts the raw events whose boolean property has a given value.
///
/// The segmentation endpoints of Mixpanel do not understand boolean property values,
/// so these events are counted by downloading them from the raw data export API
/// with a server side `where` filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportQuery<'a> {
    pub event_name: &'a str,
    pub property: &'a str,
    pub value: bool,
    pub num_days: u32,
}

impl<'a> ExportQuery<'a> {
    pub fn new(event_name: &'a str, property: &'a str, value: bool, num_days: u32) -> Self {
        ExportQuery { event_name, property, value, num_days }
    }

    /// Builds the request covering the `num_days` days before `today`, `today` included.
    pub fn to_request(&self, today: NaiveDate) -> Result<QueryRequest, MixpanelError> {
        let from_date = today
            .checked_sub_signed(Duration::days(i64::from(self.num_days)))
            .ok_or_else(|| MixpanelError::ValidationError {
                message: format!("Cannot go back {} days from {}", self.num_days, today),
            })?;

        Ok(QueryRequest {
            endpoint: EXPORT_ENDPOINT,
            params: vec![
                ("event", serde_json::to_string(&[self.event_name])?),
                ("from_date", from_date.format("%Y-%m-%d").to_string()),
                ("to_date", today.format("%Y-%m-%d").to_string()),
                ("where", self.where_expression()),
            ],
        })
    }

    fn where_expression(&self) -> String {
        format!("boolean(properties[{}]) == {} ", quote(self.property), self.value)
    }
}

fn quote(property: &str) -> String {
    format!("\"{}\"", property.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Counts the records of a newline delimited export response.
pub fn count_records(body: &str) -> Result<u64, MixpanelError> {
    let mut count = 0;
    for (index, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        serde_json::from_str::<serde_json::Value>(line).map_err(|err| {
            MixpanelError::MalformedResponseError {
                message: format!("Export record at line {} is not valid JSON: {}", index + 1, err),
            }
        })?;
        count += 1;
    }
    Ok(count)
}
