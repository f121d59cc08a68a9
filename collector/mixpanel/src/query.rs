use crate::config::{Interval, MixpanelOptions};
use crate::error::MixpanelError;
use mixpanel_agent_common_api::Value;
use std::str::FromStr;

pub const EVENTS_ENDPOINT: &str = "events/";
pub const EVENTS_PROPERTIES_ENDPOINT: &str = "events/properties/";
pub const EXPORT_ENDPOINT: &str = "export";

const QUERY_LIMIT: u32 = 5;

/// The aggregation requested to Mixpanel.
/// Mixpanel uses the term `general` to mean `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    Unique,
    #[default]
    General,
    Average,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Unique => "unique",
            QueryType::General => "general",
            QueryType::Average => "average",
        }
    }
}

impl FromStr for QueryType {
    type Err = MixpanelError;

    fn from_str(query_type: &str) -> Result<Self, Self::Err> {
        match query_type {
            "unique" => Ok(QueryType::Unique),
            "general" => Ok(QueryType::General),
            "average" => Ok(QueryType::Average),
            _ => Err(MixpanelError::InvalidTypeError { query_type: query_type.to_owned() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind<'a> {
    /// Counts only the events whose `property` equals `value`
    PropertyFiltered { property: &'a str, value: &'a Value },
    Unfiltered,
}

/// A Mixpanel segmentation query, resolved once from the agent options.
#[derive(Debug, Clone, PartialEq)]
pub struct MixpanelQuery<'a> {
    pub event_name: &'a str,
    pub query_type: QueryType,
    pub unit: Interval,
    pub time: u64,
    pub kind: QueryKind<'a>,
}

/// The endpoint and the query string parameters of a request to the Mixpanel API.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub endpoint: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl QueryRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }
}

impl<'a> MixpanelQuery<'a> {
    pub fn from_options(options: &'a MixpanelOptions) -> Result<MixpanelQuery<'a>, MixpanelError> {
        if let Some(Value::Bool(_)) = options.value {
            return Err(MixpanelError::UnsupportedValueError {
                message: "Mixpanel cannot filter the events/properties endpoint by boolean values. Please count the events using the export API instead".to_owned(),
            });
        }

        let kind = match options.property_filter() {
            Some((property, value)) => QueryKind::PropertyFiltered { property, value },
            None => QueryKind::Unfiltered,
        };

        let query_type = match &options.query_type {
            Some(query_type) => QueryType::from_str(query_type)?,
            None => QueryType::default(),
        };

        Ok(MixpanelQuery {
            event_name: &options.event_name,
            query_type,
            unit: options.interval(),
            time: options.time(),
            kind,
        })
    }

    pub fn endpoint(&self) -> &'static str {
        match self.kind {
            QueryKind::PropertyFiltered { .. } => EVENTS_PROPERTIES_ENDPOINT,
            QueryKind::Unfiltered => EVENTS_ENDPOINT,
        }
    }

    pub fn to_request(&self) -> Result<QueryRequest, MixpanelError> {
        let mut params = vec![
            ("type", self.query_type.as_str().to_owned()),
            ("unit", self.unit.as_str().to_owned()),
            ("interval", self.time.to_string()),
            ("limit", QUERY_LIMIT.to_string()),
        ];

        match &self.kind {
            QueryKind::PropertyFiltered { property, value } => {
                params.push(("event", self.event_name.to_owned()));
                params.push(("values", serde_json::to_string(&[value])?));
                params.push(("name", (*property).to_owned()));
            }
            QueryKind::Unfiltered => {
                params.push(("event", serde_json::to_string(&[self.event_name])?));
            }
        }

        Ok(QueryRequest { endpoint: self.endpoint(), params })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn options(value: serde_json::Value) -> MixpanelOptions {
        MixpanelOptions::from_payload(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn should_build_property_filtered_request() {
        // Arrange
        let options = options(json!({
            "event_name": "Page Visit",
            "property": "Page",
            "value": "home",
            "time": 24,
            "interval": "hour"
        }));

        // Act
        let request = MixpanelQuery::from_options(&options).unwrap().to_request().unwrap();

        // Assert
        assert_eq!(
            QueryRequest {
                endpoint: EVENTS_PROPERTIES_ENDPOINT,
                params: vec![
                    ("type", "general".to_owned()),
                    ("unit", "hour".to_owned()),
                    ("interval", "24".to_owned()),
                    ("limit", "5".to_owned()),
                    ("event", "Page Visit".to_owned()),
                    ("values", r#"["home"]"#.to_owned()),
                    ("name", "Page".to_owned()),
                ]
            },
            request
        );
    }

    #[test]
    fn should_build_unfiltered_request() {
        // Arrange
        let options = options(json!({
            "event_name": "Signup",
            "time": 7,
            "interval": "day",
            "type": "unique"
        }));

        // Act
        let request = MixpanelQuery::from_options(&options).unwrap().to_request().unwrap();

        // Assert
        assert_eq!(
            QueryRequest {
                endpoint: EVENTS_ENDPOINT,
                params: vec![
                    ("type", "unique".to_owned()),
                    ("unit", "day".to_owned()),
                    ("interval", "7".to_owned()),
                    ("limit", "5".to_owned()),
                    ("event", r#"["Signup"]"#.to_owned()),
                ]
            },
            request
        );
    }

    #[test]
    fn should_use_default_type_interval_and_time() {
        // Act
        let options = options(json!({ "event_name": "Signup" }));
        let request = MixpanelQuery::from_options(&options).unwrap().to_request().unwrap();

        // Assert
        assert_eq!(Some("general"), request.param("type"));
        assert_eq!(Some("hour"), request.param("unit"));
        assert_eq!(Some("24"), request.param("interval"));
        assert_eq!(None, request.param("name"));
    }

    #[test]
    fn should_encode_numeric_values() {
        let options =
            options(json!({ "event_name": "Purchase", "property": "Items", "value": 3 }));
        let request = MixpanelQuery::from_options(&options).unwrap().to_request().unwrap();
        assert_eq!(Some("[3]"), request.param("values"));
    }

    #[test]
    fn should_select_endpoint_by_property_filter() {
        let filtered = options(json!({ "event_name": "A", "property": "p", "value": "v" }));
        let unfiltered = options(json!({ "event_name": "A" }));

        assert_eq!(
            EVENTS_PROPERTIES_ENDPOINT,
            MixpanelQuery::from_options(&filtered).unwrap().endpoint()
        );
        assert_eq!(EVENTS_ENDPOINT, MixpanelQuery::from_options(&unfiltered).unwrap().endpoint());
    }

    #[test]
    fn should_fail_for_invalid_type() {
        // Arrange
        let options = options(json!({ "event_name": "Signup", "type": "total" }));

        // Act
        let result = MixpanelQuery::from_options(&options);

        // Assert
        assert_eq!(
            Err(MixpanelError::InvalidTypeError { query_type: "total".to_owned() }),
            result
        );
    }

    #[test]
    fn should_parse_all_valid_types() {
        assert_eq!(Ok(QueryType::Unique), QueryType::from_str("unique"));
        assert_eq!(Ok(QueryType::General), QueryType::from_str("general"));
        assert_eq!(Ok(QueryType::Average), QueryType::from_str("average"));
        assert!(QueryType::from_str("Unique").is_err());
    }

    #[test]
    fn should_fail_for_boolean_values() {
        for value in &[true, false] {
            // Arrange
            let options =
                options(json!({ "event_name": "Signup", "property": "Paid", "value": value }));

            // Act
            let result = MixpanelQuery::from_options(&options);

            // Assert
            match result {
                Err(MixpanelError::UnsupportedValueError { message }) => {
                    assert!(message.contains("export"))
                }
                _ => assert!(false),
            }
        }
    }

    #[test]
    fn should_fail_for_boolean_value_without_property() {
        // Arrange
        let options = options(json!({ "event_name": "x", "value": true }));

        // Act
        let result = MixpanelQuery::from_options(&options);

        // Assert
        assert!(matches!(result, Err(MixpanelError::UnsupportedValueError { .. })));
    }

    #[test]
    fn boolean_value_check_should_take_precedence_over_type_check() {
        let options = options(
            json!({ "event_name": "Signup", "property": "Paid", "value": true, "type": "wrong" }),
        );
        match MixpanelQuery::from_options(&options) {
            Err(MixpanelError::UnsupportedValueError { .. }) => {}
            _ => assert!(false),
        }
    }
}
