use chrono::prelude::Local;
use serde::{Deserialize, Serialize};

pub use serde_json::{Map, Number, Value};

pub type Payload = Map<String, Value>;

/// An Event is the structured result of a single agent check.
/// Events are produced by Collectors and handed over to the host framework, which stores
///   them and forwards them to the downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Event {
    #[serde(default = "default_trace_id")]
    pub trace_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_ms: u64,
    pub payload: Payload,
}

fn default_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Event {
    pub fn new<S: Into<String>>(event_type: S) -> Event {
        Event::new_with_payload(event_type, Payload::new())
    }

    pub fn new_with_payload<S: Into<String>>(event_type: S, payload: Payload) -> Event {
        let dt = Local::now(); // e.g. `2014-11-28T21:45:59.324310806+09:00`
        let created_ms = dt.timestamp_millis() as u64;
        Event { trace_id: default_trace_id(), event_type: event_type.into(), created_ms, payload }
    }
}

impl From<Event> for Value {
    fn from(event: Event) -> Self {
        let mut payload = Payload::new();
        payload.insert("trace_id".to_owned(), Value::String(event.trace_id));
        payload.insert("type".to_owned(), Value::String(event.event_type));
        payload.insert("created_ms".to_owned(), Value::Number(event.created_ms.into()));
        payload.insert("payload".to_owned(), Value::Object(event.payload));
        Value::Object(payload)
    }
}

pub trait ValueExt {
    fn get_from_map(&self, key: &str) -> Option<&Value>;
    fn get_map(&self) -> Option<&Payload>;
    fn get_text(&self) -> Option<&str>;
    fn get_bool(&self) -> Option<&bool>;
    fn get_number(&self) -> Option<&Number>;
    /// Returns true for `null`, whitespace-only text and empty arrays or maps.
    /// Booleans and numbers are never blank.
    fn is_blank(&self) -> bool;
}

impl ValueExt for Value {
    fn get_from_map(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(payload) => payload.get(key),
            _ => None,
        }
    }

    fn get_map(&self) -> Option<&Payload> {
        match self {
            Value::Object(payload) => Some(payload),
            _ => None,
        }
    }

    fn get_text(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    fn get_bool(&self) -> Option<&bool> {
        match self {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    fn get_number(&self) -> Option<&Number> {
        match self {
            Value::Number(value) => Some(value),
            _ => None,
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(value) => value.trim().is_empty(),
            Value::Array(array) => array.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn created_ms_should_be_preset() {
        // Arrange
        let before_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis();

        // Act
        let event = Event::new("");
        let created_ms = event.created_ms as u128;

        // Assert
        let after_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis();
        assert!(created_ms >= before_ms);
        assert!(created_ms <= after_ms);
    }

    #[test]
    fn should_generate_a_trace_id_for_each_event() {
        let first = Event::new("mixpanel");
        let second = Event::new("mixpanel");
        assert!(!first.trace_id.is_empty());
        assert_ne!(first.trace_id, second.trace_id);
    }

    #[test]
    fn should_serialize_event_type_as_type() {
        // Arrange
        let mut payload = Payload::new();
        payload.insert("count".to_owned(), json!(45));
        let event = Event::new_with_payload("mixpanel", payload);

        // Act
        let json = serde_json::to_value(&event).unwrap();

        // Assert
        assert_eq!(Some(&json!("mixpanel")), json.get("type"));
        assert_eq!(Some(&json!(45)), json.get("payload").and_then(|p| p.get("count")));
    }

    #[test]
    fn should_deserialize_event_without_trace_id() {
        // Arrange
        let json = r#"{"type": "mixpanel", "created_ms": 123, "payload": {}}"#;

        // Act
        let event: Event = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!("mixpanel", event.event_type);
        assert_eq!(123, event.created_ms);
        assert!(!event.trace_id.is_empty());
    }

    #[test]
    fn should_convert_event_into_value() {
        // Arrange
        let event = Event::new("mixpanel");
        let trace_id = event.trace_id.clone();

        // Act
        let value: Value = event.into();

        // Assert
        assert_eq!(Some("mixpanel"), value.get_from_map("type").and_then(ValueExt::get_text));
        assert_eq!(Some(trace_id.as_str()), value.get_from_map("trace_id").and_then(ValueExt::get_text));
        assert!(value.get_from_map("payload").and_then(ValueExt::get_map).is_some());
    }

    #[test]
    fn should_detect_blank_values() {
        assert!(Value::Null.is_blank());
        assert!(json!("").is_blank());
        assert!(json!("   ").is_blank());
        assert!(json!([]).is_blank());
        assert!(json!({}).is_blank());

        assert!(!json!("home").is_blank());
        assert!(!json!(false).is_blank());
        assert!(!json!(0).is_blank());
        assert!(!json!(["a"]).is_blank());
    }
}
