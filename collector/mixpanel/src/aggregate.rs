use crate::error::MixpanelError;
use mixpanel_agent_common_api::{Number, Value, ValueExt};
use std::ops::Add;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Total {
    Int(i64),
    Float(f64),
}

impl Default for Total {
    fn default() -> Self {
        Total::Int(0)
    }
}

impl Total {
    fn as_f64(&self) -> f64 {
        match self {
            Total::Int(value) => *value as f64,
            Total::Float(value) => *value,
        }
    }

    fn from_number(number: &Number) -> Option<Total> {
        match number.as_i64() {
            Some(value) => Some(Total::Int(value)),
            None => number.as_f64().map(Total::Float),
        }
    }

    fn into_number(self) -> Option<Number> {
        match self {
            Total::Int(value) => Some(value.into()),
            Total::Float(value) => Number::from_f64(value),
        }
    }
}

impl Add for Total {
    type Output = Total;

    fn add(self, other: Total) -> Total {
        match (self, other) {
            (Total::Int(first), Total::Int(second)) => match first.checked_add(second) {
                Some(sum) => Total::Int(sum),
                None => Total::Float(first as f64 + second as f64),
            },
            (first, second) => Total::Float(first.as_f64() + second.as_f64()),
        }
    }
}

/// Sums the counts of a Mixpanel segmentation response.
///
/// The response has the shape `{"data": {"values": {<property value>: {<bucket>: <count>}}}}`.
/// The counts of each property value are summed first, then the per-property totals are
/// summed into the grand total. An empty `values` mapping yields zero.
pub fn total_for_events(response: &Value) -> Result<Number, MixpanelError> {
    let values = response
        .get_from_map("data")
        .and_then(|data| data.get_from_map("values"))
        .ok_or_else(|| malformed("the response does not contain data.values".to_owned()))?
        .get_map()
        .ok_or_else(|| malformed("data.values is not an object".to_owned()))?;

    let mut total = Total::default();

    for (property_value, buckets) in values {
        total = total + total_for_property(property_value, buckets)?;
    }

    total.into_number().ok_or_else(|| malformed("the total is not a finite number".to_owned()))
}

fn total_for_property(property_value: &str, buckets: &Value) -> Result<Total, MixpanelError> {
    let buckets = buckets.get_map().ok_or_else(|| {
        malformed(format!("the counts of [{}] are not an object", property_value))
    })?;

    buckets.iter().try_fold(Total::default(), |subtotal, (bucket, count)| {
        count
            .get_number()
            .and_then(Total::from_number)
            .map(|count| subtotal + count)
            .ok_or_else(|| {
                malformed(format!(
                    "the count of [{}] at [{}] is not a number: {}",
                    property_value, bucket, count
                ))
            })
    })
}

fn malformed(message: String) -> MixpanelError {
    MixpanelError::MalformedResponseError { message }
}
