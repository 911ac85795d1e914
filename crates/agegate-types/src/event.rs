//! Age estimate events emitted by the face-analysis sensor.
//!
//! The sensor publishes one payload per estimate with the shape
//!
//! ```json
//! { "detail": { "output": { "numericAge": 37.9 } } }
//! ```
//!
//! Decoding is permissive: a payload with a missing `detail`, `output` or
//! `numericAge`, or with a value that is not a finite JSON number, decodes
//! to an [`AgeEvent`] with no age. Such events are still processed and
//! display as age `0`.

use serde::{Deserialize, Serialize};

/// JSON pointer to the age estimate inside a sensor payload.
const NUMERIC_AGE_POINTER: &str = "/detail/output/numericAge";

/// A single point-in-time age estimate from the sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeEvent {
    /// The estimated age, or `None` when the payload carried no usable number.
    pub numeric_age: Option<f64>,
}

impl AgeEvent {
    /// Create an event carrying the given estimate.
    pub const fn new(numeric_age: f64) -> Self {
        Self {
            numeric_age: Some(numeric_age),
        }
    }

    /// Create an event whose payload carried no age.
    pub const fn missing() -> Self {
        Self { numeric_age: None }
    }

    /// Decode an event from an already-parsed sensor payload.
    ///
    /// Never fails: anything other than a finite number at
    /// `detail.output.numericAge` yields an event with no age.
    pub fn from_value(payload: &serde_json::Value) -> Self {
        let numeric_age = payload
            .pointer(NUMERIC_AGE_POINTER)
            .and_then(serde_json::Value::as_f64)
            .filter(|age| age.is_finite());
        Self { numeric_age }
    }

    /// Decode an event from raw payload bytes.
    ///
    /// # Errors
    ///
    /// Returns an error only when the bytes are not JSON at all. Valid JSON
    /// of any shape decodes permissively via [`AgeEvent::from_value`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let payload: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_value(&payload))
    }

    /// Encode the event in the sensor wire shape.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "detail": {
                "output": {
                    "numericAge": self.numeric_age,
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn decodes_well_formed_payload() {
        let payload = serde_json::json!({ "detail": { "output": { "numericAge": 37.9 } } });
        let event = AgeEvent::from_value(&payload);
        assert_eq!(event.numeric_age, Some(37.9));
    }

    #[test]
    fn integer_age_decodes_as_float() {
        let event = AgeEvent::from_slice(br#"{"detail":{"output":{"numericAge":42}}}"#).unwrap();
        assert_eq!(event.numeric_age, Some(42.0));
    }

    #[test]
    fn missing_fields_decode_as_no_age() {
        for payload in [
            serde_json::json!({}),
            serde_json::json!({ "detail": {} }),
            serde_json::json!({ "detail": { "output": {} } }),
            serde_json::json!({ "detail": { "output": { "numericAge": null } } }),
            serde_json::json!({ "detail": { "output": { "numericAge": "forty" } } }),
            serde_json::json!([1, 2, 3]),
        ] {
            assert_eq!(AgeEvent::from_value(&payload), AgeEvent::missing(), "{payload}");
        }
    }

    #[test]
    fn non_json_bytes_are_an_error() {
        assert!(AgeEvent::from_slice(b"not json").is_err());
    }

    #[test]
    fn payload_shape_round_trips() {
        let event = AgeEvent::new(25.5);
        assert_eq!(AgeEvent::from_value(&event.to_payload()), event);
    }
}
