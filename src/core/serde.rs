use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Serializes Duration as seconds
pub fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    duration.as_secs_f64().serialize(serializer)
}

/// Deserializes Duration from seconds
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_serialization() {
        #[derive(Serialize, Deserialize)]
        struct Test {
            #[serde(serialize_with = "serialize_duration")]
            #[serde(deserialize_with = "deserialize_duration")]
            hold: Duration,
        }

        let original = Test {
            hold: Duration::from_millis(1500),
        };

        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: Test = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.hold, original.hold);
    }

    #[test]
    fn test_negative_duration_rejected() {
        #[derive(Deserialize)]
        struct Test {
            #[serde(deserialize_with = "deserialize_duration")]
            #[allow(dead_code)]
            hold: Duration,
        }

        let result: Result<Test, _> = serde_json::from_str(r#"{"hold": -1.0}"#);
        assert!(result.is_err());
    }
}
