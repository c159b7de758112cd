//! Types shared by every external resource.

use prost_types::Timestamp;
use serde::{Deserialize, Serialize};

/// Store-assigned creation and modification times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timestamps {
    #[serde(with = "rfc3339", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(with = "rfc3339", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

/// JSON mapping for `google.protobuf.Timestamp`: an RFC 3339 string.
mod rfc3339 {
    use std::str::FromStr;

    use prost_types::Timestamp;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option, reason = "signature required by serde(with)")]
    pub fn serialize<S: Serializer>(ts: &Option<Timestamp>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.collect_str(ts),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| Timestamp::from_str(&raw).map_err(D::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_json() {
        let ts = Timestamps {
            created_at: Some(Timestamp {
                seconds: 0,
                nanos: 0,
            }),
            updated_at: None,
        };
        let json = serde_json::to_value(&ts).unwrap();
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert!(json.get("updated_at").is_none());

        let back: Timestamps = serde_json::from_value(json).unwrap();
        assert_eq!(back, ts);
    }
}
