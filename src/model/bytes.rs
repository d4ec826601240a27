//! Base64 (standard alphabet, padded) serde adapters for binary fields

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&BASE64.encode(bytes))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    BASE64
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

/// Same encoding for optional fields; pair with `default` and
/// `skip_serializing_if = "Option::is_none"`
pub mod option {
    use super::BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => BASE64
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        #[serde(with = "super")]
        data: Vec<u8>,
        #[serde(default, with = "super::option", skip_serializing_if = "Option::is_none")]
        extra: Option<Vec<u8>>,
    }

    #[test]
    fn test_bytes_written_as_base64_text() {
        let blob = Blob { data: vec![0x89, b'P', b'N', b'G'], extra: None };
        let json = serde_json::to_string(&blob).unwrap();
        assert_eq!(json, r#"{"data":"iVBORw=="}"#);
    }

    #[test]
    fn test_missing_optional_field_is_none() {
        let blob: Blob = serde_json::from_str(r#"{"data":""}"#).unwrap();
        assert_eq!(blob, Blob { data: Vec::new(), extra: None });
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let result = serde_json::from_str::<Blob>(r#"{"data":"not base64!"}"#);
        assert!(result.is_err());
    }
}
