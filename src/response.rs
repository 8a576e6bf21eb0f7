use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_STATUS_CODE: u16 = 200;

/// How the `body` of a [`Response`] is carried on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// The body is the payload itself.
    #[default]
    Identity,
    /// The body is base64 text of the gzipped envelope JSON.
    Gzip,
    /// The body is a pre-signed URL to the envelope JSON.
    S3,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Identity => "identity",
            Encoding::Gzip => "gzip",
            Encoding::S3 => "s3",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown encoding {0:?}")]
pub struct UnknownEncoding(pub String);

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Encoding::Identity),
            "gzip" => Ok(Encoding::Gzip),
            "s3" => Ok(Encoding::S3),
            other => Err(UnknownEncoding(other.to_string())),
        }
    }
}

/// The loose input shape a [`Response`] is constructed from.
///
/// `None` means the field was absent. A body that is present but falsy
/// (`false`, `null`, `0`, `""`) deserializes to `Some(..)`.
///
/// `statusCode` and `encoding` read falsy values as absent. A `statusCode`
/// that is not an integer in `1..=65535` (`-1`, `"201"`, `1e6`) is also
/// treated as absent so the caller's default applies; `201.0` reads as 201.
/// An `encoding` that is truthy but not a known tag is an error.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseOptions {
    #[serde(default, deserialize_with = "loose_status_code")]
    pub status_code: Option<u16>,
    #[serde(default, deserialize_with = "falsy_encoding")]
    pub encoding: Option<Encoding>,
    #[serde(default, deserialize_with = "present")]
    pub body: Option<Value>,
}

impl ResponseOptions {
    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }
}

// Only invoked when the key exists, so `null` becomes `Some(Value::Null)`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn loose_status_code<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u16>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if is_falsy(&value) {
        return Ok(None);
    }

    let code = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f > 0.0)
                .map(|f| f as u64)
        })
        .and_then(|code| u16::try_from(code).ok());

    if code.is_none() {
        log::debug!("ignoring unusable statusCode {}", value);
    }
    Ok(code)
}

fn falsy_encoding<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Encoding>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if is_falsy(&value) {
        return Ok(None);
    }

    match value {
        Value::String(s) => s.parse().map(Some).map_err(de::Error::custom),
        other => Err(de::Error::custom(UnknownEncoding(other.to_string()))),
    }
}

/// The canonical invocation response.
///
/// Serializes as `{"statusCode", "encoding", "body"}` in that order, and
/// deserializes through [`ResponseOptions`] so missing fields take their
/// defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", from = "ResponseOptions")]
pub struct Response {
    pub(crate) status_code: u16,
    pub(crate) encoding: Encoding,
    pub(crate) body: Value,
}

impl Response {
    pub fn new(options: ResponseOptions) -> Response {
        Response {
            status_code: options
                .status_code
                .filter(|code| *code != 0)
                .unwrap_or(DEFAULT_STATUS_CODE),
            encoding: options.encoding.unwrap_or_default(),
            body: options.body.unwrap_or_else(|| Value::Object(Map::new())),
        }
    }

    pub fn from_parts(status_code: u16, encoding: Encoding, body: Value) -> Response {
        Response {
            status_code,
            encoding,
            body,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// The `{statusCode, encoding, body}` object, in that field order.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("statusCode".to_string(), Value::from(self.status_code));
        map.insert(
            "encoding".to_string(),
            Value::String(self.encoding.as_str().to_string()),
        );
        map.insert("body".to_string(), self.body.clone());
        Value::Object(map)
    }

    /// Length in bytes of the JSON text this response is transmitted as.
    pub fn byte_len(&self) -> usize {
        self.to_string().len()
    }
}

impl Default for Response {
    fn default() -> Self {
        Response::new(ResponseOptions::default())
    }
}

impl From<ResponseOptions> for Response {
    fn from(options: ResponseOptions) -> Self {
        Response::new(options)
    }
}

impl TryFrom<Value> for Response {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_options_empty() {
        let response = Response::new(ResponseOptions::default());
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.encoding(), Encoding::Identity);
        assert_eq!(response.body(), &json!({}));
    }

    #[test]
    fn test_false_body_is_kept() {
        let response = Response::new(ResponseOptions::default().body(false));
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.encoding(), Encoding::Identity);
        assert_eq!(response.body(), &json!(false));
    }

    #[test]
    fn test_present_null_body_is_kept() {
        let response: Response = serde_json::from_str(r#"{"body":null}"#).unwrap();
        assert_eq!(response.body(), &Value::Null);

        let response: Response = serde_json::from_str(r#"{"statusCode":201}"#).unwrap();
        assert_eq!(response.status_code(), 201);
        assert_eq!(response.body(), &json!({}));
    }

    #[test]
    fn test_falsy_status_and_encoding_take_defaults() {
        let response: Response =
            serde_json::from_str(r#"{"statusCode":0,"encoding":"","body":0}"#).unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.encoding(), Encoding::Identity);
        assert_eq!(response.body(), &json!(0));

        let response: Response =
            serde_json::from_str(r#"{"statusCode":null,"encoding":null,"body":""}"#).unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.encoding(), Encoding::Identity);
        assert_eq!(response.body(), &json!(""));

        for falsy in [json!(false), json!(0), json!(0.0), json!(""), json!(null)] {
            let response =
                Response::try_from(json!({"statusCode": falsy, "encoding": falsy, "body": 1}))
                    .unwrap();
            assert_eq!(response, Response::from_parts(200, Encoding::Identity, json!(1)));
        }
    }

    #[test]
    fn test_unusable_status_code_takes_default() {
        for code in [json!(-1), json!(70000), json!(201.5), json!("201"), json!(true), json!([1])] {
            let response = Response::try_from(json!({"statusCode": code, "body": 1})).unwrap();
            assert_eq!(response.status_code(), 200);
        }

        let response = Response::try_from(json!({"statusCode": 201.0, "body": 1})).unwrap();
        assert_eq!(response.status_code(), 201);
    }

    #[test]
    fn test_truthy_non_string_encoding_is_rejected() {
        for encoding in [json!(true), json!(1), json!({"a": 1})] {
            assert!(Response::try_from(json!({"encoding": encoding, "body": 1})).is_err());
        }
    }

    #[test]
    fn test_unknown_encoding_is_rejected() {
        let err = serde_json::from_str::<Response>(r#"{"encoding":"test"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown encoding \"test\""));
        assert_eq!(
            "brotli".parse::<Encoding>(),
            Err(UnknownEncoding("brotli".to_string()))
        );
    }

    #[test]
    fn test_to_json() {
        let response = Response::new(
            ResponseOptions::default()
                .status_code(200)
                .encoding(Encoding::Gzip)
                .body(json!({"data": "some data"})),
        );

        assert_eq!(
            response.to_json(),
            json!({"statusCode": 200, "encoding": "gzip", "body": {"data": "some data"}})
        );
    }

    #[test]
    fn test_to_json_keeps_field_order() {
        let response = Response::from_parts(200, Encoding::Identity, json!({"z": 1, "a": 2}));
        let text = serde_json::to_string(&response.to_json()).unwrap();

        assert_eq!(
            text,
            r#"{"statusCode":200,"encoding":"identity","body":{"z":1,"a":2}}"#
        );
        assert_eq!(text, response.to_string());
    }

    #[test]
    fn test_to_string_field_order() {
        let response = Response::from_parts(500, Encoding::Identity, json!({"data": "foo"}));
        assert_eq!(
            response.to_string(),
            r#"{"statusCode":500,"encoding":"identity","body":{"data":"foo"}}"#
        );
        assert_eq!(response.byte_len(), 62);
    }

    #[test]
    fn test_byte_len_counts_utf8_bytes() {
        let response = Response::from_parts(200, Encoding::Identity, json!("é"));
        let text = response.to_string();
        assert_eq!(text.chars().count() + 1, response.byte_len());
    }

    #[test]
    fn test_round_trip_through_text() {
        for body in [json!({"a": [1, 2, 3]}), json!(false), json!(null), json!("x"), json!(0)] {
            let response = Response::from_parts(404, Encoding::Identity, body);
            let parsed: Response = serde_json::from_str(&response.to_string()).unwrap();
            assert_eq!(parsed, response);
        }
    }

    #[test]
    fn test_try_from_value() {
        let response = Response::try_from(json!({"encoding": "s3", "body": "https://x"})).unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.encoding(), Encoding::S3);
        assert_eq!(response.body(), &json!("https://x"));
    }
}
