//! Turns whatever a Lambda invocation handed back into a canonical [`Response`].
//!
//! The invoke API reports "the function threw" and "the function returned
//! an error value" through the same `FunctionError` marker, and a handled
//! error's `errorMessage` may or may not carry a serialized response. The
//! ladder in [`Response::from_raw_result`] tells these apart.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EnvelopeError;
use crate::response::{Encoding, Response, ResponseOptions};

pub const UNHANDLED: &str = "Unhandled";
pub const ERROR_STATUS_CODE: u16 = 500;

/// The result of an invoke call: JSON payload text plus the optional
/// function error marker.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInvocationResult {
    #[serde(rename = "Payload")]
    pub payload: String,
    #[serde(
        rename = "FunctionError",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub function_error: Option<String>,
}

impl RawInvocationResult {
    pub fn new(payload: impl Into<String>) -> Self {
        RawInvocationResult {
            payload: payload.into(),
            function_error: None,
        }
    }

    pub fn with_function_error(mut self, function_error: impl Into<String>) -> Self {
        self.function_error = Some(function_error.into());
        self
    }

    fn function_error(&self) -> Option<&str> {
        self.function_error.as_deref().filter(|e| !e.is_empty())
    }
}

impl Response {
    /// Normalizes a raw invocation result. The returned response may still
    /// be a gzip or s3 envelope; see [`crate::ResponseResolver`].
    pub fn from_raw_result(raw: &RawInvocationResult) -> Result<Response, EnvelopeError> {
        let payload: Value = serde_json::from_str(&raw.payload)
            .context("decoding invocation payload")
            .map_err(EnvelopeError::PayloadParse)?;

        let fields = match payload {
            Value::Object(fields) => fields,
            payload @ Value::Array(_) if raw.function_error().is_some() => {
                return Ok(error_body(payload));
            }
            payload => return Ok(Response::from_parts(200, Encoding::Identity, payload)),
        };

        if let Some(function_error) = raw.function_error() {
            let error_message = match fields.get("errorMessage") {
                Some(message) if function_error != UNHANDLED && fields.len() == 1 => message,
                _ => {
                    log::debug!("treating {} function error payload as body", function_error);
                    return Ok(error_body(Value::Object(fields)));
                }
            };

            let details = match error_message
                .as_str()
                .and_then(|text| serde_json::from_str::<Value>(text).ok())
            {
                Some(details) => details,
                None => return Ok(error_body(error_message.clone())),
            };

            return from_error_details(details);
        }

        if !fields.contains_key("body") {
            return Ok(Response::from_parts(
                200,
                Encoding::Identity,
                Value::Object(fields),
            ));
        }

        serde_json::from_value::<Response>(Value::Object(fields))
            .context("decoding response fields")
            .map_err(EnvelopeError::PayloadParse)
    }
}

fn error_body(body: Value) -> Response {
    Response::from_parts(ERROR_STATUS_CODE, Encoding::Identity, body)
}

fn from_error_details(details: Value) -> Result<Response, EnvelopeError> {
    if !details.is_object() {
        return Ok(error_body(details));
    }

    let options: ResponseOptions = serde_json::from_value(details.clone())
        .context("decoding error message fields")
        .map_err(EnvelopeError::PayloadParse)?;

    Ok(Response::from_parts(
        options
            .status_code
            .filter(|code| *code != 0)
            .unwrap_or(ERROR_STATUS_CODE),
        options.encoding.unwrap_or_default(),
        options.body.unwrap_or(details),
    ))
}
