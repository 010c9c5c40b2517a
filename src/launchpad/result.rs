//! Step result envelope
//!
//! Steps return an untyped [`StepResult`]. Call sites that know which stage
//! produced it can view the payload as a concrete type through
//! [`TypedResult`], and convert back for generic transport.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Payload plus optional message for the end user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step output of arbitrary shape
    #[serde(default)]
    pub value: Value,
    /// Message to be sent back to the user
    #[serde(
        rename = "assistant_response",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response: Option<String>,
}

impl StepResult {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            response: None,
        }
    }

    /// Serialize `value` into the payload.
    pub fn of<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::new)
    }

    #[must_use]
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }
}

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("result payload does not match {type_name}: {source}")]
    TypeMismatch {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A [`StepResult`] whose payload is viewed as `T`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedResult<T> {
    pub value: T,
    #[serde(
        rename = "assistant_response",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response: Option<String>,
}

impl<T> TypedResult<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            response: None,
        }
    }

    #[must_use]
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }
}

impl<T: DeserializeOwned> TypedResult<T> {
    /// Project the payload, reporting a shape mismatch.
    pub fn try_project(result: StepResult) -> Result<Self, ResultError> {
        let value = serde_json::from_value(result.value).map_err(|source| {
            ResultError::TypeMismatch {
                type_name: std::any::type_name::<T>(),
                source,
            }
        })?;
        Ok(Self {
            value,
            response: result.response,
        })
    }
}

impl<T: DeserializeOwned + Default> TypedResult<T> {
    /// Best-effort projection: a payload of a different shape yields
    /// `T::default()` instead of an error. Prefer [`Self::try_project`] when
    /// a mismatch should be noticed.
    pub fn project(result: StepResult) -> Self {
        let response = result.response;
        let value = serde_json::from_value(result.value).unwrap_or_else(|e| {
            tracing::warn!(
                target_type = std::any::type_name::<T>(),
                error = %e,
                "Result payload did not match declared type; using default"
            );
            T::default()
        });
        Self { value, response }
    }
}

impl<T: Serialize> TypedResult<T> {
    /// Drop the static type for transport to code that does not know it.
    ///
    /// Never fails: a value that cannot be represented as JSON becomes `null`
    /// and is logged.
    pub fn into_untyped(self) -> StepResult {
        let value = serde_json::to_value(&self.value).unwrap_or_else(|e| {
            tracing::warn!(
                source_type = std::any::type_name::<T>(),
                error = %e,
                "Result payload could not be serialized; using null"
            );
            Value::Null
        });
        StepResult {
            value,
            response: self.response,
        }
    }
}

impl<T: Serialize> From<TypedResult<T>> for StepResult {
    fn from(typed: TypedResult<T>) -> Self {
        typed.into_untyped()
    }
}
