use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tool::FunctionDefinition;
use crate::error::LlmError;

/// Smallest sampling value sent to providers that reject zero
pub const ZERO_SAMPLING_FLOOR: f64 = 0.01;

/// Generation parameters
///
/// Unset fields are `None` (or absent from `extra`). Values are never patched
/// in place; [`ChatParameters::merge`] produces a new set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    /// Sampling temperature in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate, greater than zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Functions the model may call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionDefinition>>,
    /// Provider-specific fields, passed through to the request body
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ChatParameters {
    /// Build from a loosely typed table, e.g. an endpoint's `parameters`
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidParameters`] when a known field has the
    /// wrong type or a value is out of range
    pub fn from_map(map: serde_json::Map<String, Value>) -> Result<Self, LlmError> {
        let parameters: Self =
            serde_json::from_value(Value::Object(map)).map_err(|e| LlmError::InvalidParameters(e.to_string()))?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Layer `overrides` on top of `self`
    ///
    /// Every field set in `overrides` wins, every unset field keeps the base
    /// value. `extra` keys merge the same way.
    #[must_use]
    pub fn merge(&self, overrides: &Self) -> Self {
        let mut extra = self.extra.clone();
        extra.extend(overrides.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            temperature: overrides.temperature.or(self.temperature),
            top_p: overrides.top_p.or(self.top_p),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            stop: overrides.stop.clone().or_else(|| self.stop.clone()),
            functions: overrides.functions.clone().or_else(|| self.functions.clone()),
            extra,
        }
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check the universal ranges
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidParameters`] naming the first bad field
    pub fn validate(&self) -> Result<(), LlmError> {
        for (field, value) in [("temperature", self.temperature), ("top_p", self.top_p)] {
            if let Some(value) = value
                && !(0.0..=1.0).contains(&value)
            {
                return Err(LlmError::InvalidParameters(format!("{field} must be within [0, 1], got {value}")));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(LlmError::InvalidParameters("max_tokens must be greater than 0".to_owned()));
        }
        Ok(())
    }

    /// Replace zero temperature/top_p with `floor`
    ///
    /// Hook for providers that reject zero sampling values.
    #[must_use]
    pub fn with_nonzero_sampling(mut self, floor: f64) -> Self {
        let lift = |value: Option<f64>| value.map(|v| if v.abs() < f64::EPSILON { floor } else { v });
        self.temperature = lift(self.temperature);
        self.top_p = lift(self.top_p);
        self
    }

    /// Set fields as sorted `name -> value` text, unset fields omitted
    pub fn canonical_pairs(&self) -> BTreeMap<String, String> {
        let mut pairs = BTreeMap::new();

        if let Some(temperature) = self.temperature {
            pairs.insert("temperature".to_owned(), temperature.to_string());
        }
        if let Some(top_p) = self.top_p {
            pairs.insert("top_p".to_owned(), top_p.to_string());
        }
        if let Some(max_tokens) = self.max_tokens {
            pairs.insert("max_tokens".to_owned(), max_tokens.to_string());
        }
        if let Some(stop) = &self.stop {
            pairs.insert("stop".to_owned(), Value::from(stop.clone()).to_string());
        }
        if let Some(functions) = &self.functions {
            let functions: Vec<Value> = functions.iter().map(Value::from).collect();
            pairs.insert("functions".to_owned(), Value::Array(functions).to_string());
        }
        for (key, value) in &self.extra {
            pairs.insert(key.clone(), value.to_string());
        }

        pairs
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
