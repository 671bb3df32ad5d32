use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Specification of a callable function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the function parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl From<&FunctionDefinition> for Value {
    fn from(definition: &FunctionDefinition) -> Self {
        let mut value = json!({ "name": definition.name });
        if let Some(description) = &definition.description {
            value["description"] = Value::from(description.as_str());
        }
        if let Some(parameters) = &definition.parameters {
            value["parameters"] = parameters.clone();
        }
        value
    }
}
