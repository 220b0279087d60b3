use serde::{Deserialize, Serialize};

use super::JsonSchema;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    #[serde(rename = "function")]
    Function {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// JSON Schema for tool parameters (intentionally untyped).
        parameters: JsonSchema,
    },
}

impl Tool {
    #[must_use]
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: JsonSchema,
    ) -> Self {
        Self::Function {
            name: name.into(),
            description: Some(description.into()),
            parameters,
        }
    }

    /// Function tool whose parameter schema is derived from `TArgs`.
    ///
    /// # Errors
    /// Returns an error if the generated schema cannot be represented as JSON.
    pub fn function_for<TArgs: schemars::JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        let schema = serde_json::to_value(schemars::schema_for!(TArgs))?;
        Ok(Self::function(name, description, schema))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Function { name, .. } => name,
        }
    }
}
