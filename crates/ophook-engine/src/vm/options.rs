//! VM configuration
//!
//! Options can be built in code or read from a TOML file:
//!
//! ```toml
//! negation_order = "constant_first"
//! max_instructions = 500000
//! strict_contracts = true
//! verify = true
//! ```
//!
//! `max_instructions = "unlimited"` removes the budget. Leaving the key out
//! keeps the default budget.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::defaults::{DEFAULT_MAX_INSTRUCTIONS, DEFAULT_STRICT_CONTRACTS, DEFAULT_VERIFY};
use crate::hook::classifier::NegationOrder;

/// Errors that can occur while loading options
#[derive(Debug, Error)]
pub enum OptionsError {
    /// Failed to read options file
    #[error("Failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse options: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to serialize options: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Semantically invalid value
    #[error("Invalid options: {0}")]
    Invalid(String),
}

/// Options for creating a VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmOptions {
    /// Operand order of desugared unary negate/plus
    pub negation_order: NegationOrder,

    /// Instruction budget per `execute` call (`None` = unlimited)
    #[serde(with = "budget")]
    pub max_instructions: Option<u64>,

    /// Panic on contract violations instead of returning an error
    pub strict_contracts: bool,

    /// Verify functions before executing them
    pub verify: bool,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            negation_order: NegationOrder::default(),
            max_instructions: Some(DEFAULT_MAX_INSTRUCTIONS),
            strict_contracts: DEFAULT_STRICT_CONTRACTS,
            verify: DEFAULT_VERIFY,
        }
    }
}

impl VmOptions {
    /// Parse options from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        let options: VmOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render options as TOML
    pub fn to_toml_string(&self) -> Result<String, OptionsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_instructions == Some(0) {
            return Err(OptionsError::Invalid(
                "max_instructions must be positive or \"unlimited\"".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the negation operand order
    pub fn with_negation_order(mut self, order: NegationOrder) -> Self {
        self.negation_order = order;
        self
    }

    /// Set the instruction budget
    pub fn with_max_instructions(mut self, limit: Option<u64>) -> Self {
        self.max_instructions = limit;
        self
    }

    /// Enable or disable panicking on contract violations
    pub fn with_strict_contracts(mut self, strict: bool) -> Self {
        self.strict_contracts = strict;
        self
    }
}

/// TOML form of the instruction budget: an integer or `"unlimited"`
mod budget {
    use serde::de::{Error, Unexpected};
    use serde::{Deserialize, Deserializer, Serializer};

    const UNLIMITED: &str = "unlimited";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Limit(u64),
        Word(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(limit) => serializer.serialize_u64(*limit),
            None => serializer.serialize_str(UNLIMITED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Limit(limit) => Ok(Some(limit)),
            Repr::Word(word) if word == UNLIMITED => Ok(None),
            Repr::Word(word) => Err(D::Error::invalid_value(
                Unexpected::Str(&word),
                &"a positive integer or \"unlimited\"",
            )),
        }
    }
}
