//! Engine configuration
//!
//! One `EngineConfig` value is built at startup and passed by reference to
//! the registry, the conversion engine and the formatter. Every field has a
//! default, so a partial JSON document is enough.

use crate::{Number, UtmsError};
use serde::{Deserialize, Serialize};

/// Numeric and display settings shared by every engine component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Relative tolerance for approximate comparisons.
    #[serde(default = "default_epsilon")]
    pub epsilon: Number,

    /// Significant digits in scientific rendering.
    #[serde(default = "default_significant_digits")]
    pub significant_digits: usize,

    /// Decimal places in fixed-point rendering.
    #[serde(default = "default_decimal_places")]
    pub decimal_places: usize,

    /// Smallest magnitude rendered in fixed point.
    #[serde(default = "default_human_min")]
    pub human_min: Number,

    /// Magnitudes at or above this are rendered in scientific notation.
    #[serde(default = "default_human_max")]
    pub human_max: Number,

    /// Largest decimal exponent rendered without a precision flag.
    #[serde(default = "default_max_exponent")]
    pub max_exponent: i64,

    /// Rendered values wider than this are truncated with an ellipsis.
    #[serde(default = "default_max_display_width")]
    pub max_display_width: usize,
}

// --- Default value functions for serde ---

fn default_epsilon() -> Number {
    Number::pow10(-30)
}

fn default_significant_digits() -> usize {
    5
}

fn default_decimal_places() -> usize {
    5
}

fn default_human_min() -> Number {
    Number::pow10(-3)
}

fn default_human_max() -> Number {
    Number::pow10(7)
}

fn default_max_exponent() -> i64 {
    200
}

fn default_max_display_width() -> usize {
    33
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            significant_digits: default_significant_digits(),
            decimal_places: default_decimal_places(),
            human_min: default_human_min(),
            human_max: default_human_max(),
            max_exponent: default_max_exponent(),
            max_display_width: default_max_display_width(),
        }
    }
}

impl EngineConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, UtmsError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| UtmsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants serde defaults cannot express
    pub fn validate(&self) -> Result<(), UtmsError> {
        if !self.epsilon.is_positive() {
            return Err(UtmsError::Config("epsilon must be positive".to_string()));
        }
        if self.significant_digits == 0 {
            return Err(UtmsError::Config("significant_digits must be at least 1".to_string()));
        }
        if self.human_min >= self.human_max {
            return Err(UtmsError::Config("human_min must be below human_max".to_string()));
        }
        Ok(())
    }

    /// Builder: set significant digits
    pub fn with_significant_digits(mut self, digits: usize) -> Self {
        self.significant_digits = digits.max(1);
        self
    }

    /// Builder: set decimal places
    pub fn with_decimal_places(mut self, places: usize) -> Self {
        self.decimal_places = places;
        self
    }

    /// Builder: set the display width limit
    pub fn with_max_display_width(mut self, width: usize) -> Self {
        self.max_display_width = width;
        self
    }

    /// Builder: set the exponent budget
    pub fn with_max_exponent(mut self, exponent: i64) -> Self {
        self.max_exponent = exponent;
        self
    }

    /// Builder: set the comparison tolerance
    pub fn with_epsilon(mut self, epsilon: Number) -> Self {
        self.epsilon = epsilon;
        self
    }
}
