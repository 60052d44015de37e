//! Structured errors
//!
//! Errors never crash the engine. Definition errors stop a load, everything
//! else is a typed result the caller can inspect, log or render.

use crate::{CivilError, Number, NumberError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const DUPLICATE_UNIT: &str = "DUPLICATE_UNIT";
    pub const CYCLIC_DEPENDENCY: &str = "CYCLIC_DEPENDENCY";
    pub const UNKNOWN_STRATEGY: &str = "UNKNOWN_STRATEGY";
    pub const MALFORMED_STRATEGY: &str = "MALFORMED_STRATEGY";
    pub const UNKNOWN_DEPENDENCY: &str = "UNKNOWN_DEPENDENCY";
    pub const INVALID_VALUE: &str = "INVALID_VALUE";
    pub const INVALID_CALENDAR: &str = "INVALID_CALENDAR";
    pub const DUPLICATE_ANCHOR: &str = "DUPLICATE_ANCHOR";
    pub const INVALID_ANCHOR: &str = "INVALID_ANCHOR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const NON_POSITIVE_LENGTH: &str = "NON_POSITIVE_LENGTH";
    pub const AMBIGUOUS_REFERENCE: &str = "AMBIGUOUS_REFERENCE";
    pub const DIV_ZERO: &str = "DIV_ZERO";
    pub const OUT_OF_RANGE: &str = "OUT_OF_RANGE";
    pub const UNRESOLVED_ANCHOR: &str = "UNRESOLVED_ANCHOR";
    pub const PRECISION: &str = "PRECISION";
    pub const NUMBER_ERROR: &str = "NUMBER_ERROR";
    pub const DATE_PARSE_ERROR: &str = "DATE_PARSE_ERROR";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Result was produced but flagged
    Warning,
    /// This query failed
    Error,
    /// The definitions cannot be loaded
    Fatal,
}

/// Raised while loading units, calendars or anchors. Fatal for the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("unit '{unit}' is already registered")]
    DuplicateUnit { unit: String },

    #[error("unit '{unit}' is part of a dependency cycle: {}", .units.join(" -> "))]
    CyclicDependency { unit: String, units: Vec<String> },

    #[error("unit '{unit}' uses unknown strategy '{strategy}'")]
    UnknownStrategy { unit: String, strategy: String },

    #[error("unit '{unit}': strategy '{strategy}' {reason}")]
    MalformedStrategy { unit: String, strategy: String, reason: String },

    #[error("unit '{unit}' depends on unknown unit '{dependency}'")]
    UnknownDependency { unit: String, dependency: String },

    #[error("unit '{unit}' has invalid value {value}: {reason}")]
    InvalidValue { unit: String, value: String, reason: String },

    #[error("calendar '{calendar}' is invalid: {reason}")]
    InvalidCalendar { calendar: String, reason: String },

    #[error("anchor '{label}' already exists")]
    DuplicateAnchor { label: String },

    #[error("anchor '{label}' is invalid: {reason}")]
    InvalidAnchor { label: String, reason: String },
}

impl DefinitionError {
    /// Id of the offending unit, calendar or anchor
    pub fn subject(&self) -> &str {
        match self {
            Self::DuplicateUnit { unit }
            | Self::CyclicDependency { unit, .. }
            | Self::UnknownStrategy { unit, .. }
            | Self::MalformedStrategy { unit, .. }
            | Self::UnknownDependency { unit, .. }
            | Self::InvalidValue { unit, .. } => unit,
            Self::InvalidCalendar { calendar, .. } => calendar,
            Self::DuplicateAnchor { label } | Self::InvalidAnchor { label, .. } => label,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateUnit { .. } => codes::DUPLICATE_UNIT,
            Self::CyclicDependency { .. } => codes::CYCLIC_DEPENDENCY,
            Self::UnknownStrategy { .. } => codes::UNKNOWN_STRATEGY,
            Self::MalformedStrategy { .. } => codes::MALFORMED_STRATEGY,
            Self::UnknownDependency { .. } => codes::UNKNOWN_DEPENDENCY,
            Self::InvalidValue { .. } => codes::INVALID_VALUE,
            Self::InvalidCalendar { .. } => codes::INVALID_CALENDAR,
            Self::DuplicateAnchor { .. } => codes::DUPLICATE_ANCHOR,
            Self::InvalidAnchor { .. } => codes::INVALID_ANCHOR,
        }
    }
}

/// Kind of entity a lookup was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Unit,
    Calendar,
    Anchor,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unit => "unit",
            Self::Calendar => "calendar",
            Self::Anchor => "anchor",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },
}

impl LookupError {
    pub fn unit(id: impl Into<String>) -> Self {
        Self::NotFound { kind: EntityKind::Unit, id: id.into() }
    }

    pub fn calendar(id: impl Into<String>) -> Self {
        Self::NotFound { kind: EntityKind::Calendar, id: id.into() }
    }

    pub fn anchor(id: impl Into<String>) -> Self {
        Self::NotFound { kind: EntityKind::Anchor, id: id.into() }
    }
}

/// Query-time failures of a well-formed definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("unit '{unit}' has non-positive length {length} at {timestamp}")]
    NonPositiveLength { unit: String, timestamp: Number, length: Number },

    #[error("{operation} with dynamic unit '{unit}' needs a reference timestamp")]
    AmbiguousReference { unit: String, operation: String },

    #[error("division by zero in {operation} for unit '{unit}'{}", fmt_at(.timestamp))]
    DivisionByZero { unit: String, timestamp: Option<Number>, operation: String },

    #[error("unit '{unit}' cannot be evaluated at {timestamp}: {reason}")]
    OutOfRange { unit: String, timestamp: Number, reason: String },

    #[error("anchor '{label}' could not be resolved: {reason}")]
    UnresolvedAnchor { label: String, reason: String },
}

fn fmt_at(timestamp: &Option<Number>) -> String {
    match timestamp {
        Some(ts) => format!(" at {}", ts),
        None => String::new(),
    }
}

/// A value falls outside the configured exponent budget
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation}: exponent {exponent} exceeds the budget of {budget}")]
pub struct PrecisionError {
    pub operation: String,
    pub exponent: i64,
    pub budget: i64,
}

/// Umbrella error returned by the engine facade
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UtmsError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Precision(#[from] PrecisionError),

    #[error(transparent)]
    Number(#[from] NumberError),

    #[error(transparent)]
    Date(#[from] CivilError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl UtmsError {
    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Definition(e) => e.code(),
            Self::Lookup(_) => codes::NOT_FOUND,
            Self::Domain(e) => match e {
                DomainError::NonPositiveLength { .. } => codes::NON_POSITIVE_LENGTH,
                DomainError::AmbiguousReference { .. } => codes::AMBIGUOUS_REFERENCE,
                DomainError::DivisionByZero { .. } => codes::DIV_ZERO,
                DomainError::OutOfRange { .. } => codes::OUT_OF_RANGE,
                DomainError::UnresolvedAnchor { .. } => codes::UNRESOLVED_ANCHOR,
            },
            Self::Precision(_) => codes::PRECISION,
            Self::Number(NumberError::DivisionByZero) => codes::DIV_ZERO,
            Self::Number(_) => codes::NUMBER_ERROR,
            Self::Date(_) => codes::DATE_PARSE_ERROR,
            Self::Config(_) => codes::CONFIG_ERROR,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Definition(_) | Self::Config(_) => Severity::Fatal,
            Self::Precision(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}
