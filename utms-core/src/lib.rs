//! UTMS Core - Fundamental types
//!
//! This crate provides the core types used throughout UTMS:
//! - `Number`: Arbitrary precision decimal numbers
//! - Error taxonomy (`DefinitionError`, `LookupError`, `DomainError`, ...)
//! - `EngineConfig`: numeric and display settings
//! - Civil-date arithmetic and the Gregorian leap-year rule

mod number;
mod error;
mod config;
pub mod civil;

pub use number::{Number, NumberError, Scientific, WORK_PRECISION};
pub use error::{
    codes, DefinitionError, DomainError, EntityKind, LookupError, PrecisionError, Severity,
    UtmsError,
};
pub use config::EngineConfig;
pub use civil::{is_leap_year, CivilError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_i64() {
        let n = Number::from_i64(42);
        assert_eq!(n.to_i64(), Some(42));
    }

    #[test]
    fn test_leap_year_reexport() {
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
    }

    #[test]
    fn test_error_from_number() {
        let err: UtmsError = NumberError::DivisionByZero.into();
        assert_eq!(err.code(), codes::DIV_ZERO);
    }
}
