//! Conversion between units
//!
//! `value * from.length(ref) / to.length(ref)`. Fixed units need no
//! reference instant; a dynamic unit without one is an error rather than a
//! guess.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use utms_core::{DomainError, EngineConfig, Number, UtmsError};
use crate::{UnitRef, UnitRegistry};

/// Cross-conversion matrix: `cells[r][c]` is one `rows[r]` in `columns[c]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionTable {
    pub center: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<Number>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_ts: Option<Number>,
}

/// One entry of `convert_all`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Converted {
    pub unit: String,
    pub name: String,
    pub value: Number,
}

#[derive(Debug, Clone)]
pub struct ConversionEngine {
    units: Arc<UnitRegistry>,
    config: EngineConfig,
}

impl ConversionEngine {
    pub fn new(units: Arc<UnitRegistry>, config: EngineConfig) -> Self {
        Self { units, config }
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Length of `unit` at the reference instant, or its fixed value
    fn length_at(&self, unit: &UnitRef<'_>, ref_ts: Option<&Number>, operation: &str) -> Result<Number, DomainError> {
        match (unit.unit().fixed_value(), ref_ts) {
            (Some(value), _) => Ok(value.clone()),
            (None, Some(ts)) => unit.length(ts),
            (None, None) => Err(DomainError::AmbiguousReference {
                unit: unit.id().to_string(),
                operation: operation.to_string(),
            }),
        }
    }

    /// Express `value` of `from` in `to`
    pub fn convert(&self, value: &Number, from: &str, to: &str, ref_ts: Option<&Number>) -> Result<Number, UtmsError> {
        let from_unit = self.units.resolve(from)?;
        let to_unit = self.units.resolve(to)?;

        let from_len = self.length_at(&from_unit, ref_ts, "convert")?;
        let to_len = self.length_at(&to_unit, ref_ts, "convert")?;

        let seconds = value.mul(&from_len);
        let result = seconds.checked_div(&to_len).map_err(|_| DomainError::DivisionByZero {
            unit: to.to_string(),
            timestamp: ref_ts.cloned(),
            operation: "convert".to_string(),
        })?;
        debug!(%from, %to, %value, %result, "converted");
        Ok(result)
    }

    /// `value` of `from` in every unit that can take part
    ///
    /// Without a reference instant dynamic targets are skipped.
    pub fn convert_all(&self, value: &Number, from: &str, ref_ts: Option<&Number>) -> Result<Vec<Converted>, UtmsError> {
        let from_unit = self.units.resolve(from)?;
        let seconds = value.mul(&self.length_at(&from_unit, ref_ts, "convert")?);

        let mut out = Vec::new();
        for (unit, length) in self.units.sorted_by_magnitude(ref_ts)? {
            let converted = seconds.checked_div(&length)?;
            out.push(Converted {
                unit: unit.id().to_string(),
                name: unit.name().to_string(),
                value: converted,
            });
        }
        Ok(out)
    }

    /// Conversion matrix centered on `center`, ordered by magnitude
    ///
    /// `cols` and `rows` are the number of units taken on each side of the
    /// center. Without `ref_ts` only fixed units take part.
    pub fn table(&self, center: &str, cols: usize, rows: usize, ref_ts: Option<&Number>) -> Result<ConversionTable, UtmsError> {
        let center_unit = self.units.resolve(center)?;
        if !center_unit.is_fixed() && ref_ts.is_none() {
            return Err(DomainError::AmbiguousReference {
                unit: center.to_string(),
                operation: "table".to_string(),
            }.into());
        }

        let ordered = self.units.sorted_by_magnitude(ref_ts)?;
        let center_index = ordered.iter()
            .position(|(u, _)| u.id() == center)
            .ok_or_else(|| utms_core::LookupError::unit(center))?;

        let window = |span: usize| {
            let start = center_index.saturating_sub(span);
            let end = (center_index + span + 1).min(ordered.len());
            start..end
        };
        let col_range = window(cols);
        let row_range = window(rows);

        let mut cells = Vec::with_capacity(row_range.len());
        for (_, row_len) in &ordered[row_range.clone()] {
            let mut line = Vec::with_capacity(col_range.len());
            for (_, col_len) in &ordered[col_range.clone()] {
                line.push(row_len.checked_div(col_len)?);
            }
            cells.push(line);
        }

        let ids = |range: std::ops::Range<usize>| {
            ordered[range].iter().map(|(u, _)| u.id().to_string()).collect::<Vec<_>>()
        };

        Ok(ConversionTable {
            center: center.to_string(),
            rows: ids(row_range),
            columns: ids(col_range),
            cells,
            ref_ts: ref_ts.cloned(),
        })
    }

    /// `convert` there and back, compared within the configured epsilon
    pub fn round_trips(&self, value: &Number, from: &str, to: &str, ref_ts: Option<&Number>) -> Result<bool, UtmsError> {
        let there = self.convert(value, from, to, ref_ts)?;
        let back = self.convert(&there, to, from, ref_ts)?;
        Ok(back.approx_eq(value, &self.config.epsilon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{load_generic_strategies, standard_unit_specs, StrategyCatalog, UnitSpec};
    use utms_core::codes;

    fn engine() -> ConversionEngine {
        let mut specs = standard_unit_specs();
        specs.push(
            UnitSpec::dynamic("fortnight", "Fortnight", "scaled")
                .depends_on("base", "d")
                .with_param("factor", Number::from_i64(14)),
        );
        let catalog = load_generic_strategies(StrategyCatalog::new());
        let registry = UnitRegistry::from_specs(specs, &catalog).unwrap();
        ConversionEngine::new(Arc::new(registry), EngineConfig::default())
    }

    fn n(s: &str) -> Number {
        Number::from_str(s).unwrap()
    }

    #[test]
    fn test_hours_to_seconds() {
        let result = engine().convert(&n("5"), "h", "s", None).unwrap();
        assert_eq!(result, Number::from_i64(18_000));
    }

    #[test]
    fn test_seconds_to_hours() {
        let result = engine().convert(&n("1.25e7"), "s", "h", None).unwrap();
        assert_eq!(result.to_fixed(5), "3472.22222");
    }

    #[test]
    fn test_fixed_round_trip() {
        let engine = engine();
        for (from, to) in [("pt", "GE"), ("lc", "ms"), ("Y", "d"), ("qs", "QS")] {
            assert!(engine.round_trips(&n("1.5"), from, to, None).unwrap(), "{} -> {}", from, to);
        }
    }

    #[test]
    fn test_dynamic_needs_reference() {
        let engine = engine();
        let err = engine.convert(&Number::one(), "fortnight", "d", None).unwrap_err();
        assert_eq!(err.code(), codes::AMBIGUOUS_REFERENCE);

        let ok = engine.convert(&Number::one(), "fortnight", "d", Some(&Number::zero())).unwrap();
        assert_eq!(ok, Number::from_i64(14));
    }

    #[test]
    fn test_unknown_unit() {
        let err = engine().convert(&Number::one(), "s", "parsec", None).unwrap_err();
        assert_eq!(err.code(), codes::NOT_FOUND);
    }

    #[test]
    fn test_table_window() {
        let table = engine().table("s", 2, 1, None).unwrap();
        assert_eq!(table.columns, vec!["us", "ms", "s", "m", "cd"]);
        assert_eq!(table.rows, vec!["ms", "s", "m"]);
        // one minute in seconds
        assert_eq!(table.cells[2][2], Number::from_i64(60));
        assert!(table.columns.iter().all(|c| c != "fortnight"));
    }

    #[test]
    fn test_table_edges_clamped() {
        let table = engine().table("pt", 3, 0, None).unwrap();
        assert_eq!(table.columns.len(), 4);
        assert_eq!(table.rows, vec!["pt"]);
    }

    #[test]
    fn test_table_dynamic_center() {
        let engine = engine();
        assert!(engine.table("fortnight", 1, 1, None).is_err());
        let table = engine.table("fortnight", 1, 1, Some(&Number::zero())).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows.contains(&"fortnight".to_string()));
    }

    #[test]
    fn test_convert_all() {
        let all = engine().convert_all(&Number::one(), "d", None).unwrap();
        let hours = all.iter().find(|c| c.unit == "h").unwrap();
        assert_eq!(hours.value, Number::from_i64(24));
        assert!(all.iter().all(|c| c.unit != "fortnight"));
    }
}
