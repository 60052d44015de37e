//! Value renderer
//!
//! Renders numbers, breakdowns and conversion tables to text. Digits are
//! taken from the decimal itself, never from an `f64`.

use std::fmt;
use serde::Serialize;
use tracing::warn;
use utms_anchors::{Breakdown, Uncertainty};
use utms_core::{EngineConfig, Number, PrecisionError};
use utms_units::ConversionTable;

const ELLIPSIS: char = '…';

/// Display format chosen for a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Notation {
    Fixed,
    Scientific,
}

/// A rendered value plus the flags raised while rendering it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub text: String,
    pub notation: Notation,
    /// Text was cut to the display width
    pub truncated: bool,
    /// Digits shown are not the exact value. Informational only, so it
    /// does not count towards `is_flagged`
    pub rounded: bool,
    /// Exponent outside the configured budget
    #[serde(skip)]
    pub precision: Option<PrecisionError>,
}

impl Rendered {
    pub fn is_flagged(&self) -> bool {
        self.truncated || self.precision.is_some()
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Renders values under one `EngineConfig`
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: EngineConfig,
}

impl Formatter {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render a value
    ///
    /// Fixed point inside `[human_min, human_max)`, with no decimals for
    /// integers. Scientific with `significant_digits` digits outside it.
    pub fn render(&self, value: &Number) -> Rendered {
        let (text, notation, exponent) = self.raw(value);
        let rounded = Number::from_str(&text).map_or(true, |shown| shown.cmp(value).is_ne());
        let precision = exponent
            .filter(|e| e.abs() > self.config.max_exponent)
            .map(|exponent| PrecisionError {
                operation: "render".to_string(),
                exponent,
                budget: self.config.max_exponent,
            });
        let (text, truncated) = self.fit(text);

        let rendered = Rendered { text, notation, truncated, rounded, precision };
        if rendered.is_flagged() {
            warn!(text = %rendered.text, truncated, over_budget = rendered.precision.is_some(), "rendered value flagged");
        }
        rendered
    }

    fn raw(&self, value: &Number) -> (String, Notation, Option<i64>) {
        if value.is_zero() {
            return ("0".to_string(), Notation::Fixed, None);
        }
        let magnitude = value.abs();
        if magnitude >= self.config.human_min && magnitude < self.config.human_max {
            let places = if value.is_integer() { 0 } else { self.config.decimal_places };
            return (value.to_fixed(places), Notation::Fixed, value.magnitude());
        }
        match value.to_scientific(self.config.significant_digits) {
            Some(sci) => (sci.to_string(), Notation::Scientific, Some(sci.exponent)),
            None => ("0".to_string(), Notation::Fixed, None),
        }
    }

    /// Cut to `max_display_width` characters, ending in an ellipsis
    fn fit(&self, text: String) -> (String, bool) {
        let width = self.config.max_display_width;
        if width == 0 || text.chars().count() <= width {
            return (text, false);
        }
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push(ELLIPSIS);
        (cut, true)
    }

    /// `value unit`
    pub fn render_unit(&self, value: &Number, unit: &str) -> String {
        format!("{} {}", self.render(value), unit)
    }

    /// `value ± effective uncertainty`
    pub fn render_with_uncertainty(&self, value: &Number, uncertainty: &Uncertainty) -> Rendered {
        let main = self.render(value);
        let spread = self.render(&uncertainty.effective(value));
        Rendered {
            text: format!("{} ± {}", main.text, spread.text),
            notation: main.notation,
            truncated: main.truncated || spread.truncated,
            rounded: main.rounded || spread.rounded,
            precision: main.precision.or(spread.precision),
        }
    }

    /// Sign followed by `count unit` pairs
    ///
    /// Zero counts are skipped except for the smallest unit, which carries
    /// the leftover fraction.
    pub fn render_breakdown(&self, breakdown: &Breakdown) -> String {
        let mut parts = Vec::with_capacity(breakdown.components.len());
        let last = breakdown.components.len().saturating_sub(1);
        for (i, component) in breakdown.components.iter().enumerate() {
            if i == last {
                let count = breakdown.last_fractional().unwrap_or_else(|| component.count.clone());
                parts.push(self.render_unit(&count, &component.unit));
            } else if !component.count.is_zero() {
                parts.push(format!("{} {}", component.count.to_fixed(0), component.unit));
            }
        }
        if parts.is_empty() {
            parts.push(self.render_unit(&breakdown.remainder, "s"));
        }
        format!("{} {}", breakdown.sign(), parts.join(" "))
    }

    /// Markdown table of a conversion matrix
    pub fn render_table(&self, table: &ConversionTable) -> String {
        let mut output = String::new();
        output.push_str(&format!("| {} |", table.center));
        for column in &table.columns {
            output.push_str(&format!(" {} |", column));
        }
        output.push('\n');
        output.push('|');
        output.push_str(&"---|".repeat(table.columns.len() + 1));
        output.push('\n');

        for (row, cells) in table.rows.iter().zip(&table.cells) {
            output.push_str(&format!("| {} |", row));
            for cell in cells {
                output.push_str(&format!(" {} |", self.render(cell)));
            }
            output.push('\n');
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utms_anchors::BreakdownComponent;

    fn n(s: &str) -> Number {
        Number::from_str(s).unwrap()
    }

    fn render(s: &str) -> String {
        Formatter::default().render(&n(s)).text
    }

    #[test]
    fn test_fixed_band() {
        assert_eq!(render("18000"), "18000");
        assert_eq!(render("3472.222222222"), "3472.22222");
        assert_eq!(render("0.001"), "0.00100");
        assert_eq!(render("-42"), "-42");
        assert_eq!(render("0"), "0");
    }

    #[test]
    fn test_scientific_outside_band() {
        assert_eq!(render("1.25e7"), "1.2500e7");
        assert_eq!(render("0.000123456789"), "1.2346e-4");
        assert_eq!(render("-9.99999e-20"), "-1.0000e-19");
        let rendered = Formatter::default().render(&n("5.391247e-44"));
        assert_eq!(rendered.notation, Notation::Scientific);
        assert!(!rendered.is_flagged());
    }

    #[test]
    fn test_exponent_budget() {
        let formatter = Formatter::new(EngineConfig::default().with_max_exponent(100));
        let rendered = formatter.render(&n("3.15576e127"));
        assert_eq!(rendered.text, "3.1558e127");
        let err = rendered.precision.unwrap();
        assert_eq!(err.exponent, 127);
        assert_eq!(err.budget, 100);
    }

    #[test]
    fn test_rounding_is_reported() {
        let formatter = Formatter::default();
        assert!(!formatter.render(&n("18000")).rounded);
        assert!(!formatter.render(&n("1.25e7")).rounded);
        assert!(!formatter.render(&n("0.001")).rounded);

        let third = Number::one().checked_div(&n("3")).unwrap();
        let rendered = formatter.render(&third);
        assert_eq!(rendered.text, "0.33333");
        assert!(rendered.rounded);
        assert!(!rendered.is_flagged());

        assert!(formatter.render(&n("0.000123456789")).rounded);
        assert!(formatter.render_with_uncertainty(&n("10"), &Uncertainty::new(third, Number::zero())).rounded);
    }

    #[test]
    fn test_truncation_is_display_only() {
        let formatter = Formatter::new(EngineConfig::default().with_max_display_width(8));
        let value = n("1234567.123456");
        let rendered = formatter.render(&value);
        assert_eq!(rendered.text, "1234567…");
        assert!(rendered.truncated);
        assert_eq!(value, n("1234567.123456"));
    }

    #[test]
    fn test_uncertainty() {
        let formatter = Formatter::default();
        let u = Uncertainty::new(n("0.5"), Number::zero());
        assert_eq!(formatter.render_with_uncertainty(&n("10"), &u).text, "10 ± 0.50000");
    }

    #[test]
    fn test_breakdown() {
        let component = |unit: &str, count: i64, length: i64| BreakdownComponent {
            unit: unit.to_string(),
            count: Number::from_i64(count),
            length: Number::from_i64(length),
            walked_from: Number::zero(),
        };
        let breakdown = Breakdown {
            negative: true,
            anchor: Number::from_i64(95_400),
            target: Number::zero(),
            total: Number::from_i64(95_400),
            components: vec![component("d", 1, 86_400), component("h", 0, 3_600), component("m", 150, 60)],
            remainder: Number::zero(),
            remainder_in_smallest: Some(Number::zero()),
        };
        assert_eq!(Formatter::default().render_breakdown(&breakdown), "- 1 d 150 m");
    }

    #[test]
    fn test_table() {
        let table = ConversionTable {
            center: "s".to_string(),
            rows: vec!["s".to_string()],
            columns: vec!["s".to_string(), "m".to_string()],
            cells: vec![vec![Number::one(), n("0.0166666666666666666667")]],
            ref_ts: None,
        };
        let text = Formatter::default().render_table(&table);
        assert_eq!(text, "| s | s | m |\n|---|---|---|\n| s | 1 | 0.01667 |\n");
    }
}
