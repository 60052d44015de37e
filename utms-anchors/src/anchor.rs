//! Anchor definitions
//!
//! An `AnchorSpec` is plain data from a loader or a JSON document.
//! `Anchor::from_spec` validates it and fixes the value: literals are kept
//! as given, ISO datetimes become epoch seconds, dynamic values keep their
//! expression for an `AnchorResolver`.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use utms_core::civil::parse_iso;
use utms_core::{DefinitionError, Number};

/// Measurement uncertainty attached to an anchor value
///
/// Stored and surfaced unchanged; only the formatter reads
/// `effective`/`interval` when asked to show a ± term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uncertainty {
    /// Absolute uncertainty in seconds
    #[serde(default = "default_absolute")]
    pub absolute: Number,
    /// Relative uncertainty as a fraction of the value
    #[serde(default = "Number::zero")]
    pub relative: Number,
    /// 95% confidence interval, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_95: Option<(Number, Number)>,
}

fn default_absolute() -> Number {
    Number::pow10(-9)
}

impl Default for Uncertainty {
    fn default() -> Self {
        Self {
            absolute: default_absolute(),
            relative: Number::zero(),
            confidence_95: None,
        }
    }
}

impl Uncertainty {
    pub fn new(absolute: Number, relative: Number) -> Self {
        Self { absolute, relative, confidence_95: None }
    }

    pub fn with_confidence_95(mut self, low: Number, high: Number) -> Self {
        self.confidence_95 = Some((low, high));
        self
    }

    /// `max(absolute, |value * relative|)`
    pub fn effective(&self, value: &Number) -> Number {
        let relative = value.mul(&self.relative).abs();
        if relative > self.absolute {
            relative
        } else {
            self.absolute.clone()
        }
    }

    /// `(value - effective, value + effective)`
    pub fn interval(&self, value: &Number) -> (Number, Number) {
        let eff = self.effective(value);
        (value.sub(&eff), value.add(&eff))
    }
}

/// Rendering directive kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Table,
    Scientific,
    Units,
    DateTime,
    Calendar,
}

/// How an anchor wants to be shown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSpec {
    pub format: FormatKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<String>,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

fn default_style() -> String {
    "default".to_string()
}

impl FormatSpec {
    pub fn new(format: FormatKind) -> Self {
        Self {
            format,
            units: Vec::new(),
            style: default_style(),
            options: BTreeMap::new(),
        }
    }

    /// Unit listing; the unit ids are mirrored into `options["units"]`
    pub fn units<S: AsRef<str>>(units: &[S]) -> Self {
        let units: Vec<String> = units.iter().map(|u| u.as_ref().to_string()).collect();
        let mut options = BTreeMap::new();
        options.insert("units".to_string(), units.join(","));
        Self {
            format: FormatKind::Units,
            units,
            style: default_style(),
            options,
        }
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.style = style.to_string();
        self
    }

    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.insert(key.to_string(), value.to_string());
        self
    }
}

/// Where an anchor's value comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorValue {
    /// Seconds since the Unix epoch
    Literal(Number),
    /// ISO-8601 date or datetime
    DateTime(String),
    /// Expression evaluated by an external resolver on every read
    Dynamic {
        expression: String,
        /// Last value the resolver produced
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last: Option<Number>,
    },
}

/// Definition of a single anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub label: String,
    pub name: String,
    pub value: AnchorValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<Uncertainty>,
    /// Ordered unit-id sequences, each broken down independently
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdowns: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<FormatSpec>,
}

impl AnchorSpec {
    pub fn literal(label: &str, name: &str, value: Number) -> Self {
        Self::with_value(label, name, AnchorValue::Literal(value))
    }

    pub fn datetime(label: &str, name: &str, iso: &str) -> Self {
        Self::with_value(label, name, AnchorValue::DateTime(iso.to_string()))
    }

    pub fn dynamic(label: &str, name: &str, expression: &str) -> Self {
        Self::with_value(label, name, AnchorValue::Dynamic {
            expression: expression.to_string(),
            last: None,
        })
    }

    fn with_value(label: &str, name: &str, value: AnchorValue) -> Self {
        Self {
            label: label.to_string(),
            name: name.to_string(),
            value,
            groups: Vec::new(),
            precision: None,
            uncertainty: None,
            breakdowns: Vec::new(),
            formats: Vec::new(),
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.groups.push(group.to_string());
        self
    }

    pub fn with_precision(mut self, precision: Number) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_uncertainty(mut self, uncertainty: Uncertainty) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    pub fn with_breakdown<S: AsRef<str>>(mut self, units: &[S]) -> Self {
        self.breakdowns.push(units.iter().map(|u| u.as_ref().to_string()).collect());
        self
    }

    pub fn with_format(mut self, format: FormatSpec) -> Self {
        self.formats.push(format);
        self
    }
}

/// How the stored value was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorSource {
    Literal,
    DateTime(String),
    Dynamic(String),
}

/// A validated anchor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anchor {
    label: String,
    name: String,
    /// `None` only for a dynamic anchor that was never resolved
    value: Option<Number>,
    source: AnchorSource,
    groups: Vec<String>,
    precision: Number,
    uncertainty: Uncertainty,
    breakdowns: Vec<Vec<String>>,
    formats: Vec<FormatSpec>,
}

fn default_precision() -> Number {
    Number::pow10(-6)
}

impl Anchor {
    pub fn from_spec(spec: AnchorSpec) -> Result<Self, DefinitionError> {
        let invalid = |reason: String| DefinitionError::InvalidAnchor {
            label: spec.label.clone(),
            reason,
        };

        if spec.label.trim().is_empty() {
            return Err(invalid("label is empty".to_string()));
        }
        if spec.label.contains(',') {
            return Err(invalid("label must not contain ','".to_string()));
        }
        if let Some(precision) = &spec.precision {
            if !precision.is_positive() {
                return Err(invalid(format!("precision {} must be positive", precision)));
            }
        }
        if let Some(position) = spec.breakdowns.iter().position(|b| b.is_empty()) {
            return Err(invalid(format!("breakdown {} has no units", position)));
        }

        let (value, source) = match &spec.value {
            AnchorValue::Literal(n) => (Some(n.clone()), AnchorSource::Literal),
            AnchorValue::DateTime(iso) => {
                let ts = parse_iso(iso).map_err(|e| invalid(e.to_string()))?;
                (Some(ts), AnchorSource::DateTime(iso.clone()))
            }
            AnchorValue::Dynamic { expression, last } => {
                if expression.trim().is_empty() {
                    return Err(invalid("dynamic expression is empty".to_string()));
                }
                (last.clone(), AnchorSource::Dynamic(expression.clone()))
            }
        };

        Ok(Self {
            label: spec.label,
            name: spec.name,
            value,
            source,
            groups: spec.groups,
            precision: spec.precision.unwrap_or_else(default_precision),
            uncertainty: spec.uncertainty.unwrap_or_default(),
            breakdowns: spec.breakdowns,
            formats: if spec.formats.is_empty() {
                vec![FormatSpec::new(FormatKind::Calendar)]
            } else {
                spec.formats
            },
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored value; for a dynamic anchor the last resolved one
    pub fn value(&self) -> Option<&Number> {
        self.value.as_ref()
    }

    pub fn source(&self) -> &AnchorSource {
        &self.source
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, AnchorSource::Dynamic(_))
    }

    /// Expression of a dynamic anchor
    pub fn expression(&self) -> Option<&str> {
        match &self.source {
            AnchorSource::Dynamic(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn precision(&self) -> &Number {
        &self.precision
    }

    pub fn uncertainty(&self) -> &Uncertainty {
        &self.uncertainty
    }

    pub fn breakdowns(&self) -> &[Vec<String>] {
        &self.breakdowns
    }

    pub fn formats(&self) -> &[FormatSpec] {
        &self.formats
    }

    /// Copy with a new value; a dynamic anchor keeps its expression and
    /// records the value as its last resolution, any other anchor becomes a
    /// literal
    pub(crate) fn with_value(&self, value: Number) -> Self {
        let mut next = self.clone();
        if !next.is_dynamic() {
            next.source = AnchorSource::Literal;
        }
        next.value = Some(value);
        next
    }

    /// Spec that recreates this anchor
    pub fn to_spec(&self) -> AnchorSpec {
        let value = match (&self.source, &self.value) {
            (AnchorSource::Dynamic(expression), last) => AnchorValue::Dynamic {
                expression: expression.clone(),
                last: last.clone(),
            },
            (AnchorSource::DateTime(iso), _) => AnchorValue::DateTime(iso.clone()),
            (AnchorSource::Literal, value) => AnchorValue::Literal(value.clone().unwrap_or_else(Number::zero)),
        };
        AnchorSpec {
            label: self.label.clone(),
            name: self.name.clone(),
            value,
            groups: self.groups.clone(),
            precision: Some(self.precision.clone()),
            uncertainty: Some(self.uncertainty.clone()),
            breakdowns: self.breakdowns.clone(),
            formats: self.formats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> Number {
        Number::from_str(s).unwrap()
    }

    #[test]
    fn test_literal_anchor() {
        let spec = AnchorSpec::literal("bb", "Big Bang", n("-4.35e17"))
            .in_group("cosmic")
            .with_breakdown(&["Ga", "Ma"]);
        let anchor = Anchor::from_spec(spec).unwrap();
        assert_eq!(anchor.value(), Some(&n("-4.35e17")));
        assert!(anchor.in_group("cosmic"));
        assert!(!anchor.is_dynamic());
        assert_eq!(anchor.breakdowns(), &[vec!["Ga".to_string(), "Ma".to_string()]]);
        assert_eq!(anchor.formats()[0].format, FormatKind::Calendar);
    }

    #[test]
    fn test_datetime_anchor() {
        let anchor = Anchor::from_spec(AnchorSpec::datetime("y2k", "Y2K", "2000-01-01T00:00:00Z")).unwrap();
        assert_eq!(anchor.value(), Some(&Number::from_i64(946_684_800)));
        assert_eq!(anchor.source(), &AnchorSource::DateTime("2000-01-01T00:00:00Z".to_string()));
    }

    #[test]
    fn test_invalid_anchors() {
        let bad_date = Anchor::from_spec(AnchorSpec::datetime("x", "X", "2000-13-01"));
        assert!(matches!(bad_date, Err(DefinitionError::InvalidAnchor { .. })));

        let empty_label = Anchor::from_spec(AnchorSpec::literal(" ", "X", Number::zero()));
        assert!(empty_label.is_err());

        let comma = Anchor::from_spec(AnchorSpec::literal("a,b", "X", Number::zero()));
        assert!(comma.is_err());

        let empty_breakdown = Anchor::from_spec(
            AnchorSpec::literal("x", "X", Number::zero()).with_breakdown::<&str>(&[]),
        );
        assert_eq!(empty_breakdown.unwrap_err().subject(), "x");

        let precision = Anchor::from_spec(
            AnchorSpec::literal("x", "X", Number::zero()).with_precision(Number::zero()),
        );
        assert!(precision.is_err());
    }

    #[test]
    fn test_dynamic_anchor_starts_unresolved() {
        let anchor = Anchor::from_spec(AnchorSpec::dynamic("now", "Now", "(current-time)")).unwrap();
        assert!(anchor.is_dynamic());
        assert_eq!(anchor.value(), None);
        assert_eq!(anchor.expression(), Some("(current-time)"));

        let resolved = anchor.with_value(Number::from_i64(10));
        assert_eq!(resolved.value(), Some(&Number::from_i64(10)));
        assert!(resolved.is_dynamic());
    }

    #[test]
    fn test_uncertainty() {
        let default = Uncertainty::default();
        assert_eq!(default.absolute, n("1e-9"));
        assert_eq!(default.effective(&n("1000")), n("1e-9"));

        let u = Uncertainty::new(n("0.5"), n("0.01"));
        assert_eq!(u.effective(&n("10")), n("0.5"));
        assert_eq!(u.effective(&n("-1000")), n("10"));
        assert_eq!(u.interval(&n("1000")), (n("990"), n("1010")));
    }

    #[test]
    fn test_units_format_spec() {
        let spec = FormatSpec::units(&["Y", "d", "h"]);
        assert_eq!(spec.format, FormatKind::Units);
        assert_eq!(spec.style, "default");
        assert_eq!(spec.options.get("units").map(String::as_str), Some("Y,d,h"));
    }

    #[test]
    fn test_spec_from_json() {
        let json = r#"{
            "label": "unix",
            "name": "Unix Epoch",
            "value": { "datetime": "1970-01-01" },
            "groups": ["default"],
            "uncertainty": { "relative": "1e-6" },
            "breakdowns": [["Y", "d"]],
            "formats": [{ "format": "scientific" }]
        }"#;
        let spec: AnchorSpec = serde_json::from_str(json).unwrap();
        let anchor = Anchor::from_spec(spec).unwrap();
        assert_eq!(anchor.value(), Some(&Number::zero()));
        assert_eq!(anchor.uncertainty().absolute, n("1e-9"));
        assert_eq!(anchor.uncertainty().relative, n("1e-6"));
        assert_eq!(anchor.formats()[0].format, FormatKind::Scientific);
        assert_eq!(anchor.formats()[0].style, "default");

        let back = anchor.to_spec();
        assert_eq!(back.value, AnchorValue::DateTime("1970-01-01".to_string()));
    }
}
