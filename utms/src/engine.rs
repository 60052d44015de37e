//! Engine facade
//!
//! `EngineBuilder` collects unit, calendar and anchor definitions, validates
//! them as one batch and produces an `Engine`. Units and calendars are
//! immutable afterwards; anchors stay mutable through `Engine::anchors`.

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utms_anchors::{
    resolve_value, AnchorResolver, AnchorSpec, AnchorStore, Breakdown, BreakdownEngine,
    BreakdownOutcome,
};
use utms_calendar::{gregorian, ifc, load_calendar_strategies, Calendar, CalendarSpec};
use utms_core::{EngineConfig, LookupError, Number, UtmsError};
use utms_format::Formatter;
use utms_units::{
    load_generic_strategies, standard_unit_specs, ConversionEngine, ConversionTable, Converted,
    RegistryBuilder, StrategyCatalog, UnitRegistry, UnitSpec, UnitStrategy, UnitSummary,
};
use crate::clock::{Clock, SystemClock};

/// Everything an engine is built from, as plain data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub units: Vec<UnitSpec>,
    #[serde(default)]
    pub calendars: Vec<CalendarSpec>,
    #[serde(default)]
    pub anchors: Vec<AnchorSpec>,
}

impl Definitions {
    pub fn from_json(json: &str) -> Result<Self, UtmsError> {
        serde_json::from_str(json).map_err(|e| UtmsError::Config(e.to_string()))
    }
}

pub struct EngineBuilder {
    config: EngineConfig,
    catalog: StrategyCatalog,
    units: Vec<UnitSpec>,
    calendars: Vec<CalendarSpec>,
    anchors: Vec<AnchorSpec>,
    resolver: Option<Arc<dyn AnchorResolver>>,
    clock: Arc<dyn Clock>,
}

impl EngineBuilder {
    /// No definitions yet; every built-in strategy is available
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            catalog: load_calendar_strategies(load_generic_strategies(StrategyCatalog::new())),
            units: Vec::new(),
            calendars: Vec::new(),
            anchors: Vec::new(),
            resolver: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Standard units plus the Gregorian and International Fixed calendars
    pub fn standard(config: EngineConfig) -> Self {
        let mut builder = Self::new(config).with_units(standard_unit_specs());
        builder.units.extend(gregorian::unit_specs());
        builder.units.extend(ifc::unit_specs());
        builder
            .with_calendar(gregorian::calendar_spec())
            .with_calendar(ifc::calendar_spec())
    }

    /// Builder from JSON definitions, on top of the built-in strategies
    pub fn from_json(json: &str) -> Result<Self, UtmsError> {
        let defs = Definitions::from_json(json)?;
        Ok(Self::from_definitions(defs))
    }

    pub fn from_definitions(defs: Definitions) -> Self {
        let mut builder = Self::new(defs.config).with_units(defs.units);
        builder.calendars = defs.calendars;
        builder.anchors = defs.anchors;
        builder
    }

    pub fn with_strategy<S: UnitStrategy + 'static>(mut self, strategy: S) -> Self {
        self.catalog = self.catalog.with_strategy(strategy);
        self
    }

    pub fn with_unit(mut self, spec: UnitSpec) -> Self {
        self.units.push(spec);
        self
    }

    pub fn with_units(mut self, specs: Vec<UnitSpec>) -> Self {
        self.units.extend(specs);
        self
    }

    pub fn with_calendar(mut self, spec: CalendarSpec) -> Self {
        self.calendars.push(spec);
        self
    }

    pub fn with_anchor(mut self, spec: AnchorSpec) -> Self {
        self.anchors.push(spec);
        self
    }

    pub fn with_resolver<R: AnchorResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Validate everything; the first definition error rejects the batch
    pub fn build(self) -> Result<Engine, UtmsError> {
        self.config.validate()?;
        let mut registry = RegistryBuilder::new(self.catalog);
        for spec in self.units {
            registry.register(spec)?;
        }
        let units = Arc::new(registry.build()?);

        let mut calendars = BTreeMap::new();
        for spec in self.calendars {
            let name = spec.name.clone();
            let calendar = Calendar::new(spec, Arc::clone(&units))?;
            if calendars.insert(name.clone(), calendar).is_some() {
                return Err(utms_core::DefinitionError::InvalidCalendar {
                    calendar: name,
                    reason: "defined twice".to_string(),
                }
                .into());
            }
        }

        let anchors = AnchorStore::from_specs(self.anchors)?;

        info!(
            units = units.len(),
            calendars = calendars.len(),
            anchors = anchors.len(),
            "engine built"
        );

        Ok(Engine {
            converter: ConversionEngine::new(Arc::clone(&units), self.config.clone()),
            breakdowns: BreakdownEngine::new(Arc::clone(&units)),
            formatter: Formatter::new(self.config.clone()),
            config: self.config,
            units,
            calendars,
            anchors,
            resolver: self.resolver,
            clock: self.clock,
        })
    }
}

/// Every breakdown spec of one anchor against one target
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorBreakdown {
    pub label: String,
    pub anchor_value: Number,
    pub target: Number,
    pub outcomes: Vec<BreakdownOutcome>,
}

pub struct Engine {
    config: EngineConfig,
    units: Arc<UnitRegistry>,
    calendars: BTreeMap<String, Calendar>,
    anchors: AnchorStore,
    converter: ConversionEngine,
    breakdowns: BreakdownEngine,
    formatter: Formatter,
    resolver: Option<Arc<dyn AnchorResolver>>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Standard units and calendars, no anchors
    pub fn standard(config: EngineConfig) -> Result<Self, UtmsError> {
        EngineBuilder::standard(config).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    /// Every unit in registration order
    pub fn list_units(&self) -> Vec<UnitSummary> {
        self.units.list()
    }

    pub fn convert(&self, value: &Number, from: &str, to: &str, ref_ts: Option<&Number>) -> Result<Number, UtmsError> {
        self.converter.convert(value, from, to, ref_ts)
    }

    pub fn convert_all(&self, value: &Number, from: &str, ref_ts: Option<&Number>) -> Result<Vec<Converted>, UtmsError> {
        self.converter.convert_all(value, from, ref_ts)
    }

    pub fn table(&self, center: &str, cols: usize, rows: usize, ref_ts: Option<&Number>) -> Result<ConversionTable, UtmsError> {
        self.converter.table(center, cols, rows, ref_ts)
    }

    pub fn calendar(&self, name: &str) -> Result<&Calendar, LookupError> {
        self.calendars.get(name).ok_or_else(|| LookupError::calendar(name))
    }

    pub fn calendars(&self) -> impl Iterator<Item = &Calendar> {
        self.calendars.values()
    }

    pub fn anchors(&self) -> &AnchorStore {
        &self.anchors
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn now(&self) -> Number {
        self.clock.now()
    }

    /// Current value of an anchor
    ///
    /// A dynamic anchor is resolved through the configured resolver and the
    /// result recorded in the store.
    pub fn resolve_anchor_value(&self, label: &str) -> Result<Number, UtmsError> {
        let anchor = self.anchors.get(label)?;
        let value = resolve_value(&anchor, self.resolver.as_deref())?;
        if anchor.is_dynamic() && anchor.value() != Some(&value) {
            self.anchors.set_value(label, value.clone())?;
            debug!(%label, %value, "resolved dynamic anchor");
        }
        Ok(value)
    }

    /// Break the time from an anchor to `target` (default: now) down into
    /// each of the anchor's breakdown specs
    pub fn breakdown(&self, label: &str, target: Option<&Number>) -> Result<AnchorBreakdown, UtmsError> {
        let anchor = self.anchors.get(label)?;
        let anchor_value = self.resolve_anchor_value(label)?;
        let target = target.cloned().unwrap_or_else(|| self.clock.now());
        let outcomes = self.breakdowns.breakdown_all(&anchor_value, &target, anchor.breakdowns());
        Ok(AnchorBreakdown {
            label: label.to_string(),
            anchor_value,
            target,
            outcomes,
        })
    }

    /// Break the time from an anchor to `target` down into `units`
    pub fn breakdown_units<S: AsRef<str>>(&self, label: &str, target: Option<&Number>, units: &[S]) -> Result<Breakdown, UtmsError> {
        let anchor_value = self.resolve_anchor_value(label)?;
        let target = target.cloned().unwrap_or_else(|| self.clock.now());
        self.breakdowns.breakdown(&anchor_value, &target, units)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("units", &self.units.len())
            .field("calendars", &self.calendars.keys().collect::<Vec<_>>())
            .field("anchors", &self.anchors.len())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}
