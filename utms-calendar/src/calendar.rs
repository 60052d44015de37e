//! Calendars
//!
//! A calendar ties one day, week, month and year unit together and answers
//! positional questions (weekday, month, day of month) for a timestamp.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utms_core::{DefinitionError, DomainError, LookupError, Number, UtmsError};
use utms_units::{UnitRef, UnitRegistry};
use crate::strategies::local_date;

/// How the calendar's week relates to its days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekdayRule {
    /// Every day has a weekday
    #[default]
    Continuous,
    /// Some days sit outside the weekly rotation
    Intercalary,
}

/// Ids of the units a calendar is made of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSpec {
    pub name: String,
    pub day: String,
    pub week: String,
    pub month: String,
    pub year: String,
    #[serde(default)]
    pub weekday_rule: WeekdayRule,
}

/// Weekday of a day, or the name of the intercalary day it is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekPosition {
    Day(i64),
    Intercalary(String),
}

impl WeekPosition {
    pub fn index(&self) -> Option<i64> {
        match self {
            Self::Day(i) => Some(*i),
            Self::Intercalary(_) => None,
        }
    }
}

/// Where a timestamp falls in a calendar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarPosition {
    pub calendar: String,
    pub year: i64,
    pub month: Option<i64>,
    pub month_name: Option<String>,
    /// 1-based
    pub day_of_month: i64,
    pub weekday: WeekPosition,
    pub weekday_name: Option<String>,
}

/// One month (or intercalary slot) of a year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthLayout {
    pub index: Option<i64>,
    pub name: Option<String>,
    pub start: Number,
    pub length: Number,
    pub days: i64,
    pub first_weekday: WeekPosition,
}

/// Most slots a year can be split into (13 months and 2 intercalary days
/// fit well within this)
const MAX_MONTHS_PER_YEAR: usize = 64;

#[derive(Debug, Clone)]
pub struct Calendar {
    spec: CalendarSpec,
    units: Arc<UnitRegistry>,
}

impl Calendar {
    /// Bind a spec to a registry
    ///
    /// Every referenced unit must exist and, evaluated at the epoch, the week
    /// must be a whole number of days.
    pub fn new(spec: CalendarSpec, units: Arc<UnitRegistry>) -> Result<Self, DefinitionError> {
        let invalid = |reason: String| DefinitionError::InvalidCalendar {
            calendar: spec.name.clone(),
            reason,
        };

        for (role, id) in [("day", &spec.day), ("week", &spec.week), ("month", &spec.month), ("year", &spec.year)] {
            if !units.contains(id) {
                return Err(invalid(format!("{} unit '{}' is not registered", role, id)));
            }
        }

        let epoch = Number::zero();
        let day_len = units.get(&spec.day)
            .ok_or_else(|| invalid("day unit missing".to_string()))?
            .length(&epoch)
            .map_err(|e| invalid(e.to_string()))?;
        let week_len = units.get(&spec.week)
            .ok_or_else(|| invalid("week unit missing".to_string()))?
            .length(&epoch)
            .map_err(|e| invalid(e.to_string()))?;
        let ratio = week_len.checked_div(&day_len).map_err(|e| invalid(e.to_string()))?;
        if !ratio.is_integer() {
            return Err(invalid(format!("week of {} s is not a whole number of {} s days", week_len, day_len)));
        }

        debug!(calendar = %spec.name, "calendar bound");
        Ok(Self { spec, units })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &CalendarSpec {
        &self.spec
    }

    fn unit(&self, id: &str) -> Result<UnitRef<'_>, LookupError> {
        self.units.resolve(id)
    }

    pub fn day(&self) -> Result<UnitRef<'_>, LookupError> {
        self.unit(&self.spec.day)
    }

    pub fn week(&self) -> Result<UnitRef<'_>, LookupError> {
        self.unit(&self.spec.week)
    }

    pub fn month(&self) -> Result<UnitRef<'_>, LookupError> {
        self.unit(&self.spec.month)
    }

    pub fn year(&self) -> Result<UnitRef<'_>, LookupError> {
        self.unit(&self.spec.year)
    }

    /// Weekday of the day containing `ts`
    ///
    /// Intercalary calendars report days outside the rotation by name; the
    /// following day resumes the cycle.
    pub fn day_of_week(&self, ts: &Number) -> Result<WeekPosition, UtmsError> {
        let week = self.week()?;
        match (week.index(ts)?, self.spec.weekday_rule) {
            (Some(index), _) => Ok(WeekPosition::Day(index)),
            (None, WeekdayRule::Intercalary) => {
                let name = self.month()?.name_at(ts)?.unwrap_or("Intercalary Day");
                Ok(WeekPosition::Intercalary(name.to_string()))
            }
            (None, WeekdayRule::Continuous) => Err(DomainError::OutOfRange {
                unit: week.id().to_string(),
                timestamp: ts.clone(),
                reason: "week unit reports no weekday".to_string(),
            }.into()),
        }
    }

    pub fn weekday_name(&self, ts: &Number) -> Result<Option<String>, UtmsError> {
        let week = self.week()?;
        Ok(match self.day_of_week(ts)? {
            WeekPosition::Day(index) => week.names()
                .and_then(|names| usize::try_from(index).ok().and_then(|i| names.get(i)))
                .cloned(),
            WeekPosition::Intercalary(name) => Some(name),
        })
    }

    /// Days per week at `ts` (1 on an intercalary day)
    pub fn days_per_week(&self, ts: &Number) -> Result<Number, UtmsError> {
        let week_len = self.week()?.length(ts)?;
        let day_len = self.day()?.length(ts)?;
        Ok(week_len.checked_div(&day_len)?)
    }

    /// Year, month, day of month and weekday of `ts`
    pub fn position(&self, ts: &Number) -> Result<CalendarPosition, UtmsError> {
        let day = self.day()?;
        let month = self.month()?;
        let date = local_date(&day, ts)?;

        let month_start = month.start(ts)?;
        let day_of_month = ts.sub(&month_start).div_floor(&date.day_length)?
            .to_i64()
            .map(|d| d + 1)
            .ok_or_else(|| DomainError::OutOfRange {
                unit: month.id().to_string(),
                timestamp: ts.clone(),
                reason: "day of month out of range".to_string(),
            })?;

        Ok(CalendarPosition {
            calendar: self.spec.name.clone(),
            year: date.year,
            month: month.index(ts)?,
            month_name: month.name_at(ts)?.map(String::from),
            day_of_month,
            weekday: self.day_of_week(ts)?,
            weekday_name: self.weekday_name(ts)?,
        })
    }

    /// Every month (and intercalary slot) of the year containing `ts`
    pub fn month_layout(&self, ts: &Number) -> Result<Vec<MonthLayout>, UtmsError> {
        let year = self.year()?;
        let month = self.month()?;
        let day = self.day()?;

        let year_start = year.start(ts)?;
        let year_end = year_start.add(&year.length(ts)?);

        let mut layout = Vec::new();
        let mut cursor = year_start;
        while cursor < year_end && layout.len() < MAX_MONTHS_PER_YEAR {
            let length = month.length(&cursor)?;
            let days = length.checked_div(&day.length(&cursor)?)?.floor();
            layout.push(MonthLayout {
                index: month.index(&cursor)?,
                name: month.name_at(&cursor)?.map(String::from),
                start: cursor.clone(),
                length: length.clone(),
                days: days.to_i64().unwrap_or(0),
                first_weekday: self.day_of_week(&cursor)?,
            });
            cursor = cursor.add(&length);
        }
        Ok(layout)
    }
}
