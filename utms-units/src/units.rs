//! Standard fixed units, Planck time through the Galaxial Era
//!
//! Groups: "si" for the metric ladder, "human" for calendar-scale averages,
//! "cosmic" for geological and cosmological spans.

use utms_core::Number;
use crate::UnitSpec;

/// Reduced Planck constant, J⋅s
fn hbar() -> Number {
    sci(1_054_571_817, -43)
}

/// Gravitational constant, m^3⋅kg^−1⋅s^−2
fn gravitational_constant() -> Number {
    sci(667_430, -16)
}

/// Speed of light, m/s
fn speed_of_light() -> Number {
    Number::from_i64(299_792_458)
}

/// `sig * 10^exp`
fn sci(sig: i64, exp: i64) -> Number {
    Number::from_i64(sig).mul(&Number::pow10(exp))
}

/// sqrt(ħG / c^5), about 5.391247e-44 s
pub fn planck_time() -> Number {
    let numerator = hbar().mul(&gravitational_constant());
    numerator.checked_div(&speed_of_light().pow(5))
        .and_then(|q| q.sqrt(60))
        .unwrap_or_else(|_| Number::zero())
}

pub const SECONDS_IN_MINUTE: i64 = 60;
pub const SECONDS_IN_HOUR: i64 = 3_600;
pub const SECONDS_IN_DAY: i64 = 86_400;
pub const SECONDS_IN_WEEK: i64 = 604_800;

/// 365.25 days
pub fn seconds_in_year() -> Number {
    Number::from_i64(31_557_600)
}

/// 29 d 12 h 44 m 2.8 s
pub fn seconds_in_lunar_cycle() -> Number {
    sci(25_514_428, -1)
}

fn years(count: Number) -> Number {
    seconds_in_year().mul(&count)
}

/// Every standard fixed unit, smallest first
pub fn standard_unit_specs() -> Vec<UnitSpec> {
    let mut specs = Vec::new();
    register_si_units(&mut specs);
    register_human_units(&mut specs);
    register_cosmic_units(&mut specs);
    specs
}

fn register_si_units(specs: &mut Vec<UnitSpec>) {
    let unit = |id: &str, name: &str, value: Number| UnitSpec::fixed(id, name, value).in_group("si");

    specs.push(unit("pt", "Planck Time", planck_time()).in_group("cosmic"));

    specs.push(unit("qs", "Quectosecond", Number::pow10(-30)));
    specs.push(unit("rs", "Rontosecond", Number::pow10(-27)));
    specs.push(unit("ys", "Yoctosecond", Number::pow10(-24)));
    specs.push(unit("zs", "Zeptosecond", Number::pow10(-21)));
    specs.push(unit("as", "Attosecond", Number::pow10(-18)));
    specs.push(unit("fs", "Femtosecond", Number::pow10(-15)));
    specs.push(unit("ps", "Picosecond", Number::pow10(-12)));
    specs.push(unit("ns", "Nanosecond", Number::pow10(-9)));
    specs.push(unit("us", "Microsecond", Number::pow10(-6)));
    specs.push(unit("ms", "Millisecond", Number::pow10(-3)));

    specs.push(unit("s", "Second", Number::one()).in_group("human"));

    specs.push(unit("KS", "Kilosecond", Number::pow10(3)));
    specs.push(unit("MS", "Megasecond", Number::pow10(6)));
    specs.push(unit("GS", "Gigasecond", Number::pow10(9)));
    specs.push(unit("TS", "Terasecond", Number::pow10(12)));
    specs.push(unit("PS", "Petasecond", Number::pow10(15)));
    specs.push(unit("ES", "Exasecond", Number::pow10(18)));
    specs.push(unit("ZS", "Zettasecond", Number::pow10(21)));
    specs.push(unit("YS", "Yottasecond", Number::pow10(24)));
    specs.push(unit("RS", "Ronnasecond", Number::pow10(27)));
    specs.push(unit("QS", "Quettasecond", Number::pow10(30)));
}

fn register_human_units(specs: &mut Vec<UnitSpec>) {
    let unit = |id: &str, name: &str, value: Number| UnitSpec::fixed(id, name, value).in_group("human");
    let day = Number::from_i64(SECONDS_IN_DAY);

    specs.push(unit("m", "Minute", Number::from_i64(SECONDS_IN_MINUTE)));
    specs.push(unit("h", "Hour", Number::from_i64(SECONDS_IN_HOUR)));
    specs.push(unit("cd", "Centiday", day.mul(&Number::pow10(-2))));
    specs.push(unit("dd", "Deciday", day.mul(&Number::pow10(-1))));
    specs.push(unit("d", "Day", day.clone()));
    specs.push(unit("w", "Week", Number::from_i64(SECONDS_IN_WEEK)));
    specs.push(unit("lc", "Lunar Cycle", seconds_in_lunar_cycle()));
    // 30-day approximation
    specs.push(unit("M", "Month", day.mul(&Number::from_i64(30))));
    specs.push(unit("Q", "Quarter", years(Number::from_ratio(1, 4))));
    specs.push(unit("Y", "Year", seconds_in_year()));
    specs.push(unit("D", "Decade", years(Number::pow10(1))));
    specs.push(unit("C", "Century", years(Number::pow10(2))));
    specs.push(unit("Mn", "Millennium", years(Number::pow10(3))));
}

fn register_cosmic_units(specs: &mut Vec<UnitSpec>) {
    let unit = |id: &str, name: &str, value: Number| UnitSpec::fixed(id, name, value).in_group("cosmic");

    specs.push(unit("Ma", "Megaannum", years(Number::pow10(6))));
    specs.push(unit("Ga", "Gigaannum", years(Number::pow10(9))));
    specs.push(unit("au", "Age of Universe", years(sci(138, 8))));
    specs.push(unit("ht", "Hubble Time", years(sci(144, 8))));
    specs.push(unit("Ta", "Teraannum", years(Number::pow10(12))));
    specs.push(unit("GE", "Galaxial Era", years(Number::pow10(120))));
}
