//! Planck log time
//!
//! pPLT counts decades of Planck time; hPLT shifts the scale so one second
//! reads as 1. These are display values, so `f64` is enough.

use utms_core::Number;
use utms_units::planck_time;

/// `log10(|seconds| / planck_time)`; `None` for zero
pub fn seconds_to_pplt(seconds: &Number) -> Option<f64> {
    let ratio = seconds.abs().checked_div(&planck_time()).ok()?;
    ratio.log10()
}

/// `pplt + log10(planck_time) + 1`; `None` for zero
pub fn seconds_to_hplt(seconds: &Number) -> Option<f64> {
    let pplt = seconds_to_pplt(seconds)?;
    let offset = planck_time().log10()? + 1.0;
    Some(pplt + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_second() {
        let one = Number::one();
        let pplt = seconds_to_pplt(&one).unwrap();
        assert!((pplt - 43.27).abs() < 0.01, "pplt = {}", pplt);
        assert!((seconds_to_hplt(&one).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_planck_time_is_zero_pplt() {
        assert!(seconds_to_pplt(&planck_time()).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_sign_ignored_and_zero() {
        let day = Number::from_i64(86_400);
        assert_eq!(seconds_to_hplt(&day), seconds_to_hplt(&day.neg()));
        assert_eq!(seconds_to_pplt(&Number::zero()), None);
    }
}
