use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How electricity prices are derived for a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PricingMethod {
    /// Per-timestep market price series
    WholesaleMarket,
    /// Two-rate time-of-use tariff
    RetailerPeakOffpeak,
}

/// Tariff table entry (prices per kWh)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffRecord {
    pub name: String,
    /// Start and resolution of `wholesale_prices`
    pub start: NaiveDateTime,
    pub timestep_minutes: u32,
    #[serde(default)]
    pub wholesale_prices: Vec<f64>,
    pub peak_price: f64,
    pub offpeak_price: f64,
    /// Peak window `[peak_start_hour, peak_end_hour)` in local hours
    pub peak_start_hour: u32,
    pub peak_end_hour: u32,
}

impl TariffRecord {
    pub fn is_peak(&self, time: NaiveDateTime) -> bool {
        let hour = time.hour();
        if self.peak_start_hour <= self.peak_end_hour {
            hour >= self.peak_start_hour && hour < self.peak_end_hour
        } else {
            // window wraps past midnight
            hour >= self.peak_start_hour || hour < self.peak_end_hour
        }
    }

    pub fn time_of_use_price(&self, time: NaiveDateTime) -> f64 {
        if self.is_peak(time) {
            self.peak_price
        } else {
            self.offpeak_price
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn tariff(start: u32, end: u32) -> TariffRecord {
        TariffRecord {
            name: "t".into(),
            start: NaiveDate::from_ymd_opt(2017, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            timestep_minutes: 60,
            wholesale_prices: vec![],
            peak_price: 0.3,
            offpeak_price: 0.1,
            peak_start_hour: start,
            peak_end_hour: end,
        }
    }

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 1, 2).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_peak_window() {
        let t = tariff(8, 20);
        assert_eq!(t.time_of_use_price(hour(7)), 0.1);
        assert_eq!(t.time_of_use_price(hour(8)), 0.3);
        assert_eq!(t.time_of_use_price(hour(19)), 0.3);
        assert_eq!(t.time_of_use_price(hour(20)), 0.1);
    }

    #[test]
    fn test_peak_window_wrapping_midnight() {
        let t = tariff(22, 6);
        assert!(t.is_peak(hour(23)));
        assert!(t.is_peak(hour(2)));
        assert!(!t.is_peak(hour(12)));
    }

    #[test]
    fn test_pricing_method_names() {
        assert_eq!(PricingMethod::WholesaleMarket.to_string(), "wholesale_market");
        assert_eq!(
            PricingMethod::from_str("retailer_peak_offpeak").unwrap(),
            PricingMethod::RetailerPeakOffpeak
        );
    }
}
