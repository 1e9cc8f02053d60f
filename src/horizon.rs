/*!
Rolling a trained model forward past the end of the known data
*/
use crate::data::scale::MinMaxScaler;
use crate::model::Predictor;
use crate::util::weekdays_after;
use crate::{CpuFloat, Error, Result};
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::convert::TryFrom;

/// The furthest a forecast may be extended, in trading days
pub const MAX_HORIZON: usize = 365;

/// Forecasts beyond the last known price
#[derive(Debug, Clone, PartialEq)]
pub struct Horizon {
    /// The weekday each forecast falls on
    pub dates: Vec<NaiveDate>,
    /// The forecasts on the scaled range
    pub scaled: Vec<CpuFloat>,
    /// The forecasts as prices
    pub prices: Vec<CpuFloat>,
}

impl Horizon {
    /// The number of forecast days
    pub fn len(&self) -> usize {
        self.dates.len()
    }
    /// Whether no days were forecast
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Check a requested horizon lies in `[0, MAX_HORIZON]`
pub fn validate_horizon(days: i64) -> Result<usize> {
    match usize::try_from(days) {
        Ok(days) if days <= MAX_HORIZON => Ok(days),
        _ => Err(Error::InvalidParameter(format!(
            "Future days must be between 0 and {}",
            MAX_HORIZON
        ))),
    }
}

/// Forecast `days` values past `seed`, the last window of known scaled values.
///
/// Each forecast is appended to the window (dropping its oldest value) before the next is made, so later steps
/// are driven by earlier forecasts rather than by real prices. Forecasts are dated on the weekdays following
/// `last_date`.
pub fn extend<P: Predictor + ?Sized>(
    model: &P,
    seed: &[CpuFloat],
    days: usize,
    last_date: NaiveDate,
    scaler: &MinMaxScaler,
) -> Result<Horizon> {
    if days > MAX_HORIZON {
        return Err(Error::InvalidParameter(format!(
            "Future days must be between 0 and {}",
            MAX_HORIZON
        )));
    }
    let mut window: VecDeque<CpuFloat> = seed.iter().copied().collect();
    let mut scaled = Vec::with_capacity(days);
    for _ in 0..days {
        let next = model.predict(window.make_contiguous())?;
        scaled.push(next);
        window.pop_front();
        window.push_back(next);
    }
    Ok(Horizon {
        dates: weekdays_after(last_date, days),
        prices: scaler.inverse_all(&scaled),
        scaled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::is_weekday;

    /// Predicts the mean of its window, so every step depends on every earlier forecast
    struct Mean;

    impl Predictor for Mean {
        fn predict(&self, window: &[CpuFloat]) -> Result<CpuFloat> {
            Ok(window.iter().sum::<CpuFloat>() / window.len() as CpuFloat)
        }
    }

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
    }

    #[test]
    fn zero_days_is_empty() {
        let scaler = MinMaxScaler { min: 0.0, max: 1.0 };
        let horizon = extend(&Mean, &[0.0, 1.0], 0, friday(), &scaler).unwrap();
        assert!(horizon.is_empty());
        assert!(horizon.prices.is_empty());
    }

    #[test]
    fn forecasts_feed_back_into_the_window() {
        let scaler = MinMaxScaler {
            min: 10.0,
            max: 20.0,
        };
        let horizon = extend(&Mean, &[0.0, 1.0], 3, friday(), &scaler).unwrap();
        // [0, 1] -> 0.5; [1, 0.5] -> 0.75; [0.5, 0.75] -> 0.625
        assert_eq!(horizon.scaled, vec![0.5, 0.75, 0.625]);
        assert_eq!(horizon.prices, vec![15.0, 17.5, 16.25]);
        assert_eq!(
            horizon.dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 13).unwrap(),
            ]
        );
    }

    #[test]
    fn dates_are_increasing_weekdays() {
        let scaler = MinMaxScaler { min: 0.0, max: 1.0 };
        let horizon = extend(&Mean, &[0.2, 0.4, 0.6], 30, friday(), &scaler).unwrap();
        assert_eq!(horizon.len(), 30);
        assert!(horizon.dates.iter().all(|d| is_weekday(*d)));
        assert!(horizon.dates.windows(2).all(|w| w[0] < w[1]));
        assert!(horizon.dates[0] > friday());
    }

    #[test]
    fn horizon_bounds() {
        assert_eq!(validate_horizon(0).unwrap(), 0);
        assert_eq!(validate_horizon(365).unwrap(), 365);
        let err = validate_horizon(400).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("between 0 and 365"));
        assert!(validate_horizon(-1).is_err());
        let scaler = MinMaxScaler { min: 0.0, max: 1.0 };
        assert!(extend(&Mean, &[0.5], 366, friday(), &scaler).is_err());
    }
}
