/*!
Generate fake daily bars, for testing and demos
*/
use super::{Bar, DataSource, Period, PriceSeries};
use crate::util::next_weekday;
use crate::{Error, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Generate fake prices using a geometric random walk with drift
#[derive(Debug, Clone)]
pub struct PriceRandomWalk<R> {
    /// The RNG used by this random walk
    pub rng: R,
    /// The current price
    pub price: f64,
    /// The distribution of daily log returns
    pub returns: Normal<f64>,
}

impl<R: rand::Rng> PriceRandomWalk<R> {
    /// Step the walk forward by one day, returning the new price
    pub fn step(&mut self) -> f64 {
        let ret = self.returns.sample(&mut self.rng);
        self.price *= ret.exp();
        self.price
    }
}

/// A deterministic data source producing a seeded random walk over the weekday calendar.
///
/// The ticker name is mixed into the seed, so different tickers get different (but repeatable) histories.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FakeSource {
    /// The base seed
    pub seed: u64,
    /// The last trading day generated
    pub end: NaiveDate,
    /// The number of bars to generate for `Period::Max`
    pub max_bars: usize,
    /// The starting price
    pub start_price: f64,
    /// Mean daily log return
    pub drift: f64,
    /// Standard deviation of daily log returns
    pub volatility: f64,
}

impl Default for FakeSource {
    fn default() -> FakeSource {
        FakeSource {
            seed: 0,
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MIN),
            max_bars: 5000,
            start_price: 100.0,
            drift: 0.0003,
            volatility: 0.015,
        }
    }
}

impl FakeSource {
    /// Generate `count` bars ending at (or just before) `self.end`
    pub fn generate(&self, ticker: &str, count: usize) -> Result<PriceSeries> {
        let returns = Normal::new(self.drift, self.volatility)
            .map_err(|err| Error::InvalidParameter(format!("Invalid volatility: {:?}", err)))?;
        let seed = ticker
            .bytes()
            .fold(self.seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut walk = PriceRandomWalk {
            rng: StdRng::seed_from_u64(seed),
            price: self.start_price,
            returns,
        };
        let mut dates = Vec::with_capacity(count);
        let mut date = self.end;
        while dates.len() < count {
            if crate::util::is_weekday(date) {
                dates.push(date);
            }
            date = date.pred_opt().ok_or_else(|| {
                Error::DataSource("Ran out of calendar generating fake data".into())
            })?;
        }
        dates.reverse();
        let bars = dates
            .into_iter()
            .map(|t| {
                let o = walk.price;
                let c = walk.step();
                Bar {
                    t,
                    o,
                    h: o.max(c),
                    l: o.min(c),
                    c,
                    v: 1_000_000.0,
                }
            })
            .collect();
        PriceSeries::new(bars)
    }

    /// The number of bars covering `period` before `self.end`
    fn bars_for(&self, period: Period) -> usize {
        let start = match period.start_for(self.end) {
            Some(start) => start,
            None => return self.max_bars,
        };
        let mut count = 0;
        let mut date = start;
        while date <= self.end {
            if crate::util::is_weekday(date) {
                count += 1;
            }
            date = next_weekday(date);
        }
        count.min(self.max_bars)
    }
}

impl DataSource for FakeSource {
    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        self.generate(ticker, self.bars_for(period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::is_weekday;

    #[test]
    fn fake_data_is_repeatable() {
        let source = FakeSource::default();
        let a = source.fetch("GOOG", Period::OneYear).unwrap();
        let b = source.fetch("GOOG", Period::OneYear).unwrap();
        let c = source.fetch("MSFT", Period::OneYear).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.closes(), c.closes());
    }

    #[test]
    fn fake_data_covers_period_on_weekdays() {
        let source = FakeSource::default();
        let series = source.fetch("GOOG", Period::OneYear).unwrap();
        // roughly 261 weekdays per year
        assert!(series.len() > 255 && series.len() < 265, "{}", series.len());
        assert_eq!(series.last_date(), Some(source.end));
        assert!(series.dates().all(is_weekday));
        assert!(series.closes().iter().all(|c| *c > 0.0));
        assert_eq!(
            source.fetch("GOOG", Period::Max).unwrap().len(),
            source.max_bars
        );
    }
}
