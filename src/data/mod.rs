/*!
Price data types, data sources and preprocessing
*/
use crate::*;
use chrono::{Datelike, Months, NaiveDate};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use ta::{Close, High, Low, Open, Volume};

pub mod csvfile;
pub mod fake;
pub mod scale;
pub mod window;
pub mod yahoo;

/// A daily bar for a stock
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Bar<F = CpuFloat> {
    /// This bar's trading day
    #[serde(rename = "date", alias = "Date")]
    pub t: NaiveDate,
    /// The opening price of this bar
    #[serde(rename = "open", alias = "Open")]
    pub o: F,
    /// The high price of this bar
    #[serde(rename = "high", alias = "High")]
    pub h: F,
    /// The low price of this bar
    #[serde(rename = "low", alias = "Low")]
    pub l: F,
    /// The closing price of this bar
    #[serde(rename = "close", alias = "Close")]
    pub c: F,
    /// The volume traded this bar
    #[serde(rename = "volume", alias = "Volume")]
    pub v: F,
}

impl<F> Open for Bar<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn open(&self) -> f64 {
        self.o.into()
    }
}

impl<F> High for Bar<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn high(&self) -> f64 {
        self.h.into()
    }
}

impl<F> Low for Bar<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn low(&self) -> f64 {
        self.l.into()
    }
}

impl<F> Close for Bar<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn close(&self) -> f64 {
        self.c.into()
    }
}

impl<F> Volume for Bar<F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn volume(&self) -> f64 {
        self.v.into()
    }
}

/// An ordered series of daily bars with strictly increasing dates.
///
/// Built once by a [`DataSource`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Validate and wrap a vector of bars
    pub fn new(bars: Vec<Bar>) -> Result<PriceSeries> {
        if let Some((prev, next)) = bars.iter().tuple_windows().find(|(a, b)| a.t >= b.t) {
            return Err(Error::InvalidParameter(format!(
                "Price series dates must be strictly increasing: {} is followed by {}",
                prev.t, next.t
            )));
        }
        if let Some(bar) = bars.iter().find(|bar| !(bar.c.is_finite() && bar.c > 0.0)) {
            return Err(Error::InvalidParameter(format!(
                "Invalid closing price {} on {}",
                bar.c, bar.t
            )));
        }
        Ok(PriceSeries { bars })
    }
    /// The bars in this series
    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }
    /// The number of bars in this series
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }
    /// Whether this series is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
    /// The trading days of this series
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|bar| bar.t)
    }
    /// The closing prices of this series
    pub fn closes(&self) -> Vec<CpuFloat> {
        self.bars.iter().map(Close::close).collect()
    }
    /// The last trading day of this series, if any
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|bar| bar.t)
    }
    /// Keep only the bars falling inside `period`, counted back from the last bar
    pub fn trailing(self, period: Period) -> PriceSeries {
        let start = match self.last_date().and_then(|last| period.start_for(last)) {
            Some(start) => start,
            None => return self,
        };
        let bars = self.bars.into_iter().filter(|bar| bar.t >= start).collect();
        PriceSeries { bars }
    }
}

/// A lookback period for historical data
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Six months
    #[serde(rename = "6mo")]
    SixMonths,
    /// One year
    #[serde(rename = "1y")]
    OneYear,
    /// Two years
    #[serde(rename = "2y")]
    TwoYears,
    /// Five years
    #[serde(rename = "5y")]
    FiveYears,
    /// Ten years
    #[serde(rename = "10y")]
    TenYears,
    /// Year to date
    #[serde(rename = "ytd")]
    YearToDate,
    /// All available history
    #[serde(rename = "max")]
    Max,
}

impl Period {
    /// Every valid period, in order of increasing length (year-to-date aside)
    pub const ALL: [Period; 7] = [
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    /// The provider-facing name of this period
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// The first date covered by this period when it ends on `last`, or `None` for unbounded history
    pub fn start_for(&self, last: NaiveDate) -> Option<NaiveDate> {
        let months = match self {
            Period::SixMonths => 6,
            Period::OneYear => 12,
            Period::TwoYears => 24,
            Period::FiveYears => 60,
            Period::TenYears => 120,
            Period::YearToDate => return NaiveDate::from_ymd_opt(last.year(), 1, 1),
            Period::Max => return None,
        };
        last.checked_sub_months(Months::new(months))
    }

    /// The message reported when a period fails to parse
    pub fn invalid_message() -> String {
        format!(
            "Invalid period. Must be one of: {}",
            Period::ALL.iter().map(Period::as_str).join(", ")
        )
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;
    fn from_str(s: &str) -> Result<Period> {
        Period::ALL
            .iter()
            .copied()
            .find(|period| period.as_str() == s)
            .ok_or_else(|| Error::InvalidParameter(Period::invalid_message()))
    }
}

/// A provider of daily price history
pub trait DataSource {
    /// Fetch the daily bars for `ticker` over `period`, oldest first
    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries>;
}

impl<D: DataSource + ?Sized> DataSource for &D {
    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        (**self).fetch(ticker, period)
    }
}

impl<D: DataSource + ?Sized> DataSource for Box<D> {
    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        (**self).fetch(ticker, period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(t: NaiveDate, c: f64) -> Bar {
        Bar {
            t,
            o: c,
            h: c,
            l: c,
            c,
            v: 1000.0,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn periods_parse() {
        for period in Period::ALL.iter() {
            assert_eq!(period.as_str().parse::<Period>().unwrap(), *period);
        }
        let err = "3y".parse::<Period>().unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "Invalid period. Must be one of: 6mo, 1y, 2y, 5y, 10y, ytd, max"
        );
    }

    #[test]
    fn series_requires_increasing_dates() {
        let ok = PriceSeries::new(vec![bar(ymd(2024, 1, 2), 10.0), bar(ymd(2024, 1, 3), 11.0)]);
        assert_eq!(ok.unwrap().len(), 2);
        let dup = PriceSeries::new(vec![bar(ymd(2024, 1, 2), 10.0), bar(ymd(2024, 1, 2), 11.0)]);
        assert!(dup.unwrap_err().is_client_error());
        let bad = PriceSeries::new(vec![bar(ymd(2024, 1, 2), f64::NAN)]);
        assert!(bad.is_err());
    }

    #[test]
    fn trailing_trims_to_period() {
        let series = PriceSeries::new(vec![
            bar(ymd(2022, 12, 30), 1.0),
            bar(ymd(2023, 6, 30), 2.0),
            bar(ymd(2023, 7, 3), 3.0),
            bar(ymd(2024, 1, 2), 4.0),
        ])
        .unwrap();
        assert_eq!(series.clone().trailing(Period::Max).len(), 4);
        assert_eq!(series.clone().trailing(Period::OneYear).len(), 3);
        assert_eq!(series.clone().trailing(Period::SixMonths).len(), 2);
        let ytd = series.trailing(Period::YearToDate);
        assert_eq!(ytd.dates().collect::<Vec<_>>(), vec![ymd(2024, 1, 2)]);
    }
}
