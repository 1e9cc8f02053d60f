/*!
Reading and writing daily bars as CSV, and serving them as a data source
*/
use super::{Bar, DataSource, Period, PriceSeries};
use crate::Result;
use std::io::{Read, Write};
use tracing::debug;

/// Read daily bars from a reader.
///
/// Expects a header row naming `date,open,high,low,close,volume`, in any order; capitalized names as exported by
/// Yahoo Finance are accepted too, and extra columns are ignored. Rows which fail to parse are skipped.
pub fn read_bars<R: Read>(rdr: R) -> Vec<Bar> {
    deserialize_bars(rdr)
        .filter_map(|result| match result {
            Ok(bar) => Some(bar),
            Err(err) => {
                debug!("Skipping unreadable row: {}", err);
                None
            }
        })
        .collect()
}

/// Deserialize daily bars, reporting each row's errors
pub fn deserialize_bars<R: Read>(rdr: R) -> impl Iterator<Item = Result<Bar, csv::Error>> {
    csv::Reader::from_reader(rdr).into_deserialize()
}

/// Write daily bars to a Writer
/// On success, return how many bars were written
pub fn write_bars<W, I>(wtr: W, bars: I) -> Result<usize, csv::Error>
where
    W: Write,
    I: IntoIterator<Item = Bar>,
{
    let mut wtr = csv::Writer::from_writer(wtr);
    let mut written = 0;
    for bar in bars {
        wtr.serialize(bar)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

/// A data source serving bars previously loaded from a CSV file.
///
/// The file holds a single instrument, so the requested ticker is only used for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvSource {
    series: PriceSeries,
}

impl CsvSource {
    /// Load every readable bar from a reader, sorting them by date
    pub fn from_reader<R: Read>(rdr: R) -> Result<CsvSource> {
        let mut bars = read_bars(rdr);
        bars.sort_by_key(|bar| bar.t);
        bars.dedup_by_key(|bar| bar.t);
        let series = PriceSeries::new(bars)?;
        Ok(CsvSource { series })
    }
}

impl DataSource for CsvSource {
    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        let series = self.series.clone().trailing(period);
        debug!(
            "Serving {} bars of {} over {} from CSV",
            series.len(),
            ticker,
            period
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn reads_yahoo_exports() {
        let data = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-01-03,10.0,11.0,9.5,10.5,10.4,1200
2024-01-02,9.0,10.0,8.5,9.5,9.4,1000
not-a-date,1,1,1,1,1,1
";
        let source = CsvSource::from_reader(data.as_bytes()).unwrap();
        let series = source.fetch("TEST", Period::Max).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.last_date(),
            Some(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
        );
        assert_eq!(series.closes(), vec![9.5, 10.5]);
    }
}
