/*!
[Yahoo Finance](https://finance.yahoo.com/)-specific data retrieval
*/
use super::{Bar, DataSource, Period, PriceSeries};
use crate::{Error, Result};
use chrono::DateTime;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// The default Yahoo Finance chart endpoint
pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

/// A blocking client for the Yahoo Finance chart API
#[derive(Debug, Clone)]
pub struct YahooSource {
    client: Client,
    base_url: String,
}

impl YahooSource {
    /// Create a client for the public chart endpoint
    pub fn new() -> Result<YahooSource> {
        YahooSource::with_base_url(YAHOO_CHART_URL)
    }
    /// Create a client for a different chart endpoint, e.g. a proxy
    pub fn with_base_url(base_url: &str) -> Result<YahooSource> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(YahooSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl DataSource for YahooSource {
    fn fetch(&self, ticker: &str, period: Period) -> Result<PriceSeries> {
        let url = format!("{}/{}", self.base_url, ticker);
        debug!("Fetching {} over {} from {}", ticker, period, url);
        let response: ChartResponse = self
            .client
            .get(&url)
            .query(&[("range", period.as_str()), ("interval", "1d")])
            .send()?
            .json()?;
        parse_chart(ticker, response)
    }
}

fn parse_chart(ticker: &str, response: ChartResponse) -> Result<PriceSeries> {
    if let Some(error) = response.chart.error {
        return Err(Error::DataSource(format!(
            "Yahoo Finance error for {}: {} - {}",
            ticker, error.code, error.description
        )));
    }
    let data = response
        .chart
        .result
        .and_then(|result| result.into_iter().next())
        .ok_or_else(|| Error::DataSource(format!("No data returned for {}", ticker)))?;
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = data.meta.gmtoffset;

    let mut bars = Vec::with_capacity(timestamps.len());
    let mut skipped = 0;
    for (i, ts) in timestamps.iter().enumerate() {
        let field = |column: &Vec<Option<f64>>| column.get(i).copied().flatten();
        let c = match field(&quote.close) {
            Some(c) => c,
            None => {
                skipped += 1;
                continue;
            }
        };
        let t = match DateTime::from_timestamp(ts + offset, 0) {
            Some(t) => t.date_naive(),
            None => {
                skipped += 1;
                continue;
            }
        };
        bars.push(Bar {
            t,
            o: field(&quote.open).unwrap_or(c),
            h: field(&quote.high).unwrap_or(c),
            l: field(&quote.low).unwrap_or(c),
            c,
            v: field(&quote.volume).unwrap_or(0.0),
        });
    }
    if skipped > 0 {
        warn!("Skipped {} incomplete rows for {}", skipped, ticker);
    }
    // The live session can be reported a second time under the same date; keep the latest
    bars.reverse();
    bars.sort_by_key(|bar| bar.t);
    bars.dedup_by_key(|bar| bar.t);
    if bars.is_empty() {
        return Err(Error::DataSource(format!("No prices returned for {}", ticker)));
    }
    PriceSeries::new(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_chart_payload() {
        let payload = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "GOOG", "gmtoffset": -18000},
                    "timestamp": [1704205800, 1704292200, 1704378600],
                    "indicators": {
                        "quote": [{
                            "open": [139.6, 138.6, null],
                            "high": [140.6, 141.1, null],
                            "low": [137.7, 138.4, null],
                            "close": [139.6, 140.4, null],
                            "volume": [20071900, 18974300, null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let response: ChartResponse = serde_json::from_str(payload).unwrap();
        let series = parse_chart("GOOG", response).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![139.6, 140.4]);
        assert_eq!(
            series.dates().collect::<Vec<_>>(),
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
            ]
        );
    }

    #[test]
    fn vendor_errors_are_data_source_errors() {
        let payload = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let response: ChartResponse = serde_json::from_str(payload).unwrap();
        match parse_chart("NOPE", response) {
            Err(Error::DataSource(msg)) => assert!(msg.contains("delisted")),
            other => panic!("Unexpected result {:?}", other),
        }
    }
}
