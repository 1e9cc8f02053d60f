/*!
Forecast a ticker's closing prices from the command line and replay the trading strategy against them
*/
use anyhow::format_err;
use clap::{value_t, App, Arg};
use closecast::data::csvfile::CsvSource;
use closecast::data::fake::FakeSource;
use closecast::data::yahoo::YahooSource;
use closecast::data::DataSource;
use closecast::model::{ForecastConfig, ModelKind};
use closecast::pipeline::{Engine, PredictRequest};
use closecast::sim::Action;
use indicatif::{ProgressBar, ProgressStyle};
use io_enum::*;
use std::fs::File;
use std::io::{stdin, stdout, Stdin};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Read)]
pub enum IoSources {
    Stdin(Stdin),
    File(File),
}

fn main() -> anyhow::Result<()> {
    let matches = App::new("Closecast")
        .version("0.1")
        .author("Jad Elkhaleq Ghalayini <jad.ghalayini@mail.utoronto.ca>")
        .about("Trains a forecaster on a stock's closing prices and simulates trading on its forecasts")
        .arg(
            Arg::with_name("TICKER")
                .help("The ticker to forecast")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("period")
                .short("p")
                .long("period")
                .help("Lookback period: 6mo, 1y, 2y, 5y, 10y, ytd, max")
                .takes_value(true)
                .default_value("5y"),
        )
        .arg(
            Arg::with_name("balance")
                .short("b")
                .long("balance")
                .help("Starting cash for the simulation")
                .takes_value(true)
                .default_value("10000"),
        )
        .arg(
            Arg::with_name("future-days")
                .short("f")
                .long("future-days")
                .help("Weekdays to forecast past the last known price, at most 365")
                .takes_value(true)
                .default_value("0"),
        )
        .arg(
            Arg::with_name("csv")
                .long("csv")
                .help("Read daily bars from a CSV file, or - for stdin, instead of fetching them")
                .takes_value(true)
                .conflicts_with("fake"),
        )
        .arg(
            Arg::with_name("fake")
                .long("fake")
                .help("Use generated prices instead of fetching them"),
        )
        .arg(
            Arg::with_name("model")
                .short("m")
                .long("model")
                .help("Forecaster to train: lstm, linear. Defaults to lstm when compiled in")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("epochs")
                .long("epochs")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(
            Arg::with_name("window")
                .long("window")
                .help("Prices per input window")
                .takes_value(true)
                .default_value("60"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .help("Seed training and generated data, for repeatable runs")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("device")
                .short("d")
                .long("device")
                .help("Device to use: cuda, cpu. Defaults to cpu")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("json")
                .long("json")
                .help("Print the full response as JSON"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .get_matches();

    let level = match matches.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let seed: Option<u64> = matches.value_of("seed").map(str::parse).transpose()?;
    let config = ForecastConfig {
        window: value_t!(matches, "window", usize)?,
        epochs: value_t!(matches, "epochs", usize)?,
        seed,
        ..ForecastConfig::default()
    };
    let kind = match matches.value_of("model") {
        Some(kind) => kind.parse()?,
        None => ModelKind::default_kind(),
    };
    #[allow(unused_mut)]
    let mut engine = Engine::new(kind, config);
    debug!("Using the {} model with {:?}", engine.kind, engine.config);
    let device = matches.value_of("device").unwrap_or("cpu");
    #[cfg(feature = "lstm")]
    {
        engine.device = match device {
            "cuda" => tch::Device::cuda_if_available(),
            "cpu" => tch::Device::Cpu,
            device => return Err(format_err!("Invalid value for device: {:?}", device)),
        };
        debug!("Device: {:?}", engine.device);
    }
    #[cfg(not(feature = "lstm"))]
    {
        if device != "cpu" {
            return Err(format_err!("Invalid value for device: {:?}", device));
        }
    }

    let request = PredictRequest {
        ticker: matches.value_of("TICKER").unwrap_or_default().to_string(),
        period: matches.value_of("period").unwrap_or("5y").to_string(),
        initial_balance: value_t!(matches, "balance", f64)?,
        future_days: value_t!(matches, "future-days", i64)?,
    };
    // Fail on bad arguments before touching the network
    request.validate()?;

    let source: Box<dyn DataSource> = if let Some(path) = matches.value_of("csv") {
        let reader = if path == "-" {
            IoSources::Stdin(stdin())
        } else {
            IoSources::File(File::open(Path::new(path))?)
        };
        Box::new(CsvSource::from_reader(reader)?)
    } else if matches.is_present("fake") {
        Box::new(FakeSource {
            seed: seed.unwrap_or(0),
            ..FakeSource::default()
        })
    } else {
        Box::new(YahooSource::new()?)
    };

    let progress = ProgressBar::new(engine.config.epochs as u64);
    progress.set_style(
        ProgressStyle::default_bar().template("Training: {wide_bar} {pos}/{len}: {msg:20}"),
    );
    progress.set_message("no loss");
    let response = engine.run(&source, &request, &mut |report| {
        progress.set_length(report.epochs as u64);
        progress.set_position(report.epoch as u64 + 1);
        progress.set_message(&format!("loss = {:.6}", report.loss));
    });
    progress.finish_and_clear();
    let response = response.map_err(|err| format_err!("Forecasting {} failed: {}", request.ticker, err))?;

    if matches.is_present("json") {
        serde_json::to_writer_pretty(stdout(), &response)?;
        println!();
        return Ok(());
    }

    println!("RMSE: {:.4}", response.rmse);
    println!("Initial balance: {:.2}", response.initial_balance);
    println!("Final balance: {:.2}", response.final_balance);
    println!("Profit/loss: {:.2}", response.profit_loss);
    println!("Trades: {}", response.trade_log.len());
    for trade in &response.trade_log {
        let action = match trade.action {
            Action::Buy => "Bought",
            Action::Sell => "Sold",
        };
        println!(
            "  {} {:<6} {:>6} @ {:>10.2}  balance {:>12.2}",
            trade.date, action, trade.shares, trade.price, trade.balance
        );
    }
    let future: Vec<_> = response
        .predictions
        .iter()
        .filter(|point| point.actual.is_none())
        .collect();
    if !future.is_empty() {
        println!("Forecast:");
        for point in future {
            println!("  {} {:>10.2}", point.date, point.predicted);
        }
    }
    Ok(())
}
