/*!
Serve closing price forecasts over HTTP
*/
use anyhow::format_err;
use clap::{value_t, App, Arg, ArgMatches};
use closecast::data::fake::FakeSource;
use closecast::data::yahoo::YAHOO_CHART_URL;
use closecast::model::{ForecastConfig, ModelKind};
use closecast::pipeline::Engine;
use closecast::server::{serve, AppState, SourceConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn forecast_config(matches: &ArgMatches) -> anyhow::Result<ForecastConfig> {
    Ok(ForecastConfig {
        window: value_t!(matches, "window", usize)?,
        epochs: value_t!(matches, "epochs", usize)?,
        batch_size: value_t!(matches, "batch-size", usize)?,
        learning_rate: value_t!(matches, "learning-rate", f64)?,
        seed: matches.value_of("seed").map(str::parse).transpose()?,
        ..ForecastConfig::default()
    })
}

fn engine(matches: &ArgMatches, config: ForecastConfig) -> anyhow::Result<Engine> {
    let kind = match matches.value_of("model") {
        Some(kind) => kind.parse()?,
        None => ModelKind::default_kind(),
    };
    if config.window == 0 {
        return Err(format_err!("The window length must be positive"));
    }
    #[allow(unused_mut)]
    let mut engine = Engine::new(kind, config);
    let device = matches.value_of("device").unwrap_or("cpu");
    #[cfg(feature = "lstm")]
    {
        engine.device = match device {
            "cuda" => tch::Device::cuda_if_available(),
            "cpu" => tch::Device::Cpu,
            device => return Err(format_err!("Invalid value for device: {:?}", device)),
        };
    }
    #[cfg(not(feature = "lstm"))]
    {
        if device != "cpu" {
            return Err(format_err!("Invalid value for device: {:?}", device));
        }
    }
    Ok(engine)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = App::new("Closecast Server")
        .version("0.1")
        .author("Jad Elkhaleq Ghalayini <jad.ghalayini@mail.utoronto.ca>")
        .about("Serves closing price forecasts and trading simulations over HTTP")
        .arg(
            Arg::with_name("bind")
                .short("b")
                .long("bind")
                .help("Address to listen on")
                .takes_value(true)
                .default_value("127.0.0.1:8000"),
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
            Arg::with_name("batch-size")
                .long("batch-size")
                .takes_value(true)
                .default_value("64"),
        )
        .arg(
            Arg::with_name("window")
                .long("window")
                .help("Prices per input window")
                .takes_value(true)
                .default_value("60"),
        )
        .arg(
            Arg::with_name("learning-rate")
                .long("learning-rate")
                .takes_value(true)
                .default_value("0.001"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .help("Seed training, for repeatable forecasts")
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
            Arg::with_name("yahoo-url")
                .long("yahoo-url")
                .help("Base URL of the chart API")
                .takes_value(true)
                .default_value(YAHOO_CHART_URL),
        )
        .arg(
            Arg::with_name("fake")
                .long("fake")
                .help("Serve generated prices instead of fetching them"),
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
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    let config = forecast_config(&matches)?;
    let engine = engine(&matches, config)?;
    let source = if matches.is_present("fake") {
        SourceConfig::Fake(FakeSource::default())
    } else {
        SourceConfig::Yahoo(matches.value_of("yahoo-url").unwrap_or(YAHOO_CHART_URL).to_string())
    };
    info!("Using the {} model with {:?}", engine.kind, engine.config);
    #[cfg(feature = "lstm")]
    info!("Device: {:?}", engine.device);
    let bind = matches.value_of("bind").unwrap_or("127.0.0.1:8000");
    serve(bind, AppState::new(engine, source)).await?;
    Ok(())
}
