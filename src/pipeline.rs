/*!
The end-to-end forecasting pipeline for a single request.

Every request gets its own [`RequestContext`], which owns the fetched series, its scaler and the scaled values.
The trained model and the simulated position are local to [`run`] and are passed through the later stages
explicitly; they never outlive the request. No data is shared between requests.
*/
use crate::data::scale::MinMaxScaler;
use crate::data::window::Windows;
use crate::data::{DataSource, Period, PriceSeries};
use crate::evaluate::{evaluate, Evaluation};
use crate::horizon::{extend, validate_horizon, Horizon};
#[cfg(feature = "lstm")]
use crate::lstm::LstmForecaster;
use crate::model::linear::LinearForecaster;
use crate::model::{EpochReport, ForecastConfig, Forecaster, ModelKind, Predictor};
use crate::sim::{simulate, Simulation, TradeRecord};
use crate::util::to_s;
use crate::{CpuFloat, Error, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A forecasting request, as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// The ticker to forecast
    pub ticker: String,
    /// The lookback period, e.g. `5y`
    pub period: String,
    /// The simulation's starting cash
    pub initial_balance: CpuFloat,
    /// How many weekdays to forecast past the last known price
    #[serde(default)]
    pub future_days: i64,
}

/// A request which passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRequest {
    /// The ticker to forecast
    pub ticker: String,
    /// The lookback period
    pub period: Period,
    /// The simulation's starting cash
    pub initial_balance: CpuFloat,
    /// How many weekdays to forecast past the last known price
    pub future_days: usize,
}

impl PredictRequest {
    /// Check the period, the horizon, the ticker and the balance, in that order
    pub fn validate(&self) -> Result<ValidRequest> {
        let period = self.period.parse::<Period>()?;
        let future_days = validate_horizon(self.future_days)?;
        let ticker = self.ticker.trim();
        if ticker.is_empty() {
            return Err(Error::InvalidParameter("Ticker must not be empty".into()));
        }
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "Initial balance must be a positive number, got {}",
                self.initial_balance
            )));
        }
        Ok(ValidRequest {
            ticker: ticker.to_string(),
            period,
            initial_balance: self.initial_balance,
            future_days,
        })
    }
}

/// One point of the forecast chart
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    /// The trading day
    pub date: NaiveDate,
    /// The actual close, absent for days past the known data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<CpuFloat>,
    /// The forecast close
    pub predicted: CpuFloat,
}

/// The full result of a forecasting request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// The simulation's starting cash
    pub initial_balance: CpuFloat,
    /// The simulation's cash after liquidating
    pub final_balance: CpuFloat,
    /// `final_balance - initial_balance`
    pub profit_loss: CpuFloat,
    /// Root mean squared error over the test period, in price units
    pub rmse: CpuFloat,
    /// Every simulated trade
    pub trade_log: Vec<TradeRecord>,
    /// Test-period forecasts followed by forecasts past the known data
    pub predictions: Vec<PredictionPoint>,
}

/// Everything one request knows about its data
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The validated request
    pub request: ValidRequest,
    /// The run configuration
    pub config: ForecastConfig,
    /// The fetched prices
    pub series: PriceSeries,
    /// The scaler fit on every close in `series`
    pub scaler: MinMaxScaler,
    /// Every close in `series`, scaled
    pub scaled: Vec<CpuFloat>,
}

impl RequestContext {
    /// Fetch and scale the series for a request
    pub fn load<D: DataSource + ?Sized>(
        source: &D,
        request: ValidRequest,
        config: ForecastConfig,
    ) -> Result<RequestContext> {
        let series = source.fetch(&request.ticker, request.period)?;
        info!(
            "Fetched {} bars of {} over {}",
            series.len(),
            request.ticker,
            request.period
        );
        let (scaler, scaled) =
            MinMaxScaler::fit_closes(series.bars()).ok_or(Error::InsufficientData {
                needed: config.window + 1,
                got: 0,
            })?;
        Ok(RequestContext {
            request,
            config,
            series,
            scaler,
            scaled,
        })
    }

    /// Every window over the scaled series
    pub fn windows(&self) -> Result<Windows> {
        Windows::new(&self.scaled[..], self.config.window)
    }

    /// The training and test windows
    pub fn split(&self) -> Result<(Windows, Windows)> {
        self.windows()?.split(self.config.split_ratio)
    }

    /// Train a fresh model on the training windows
    pub fn train<F: Forecaster + ?Sized>(
        &self,
        forecaster: &F,
        on_epoch: &mut dyn FnMut(EpochReport),
    ) -> Result<F::Model> {
        let (train, _) = self.split()?;
        let started = Utc::now();
        let model = forecaster.train(&train, on_epoch)?;
        debug!(
            "Trained on {} windows in {:.2}s",
            train.len(),
            to_s::<f64>(Utc::now() - started)
        );
        Ok(model)
    }

    /// Predict the test windows and score them on the price scale
    pub fn evaluate<P: Predictor + ?Sized>(&self, model: &P) -> Result<Evaluation> {
        let (_, test) = self.split()?;
        let predicted = model.predict_all(&test)?;
        evaluate(&predicted, &test.targets(), &self.scaler)
    }

    /// The dates of the test windows' targets
    pub fn test_dates(&self) -> Result<Vec<NaiveDate>> {
        let (_, test) = self.split()?;
        let bars = self.series.bars();
        Ok(test.target_indices().map(|i| bars[i].t).collect())
    }

    /// Forecast past the end of the series, seeded with its last window
    pub fn forecast<P: Predictor + ?Sized>(&self, model: &P) -> Result<Horizon> {
        let window = self.config.window;
        let last_date = self.series.last_date().ok_or(Error::InsufficientData {
            needed: window + 1,
            got: 0,
        })?;
        let seed = self
            .scaled
            .len()
            .checked_sub(window)
            .map(|start| &self.scaled[start..])
            .ok_or(Error::InsufficientData {
                needed: window + 1,
                got: self.scaled.len(),
            })?;
        extend(
            model,
            seed,
            self.request.future_days,
            last_date,
            &self.scaler,
        )
    }

    /// Replay the trading strategy over the test period
    pub fn simulate(&self, evaluation: &Evaluation) -> Result<Simulation> {
        simulate(
            &evaluation.predicted,
            &evaluation.actual,
            &self.test_dates()?,
            self.request.initial_balance,
        )
    }

    /// Assemble a response from the results of each stage
    pub fn respond(
        &self,
        evaluation: &Evaluation,
        horizon: &Horizon,
        simulation: Simulation,
    ) -> Result<PredictResponse> {
        let test_points = self
            .test_dates()?
            .into_iter()
            .zip(evaluation.actual.iter().zip(&evaluation.predicted))
            .map(|(date, (&actual, &predicted))| PredictionPoint {
                date,
                actual: Some(actual),
                predicted,
            });
        let future_points = horizon
            .dates
            .iter()
            .zip(&horizon.prices)
            .map(|(&date, &predicted)| PredictionPoint {
                date,
                actual: None,
                predicted,
            });
        Ok(PredictResponse {
            initial_balance: simulation.initial_balance,
            final_balance: simulation.final_balance,
            profit_loss: simulation.profit_loss(),
            rmse: evaluation.rmse,
            predictions: test_points.chain(future_points).collect(),
            trade_log: simulation.trades,
        })
    }
}

/// A forecaster choice plus the configuration to build it with
#[derive(Debug, Clone)]
pub struct Engine {
    /// Which forecaster to train
    pub kind: ModelKind,
    /// Hyperparameters for every run
    pub config: ForecastConfig,
    /// The device the LSTM trains on
    #[cfg(feature = "lstm")]
    pub device: tch::Device,
}

impl Engine {
    /// An engine for a model kind, training on the CPU
    pub fn new(kind: ModelKind, config: ForecastConfig) -> Engine {
        Engine {
            kind,
            config,
            #[cfg(feature = "lstm")]
            device: tch::Device::Cpu,
        }
    }

    /// Build a fresh forecaster and run the pipeline for one request
    pub fn run<D: DataSource + ?Sized>(
        &self,
        source: &D,
        request: &PredictRequest,
        on_epoch: &mut dyn FnMut(EpochReport),
    ) -> Result<PredictResponse> {
        match self.kind {
            ModelKind::Linear => {
                let forecaster = LinearForecaster::new(&self.config);
                run(source, &forecaster, &self.config, request, on_epoch)
            }
            #[cfg(feature = "lstm")]
            ModelKind::Lstm => {
                let forecaster = LstmForecaster::new(self.config.clone(), self.device);
                run(source, &forecaster, &self.config, request, on_epoch)
            }
            #[cfg(not(feature = "lstm"))]
            ModelKind::Lstm => Err(Error::InvalidParameter(
                "The LSTM model was not compiled in; rebuild with the `lstm` feature".into(),
            )),
        }
    }
}

/// Run the whole pipeline for one request: fetch, scale, window, train, evaluate, extend and simulate
pub fn run<D, F>(
    source: &D,
    forecaster: &F,
    config: &ForecastConfig,
    request: &PredictRequest,
    on_epoch: &mut dyn FnMut(EpochReport),
) -> Result<PredictResponse>
where
    D: DataSource + ?Sized,
    F: Forecaster + ?Sized,
{
    let request = request.validate()?;
    info!(
        "Forecasting {} over {} with {} future days",
        request.ticker, request.period, request.future_days
    );
    let ctx = RequestContext::load(source, request, config.clone())?;
    let model = ctx.train(forecaster, on_epoch)?;
    let evaluation = ctx.evaluate(&model)?;
    let horizon = ctx.forecast(&model)?;
    let simulation = ctx.simulate(&evaluation)?;
    info!(
        "Forecast {}: rmse = {:.4}, {} trades, profit/loss = {:.2}",
        ctx.request.ticker,
        evaluation.rmse,
        simulation.trades.len(),
        simulation.profit_loss()
    );
    ctx.respond(&evaluation, &horizon, simulation)
}
