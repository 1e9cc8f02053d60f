/*!
The forecaster boundary: models trained on scaled windows which predict the next scaled price
*/
use crate::data::window::{Windows, DEFAULT_WINDOW};
use crate::{CpuFloat, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

pub mod linear;

/// Hyperparameters for a forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// The number of prices in each input window
    pub window: usize,
    /// The fraction of windows used for training; the rest are held out for testing
    pub split_ratio: f64,
    /// The number of passes over the training windows
    pub epochs: usize,
    /// The number of windows per optimizer step
    pub batch_size: usize,
    /// The optimizer's learning rate
    pub learning_rate: f64,
    /// The hidden size of each recurrent layer
    pub recurrent_hidden: usize,
    /// The hidden size of the dense layer before the output
    pub dense_hidden: usize,
    /// Dropout applied after each recurrent layer while training
    pub dropout: f64,
    /// L2 penalty used by the linear model
    pub ridge: f64,
    /// Seed for weight initialization and shuffling. `None` draws a fresh seed per run.
    pub seed: Option<u64>,
}

impl Default for ForecastConfig {
    fn default() -> ForecastConfig {
        ForecastConfig {
            window: DEFAULT_WINDOW,
            split_ratio: 0.8,
            epochs: 10,
            batch_size: 64,
            learning_rate: 0.001,
            recurrent_hidden: 50,
            dense_hidden: 25,
            dropout: 0.2,
            ridge: 1e-6,
            seed: None,
        }
    }
}

/// Progress reported after every training epoch
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EpochReport {
    /// The epoch just completed, starting at zero
    pub epoch: usize,
    /// The total number of epochs
    pub epochs: usize,
    /// The mean training loss over the epoch
    pub loss: CpuFloat,
}

/// A trained model
pub trait Predictor {
    /// Predict the scaled value following a window of scaled values.
    ///
    /// Must be a pure function of the trained state and the window.
    fn predict(&self, window: &[CpuFloat]) -> Result<CpuFloat>;
    /// Predict the target of every window in a set, in order
    fn predict_all(&self, windows: &Windows) -> Result<Vec<CpuFloat>> {
        (0..windows.len())
            .map(|i| self.predict(windows.input(i)))
            .collect()
    }
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict(&self, window: &[CpuFloat]) -> Result<CpuFloat> {
        (**self).predict(window)
    }
    fn predict_all(&self, windows: &Windows) -> Result<Vec<CpuFloat>> {
        (**self).predict_all(windows)
    }
}

/// Something which can be trained on windows to produce a [`Predictor`].
///
/// Every call to `train` builds a fresh model: nothing is carried over between runs.
pub trait Forecaster {
    /// The trained model
    type Model: Predictor;
    /// Train a new model on a set of windows, reporting progress after each epoch
    fn train(
        &self,
        windows: &Windows,
        on_epoch: &mut dyn FnMut(EpochReport),
    ) -> Result<Self::Model>;
}

/// The kinds of forecaster available
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// A stacked LSTM, trained with `tch`
    Lstm,
    /// An autoregressive least-squares model
    Linear,
}

impl ModelKind {
    /// The default model kind: the LSTM when it is compiled in
    pub fn default_kind() -> ModelKind {
        if cfg!(feature = "lstm") {
            ModelKind::Lstm
        } else {
            ModelKind::Linear
        }
    }
}

impl Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelKind::Lstm => f.write_str("lstm"),
            ModelKind::Linear => f.write_str("linear"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<ModelKind> {
        match s {
            "lstm" if cfg!(feature = "lstm") => Ok(ModelKind::Lstm),
            "lstm" => Err(Error::InvalidParameter(
                "The LSTM model was not compiled in; rebuild with the `lstm` feature".into(),
            )),
            "linear" => Ok(ModelKind::Linear),
            other => Err(Error::InvalidParameter(format!(
                "Invalid model {:?}. Must be one of: lstm, linear",
                other
            ))),
        }
    }
}

/// Validate a window before handing it to a model
pub(crate) fn check_window(window: &[CpuFloat], expected: usize) -> Result<()> {
    if window.len() != expected {
        return Err(Error::Training(format!(
            "Expected a window of {} values, got {}",
            expected,
            window.len()
        )));
    }
    Ok(())
}
