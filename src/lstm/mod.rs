/*!
The LSTM forecaster: two stacked LSTM layers with dropout, followed by two dense layers, trained with `tch`
*/

use crate::data::window::Windows;
use crate::model::{check_window, EpochReport, ForecastConfig, Forecaster, Predictor};
use crate::{CpuFloat, Error, GpuFloat, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::convert::TryFrom;
use std::sync::{Mutex, PoisonError};
use tch::nn::{self, Linear, ModuleT, OptimizerConfig, RNNConfig, VarStore, LSTM, RNN};
use tch::{Device, Reduction, Tensor};
use tracing::debug;

/// Held for the whole of a training run: libtorch's generator is process-wide, and both weight initialization
/// and dropout draw from it
static TORCH_RNG: Mutex<()> = Mutex::new(());

/// The StockLSTM model: LSTM -> dropout -> LSTM -> dropout -> dense -> dense
#[derive(Debug)]
pub struct StockLSTM {
    /// The first LSTM layer, emitting its full output sequence
    pub lower: LSTM,
    /// The second LSTM layer, of which only the last step is kept
    pub upper: LSTM,
    /// The hidden dense layer
    pub dense: Linear,
    /// The output layer
    pub output: Linear,
    /// The dropout probability applied after each LSTM layer while training
    pub dropout: f64,
}

impl StockLSTM {
    /// Compute the mean squared error of the model's predictions for a batch
    pub fn loss(&self, xs: &Tensor, ys: &Tensor) -> Tensor {
        let yhat = self.forward_t(xs, true).squeeze_dim(-1);
        yhat.mse_loss(ys, Reduction::Mean)
    }
    /// Package a batch of windows into an input tensor of shape `[batch, window, 1]` and a target tensor of
    /// shape `[batch]`
    pub fn make_batch(windows: &Windows, indices: &[usize]) -> (Tensor, Tensor) {
        let length = windows.length();
        let mut input = Vec::<GpuFloat>::with_capacity(indices.len() * length);
        let mut output = Vec::<GpuFloat>::with_capacity(indices.len());
        for &i in indices {
            input.extend(windows.input(i).iter().map(|&x| x as GpuFloat));
            output.push(windows.target(i) as GpuFloat);
        }
        let input = Tensor::from_slice(&input[..]).view([indices.len() as i64, length as i64, 1]);
        let output = Tensor::from_slice(&output[..]);
        (input, output)
    }
}

impl ModuleT for StockLSTM {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let (hidden, _) = self.lower.seq(xs);
        let hidden = hidden.dropout(self.dropout, train);
        let (hidden, _) = self.upper.seq(&hidden);
        hidden
            .select(1, -1)
            .dropout(self.dropout, train)
            .apply(&self.dense)
            .apply(&self.output)
    }
}

/// A descriptor for an instance of the StockLSTM model
#[derive(Debug, Clone, PartialEq)]
pub struct StockLSTMDesc {
    /// The size of both LSTM layers
    pub hidden: usize,
    /// The size of the hidden dense layer
    pub dense: usize,
    /// The dropout probability after each LSTM layer
    pub dropout: f64,
}

impl StockLSTMDesc {
    /// Build a `StockLSTM` over a given `VarStore`
    pub fn build(&self, vs: &VarStore) -> StockLSTM {
        let root = vs.root();
        let config = RNNConfig {
            has_biases: true,
            num_layers: 1,
            dropout: 0.,
            train: true,
            bidirectional: false,
            batch_first: true,
        };
        let lower = nn::lstm(&root / "lower", 1, self.hidden as i64, config);
        let upper = nn::lstm(&root / "upper", self.hidden as i64, self.hidden as i64, config);
        let dense = nn::linear(
            &root / "dense",
            self.hidden as i64,
            self.dense as i64,
            Default::default(),
        );
        let output = nn::linear(&root / "output", self.dense as i64, 1, Default::default());
        StockLSTM {
            lower,
            upper,
            dense,
            output,
            dropout: self.dropout,
        }
    }
}

/// Trains a fresh [`StockLSTM`] for every run
#[derive(Debug, Clone)]
pub struct LstmForecaster {
    /// Training hyperparameters
    pub config: ForecastConfig,
    /// The device to train on
    pub device: Device,
}

impl LstmForecaster {
    /// Create a forecaster for a configuration and device
    pub fn new(config: ForecastConfig, device: Device) -> LstmForecaster {
        LstmForecaster { config, device }
    }
}

/// A trained StockLSTM, along with the variables backing it
#[derive(Debug)]
pub struct LstmModel {
    /// The variables of the network; dropping them frees the model
    pub vs: VarStore,
    /// The network
    pub net: StockLSTM,
    /// The window length the network was trained on
    pub window: usize,
}

impl Predictor for LstmModel {
    fn predict(&self, window: &[CpuFloat]) -> Result<CpuFloat> {
        check_window(window, self.window)?;
        let input: Vec<GpuFloat> = window.iter().map(|&x| x as GpuFloat).collect();
        let input = Tensor::from_slice(&input[..])
            .view([1, self.window as i64, 1])
            .to_device(self.vs.device());
        let output = tch::no_grad(|| self.net.forward_t(&input, false));
        Ok(output.f_double_value(&[0, 0])?)
    }
    fn predict_all(&self, windows: &Windows) -> Result<Vec<CpuFloat>> {
        if windows.is_empty() {
            return Ok(Vec::new());
        }
        check_window(windows.input(0), self.window)?;
        let indices: Vec<usize> = (0..windows.len()).collect();
        let (input, _) = StockLSTM::make_batch(windows, &indices);
        let input = input.to_device(self.vs.device());
        let output = tch::no_grad(|| self.net.forward_t(&input, false))
            .squeeze_dim(-1)
            .to_device(Device::Cpu)
            .to_kind(tch::Kind::Double);
        Ok(Vec::<CpuFloat>::try_from(&output)?)
    }
}

impl Forecaster for LstmForecaster {
    type Model = LstmModel;

    fn train(
        &self,
        windows: &Windows,
        on_epoch: &mut dyn FnMut(EpochReport),
    ) -> Result<LstmModel> {
        let config = &self.config;
        if windows.is_empty() {
            return Err(Error::Training("No training windows".into()));
        }
        if config.batch_size == 0 {
            return Err(Error::InvalidParameter("Batch size must be positive".into()));
        }
        let seed = config.seed.unwrap_or_else(rand::random);
        let _rng_guard = TORCH_RNG.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("Training StockLSTM with seed {} on {:?}", seed, self.device);
        tch::manual_seed(seed as i64);
        let mut rng = StdRng::seed_from_u64(seed);

        let vs = VarStore::new(self.device);
        let net = StockLSTMDesc {
            hidden: config.recurrent_hidden,
            dense: config.dense_hidden,
            dropout: config.dropout,
        }
        .build(&vs);
        let mut opt = nn::Adam::default().build(&vs, config.learning_rate)?;

        let mut order: Vec<usize> = (0..windows.len()).collect();
        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            let mut sum_loss = 0.0;
            let mut batches = 0;
            for batch in order.chunks(config.batch_size) {
                let (input_batch, output_batch) = StockLSTM::make_batch(windows, batch);
                let input_batch = input_batch.to_device(self.device);
                let output_batch = output_batch.to_device(self.device);
                let loss = net.loss(&input_batch, &output_batch);
                opt.backward_step(&loss);
                sum_loss += loss.f_double_value(&[])?;
                batches += 1;
            }
            let loss = sum_loss / batches as CpuFloat;
            if !loss.is_finite() {
                return Err(Error::Training(format!(
                    "Loss diverged to {} in epoch {}",
                    loss, epoch
                )));
            }
            on_epoch(EpochReport {
                epoch,
                epochs: config.epochs,
                loss,
            });
        }

        Ok(LstmModel {
            vs,
            net,
            window: windows.length(),
        })
    }
}
