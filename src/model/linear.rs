/*!
An autoregressive linear model, fit by ridge-regularized least squares
*/
use super::{check_window, EpochReport, ForecastConfig, Forecaster, Predictor};
use crate::data::window::Windows;
use crate::{CpuFloat, Error, Result};
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use tracing::debug;

/// Fits `y = w . x + b` over each window `x`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LinearForecaster {
    /// L2 penalty on the weights (not the intercept)
    pub ridge: CpuFloat,
}

impl LinearForecaster {
    /// Build a linear forecaster from a run configuration
    pub fn new(config: &ForecastConfig) -> LinearForecaster {
        LinearForecaster {
            ridge: config.ridge,
        }
    }
}

/// A trained linear model
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    /// One weight per window position, oldest first
    pub weights: Vec<CpuFloat>,
    /// The intercept
    pub bias: CpuFloat,
}

impl Predictor for LinearModel {
    fn predict(&self, window: &[CpuFloat]) -> Result<CpuFloat> {
        check_window(window, self.weights.len())?;
        Ok(self
            .weights
            .iter()
            .zip(window)
            .fold(self.bias, |acc, (w, x)| acc + w * x))
    }
}

impl Forecaster for LinearForecaster {
    type Model = LinearModel;

    fn train(
        &self,
        windows: &Windows,
        on_epoch: &mut dyn FnMut(EpochReport),
    ) -> Result<LinearModel> {
        if windows.is_empty() {
            return Err(Error::Training("No training windows".into()));
        }
        // Design matrix [x, 1], one row per window
        let n = windows.length() + 1;
        let mut design = Array2::<CpuFloat>::ones((windows.len(), n));
        for (mut row, (input, _)) in design.axis_iter_mut(Axis(0)).zip(windows.iter()) {
            row.slice_mut(s![..n - 1])
                .assign(&ArrayView1::from(input));
        }
        let targets = Array1::from(windows.targets());

        // Normal equations, penalizing every weight but the intercept
        let xt = design.t();
        let mut gram = xt.dot(&design);
        let moment = xt.dot(&targets);
        gram.diag_mut()
            .slice_mut(s![..n - 1])
            .mapv_inplace(|d| d + self.ridge);
        let solution = solve(gram, moment)?;
        let model = LinearModel {
            weights: solution.slice(s![..n - 1]).to_vec(),
            bias: solution[n - 1],
        };

        let residuals = design.dot(&solution) - &targets;
        let loss = residuals.mapv(|r| r * r).mean().unwrap_or(0.0);
        debug!("Linear model fit on {} windows, mse = {}", windows.len(), loss);
        on_epoch(EpochReport {
            epoch: 0,
            epochs: 1,
            loss,
        });
        Ok(model)
    }
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting
fn solve(mut a: Array2<CpuFloat>, mut b: Array1<CpuFloat>) -> Result<Array1<CpuFloat>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-12 {
            return Err(Error::Training(
                "Singular system fitting linear model; try a larger ridge penalty".into(),
            ));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        let pivot_row = a.row(col).to_owned();
        for row in col + 1..n {
            let factor = a[[row, col]] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            a.row_mut(row).scaled_add(-factor, &pivot_row);
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::<CpuFloat>::zeros(n);
    for row in (0..n).rev() {
        let tail = a.slice(s![row, row + 1..]).dot(&x.slice(s![row + 1..]));
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn solves_small_systems() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let x = solve(a, array![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
        // needs a row swap before eliminating
        let x = solve(array![[0.0, 1.0], [2.0, 0.0]], array![3.0, 4.0]).unwrap();
        assert_eq!(x, array![2.0, 3.0]);
        assert!(solve(array![[0.0]], array![1.0]).is_err());
    }

    #[test]
    fn recovers_a_linear_recurrence() {
        // x[t] = 0.5 x[t-1] + 0.3 x[t-2] + 0.1, started away from its fixed point
        let mut values = vec![0.9, 0.05];
        for t in 2..80 {
            let next = 0.5 * values[t - 1] + 0.3 * values[t - 2] + 0.1;
            values.push(next);
        }
        let windows = Windows::new(&values[..], 2).unwrap();
        let mut epochs = 0;
        let model = LinearForecaster { ridge: 0.0 }
            .train(&windows, &mut |_| epochs += 1)
            .unwrap();
        assert_eq!(epochs, 1);
        assert_eq!(model.weights.len(), 2);
        let predicted = model.predict(&values[10..12]).unwrap();
        assert!((predicted - values[12]).abs() < 1e-6);
        assert!((model.weights[1] - 0.5).abs() < 1e-6);
        assert!(model.predict(&values[..3]).is_err());
    }

    #[test]
    fn predictions_are_deterministic() {
        let values: Vec<f64> = (0..40).map(|i| ((i as f64) * 0.3).sin() * 0.5 + 0.5).collect();
        let windows = Windows::new(&values[..], 5).unwrap();
        let forecaster = LinearForecaster { ridge: 1e-6 };
        let model = forecaster.train(&windows, &mut |_| ()).unwrap();
        let window = &values[20..25];
        assert_eq!(model.predict(window).unwrap(), model.predict(window).unwrap());
    }
}
