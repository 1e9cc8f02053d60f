/*!
Scoring predictions against held-out prices
*/
use crate::data::scale::MinMaxScaler;
use crate::{CpuFloat, Error, Result};

/// Predictions and actual prices for the test period, mapped back onto the price scale
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Predicted prices
    pub predicted: Vec<CpuFloat>,
    /// Actual prices
    pub actual: Vec<CpuFloat>,
    /// Root mean squared error of the predicted prices
    pub rmse: CpuFloat,
}

/// Root mean squared error between two equal-length, non-empty sequences
pub fn rmse(predicted: &[CpuFloat], actual: &[CpuFloat]) -> Result<CpuFloat> {
    if predicted.len() != actual.len() || predicted.is_empty() {
        return Err(Error::ShapeMismatch {
            predicted: predicted.len(),
            actual: actual.len(),
        });
    }
    let sum_sq: CpuFloat = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    Ok((sum_sq / predicted.len() as CpuFloat).sqrt())
}

/// Inverse-transform scaled predictions and targets with the series' scaler, then score them
pub fn evaluate(
    predicted: &[CpuFloat],
    actual: &[CpuFloat],
    scaler: &MinMaxScaler,
) -> Result<Evaluation> {
    let predicted = scaler.inverse_all(predicted);
    let actual = scaler.inverse_all(actual);
    let rmse = rmse(&predicted, &actual)?;
    Ok(Evaluation {
        predicted,
        actual,
        rmse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rmse_is_on_price_scale() {
        let scaler = MinMaxScaler {
            min: 100.0,
            max: 200.0,
        };
        let eval = evaluate(&[0.1, 0.5], &[0.1, 0.2], &scaler).unwrap();
        let close = |a: &[f64], b: &[f64]| a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9);
        assert!(close(&eval.actual, &[110.0, 120.0]));
        assert!(close(&eval.predicted, &[110.0, 150.0]));
        // errors of 0 and 30 => sqrt(450)
        assert!((eval.rmse - 450f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn mismatched_or_empty_inputs_fail() {
        match rmse(&[1.0, 2.0], &[1.0]) {
            Err(Error::ShapeMismatch {
                predicted: 2,
                actual: 1,
            }) => {}
            other => panic!("Unexpected result {:?}", other),
        }
        assert!(rmse(&[], &[]).is_err());
        assert_eq!(rmse(&[3.0], &[3.0]).unwrap(), 0.0);
    }
}
