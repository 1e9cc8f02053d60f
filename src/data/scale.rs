/*!
Input data scaling
*/
use crate::CpuFloat;
use num::Float;
use ta::Close;

/// A min-max scaler, mapping the range of the data it was fit on linearly onto `[0, 1]`.
///
/// The `(min, max)` pair is the only way back to prices: every inverse transform for a given series must go
/// through the scaler fit on that whole series, never one refit on a subset.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MinMaxScaler<F = CpuFloat> {
    /// The smallest value seen while fitting
    pub min: F,
    /// The largest value seen while fitting
    pub max: F,
}

impl<F> MinMaxScaler<F>
where
    F: Copy + Float,
{
    /// Fit a scaler to a set of values, returning `None` if there are no finite values
    pub fn fit<I>(values: I) -> Option<MinMaxScaler<F>>
    where
        I: IntoIterator<Item = F>,
    {
        values
            .into_iter()
            .filter(|val| val.is_finite())
            .fold(None, |acc: Option<MinMaxScaler<F>>, val| {
                Some(match acc {
                    None => MinMaxScaler { min: val, max: val },
                    Some(scaler) => MinMaxScaler {
                        min: scaler.min.min(val),
                        max: scaler.max.max(val),
                    },
                })
            })
    }
    /// The width of the fitted range
    #[inline]
    pub fn range(&self) -> F {
        self.max - self.min
    }
    /// Scale a value into `[0, 1]`. A degenerate (constant) range maps everything to zero.
    #[inline]
    pub fn scale(&self, val: F) -> F {
        let range = self.range();
        if range == F::zero() {
            return F::zero();
        }
        (val - self.min) / range
    }
    /// Map a scaled value back onto the original range
    #[inline]
    pub fn inverse(&self, scaled: F) -> F {
        scaled * self.range() + self.min
    }
    /// Scale a slice of values
    pub fn scale_all(&self, values: &[F]) -> Vec<F> {
        values.iter().map(|val| self.scale(*val)).collect()
    }
    /// Map a slice of scaled values back onto the original range
    pub fn inverse_all(&self, scaled: &[F]) -> Vec<F> {
        scaled.iter().map(|val| self.inverse(*val)).collect()
    }
}

impl MinMaxScaler {
    /// Fit a scaler to the closing prices of a sequence of bars, returning it with the scaled closes
    pub fn fit_closes<'a, C, I>(bars: I) -> Option<(MinMaxScaler, Vec<CpuFloat>)>
    where
        C: Close + 'a,
        I: IntoIterator<Item = &'a C>,
    {
        let closes: Vec<CpuFloat> = bars.into_iter().map(Close::close).collect();
        let scaler = MinMaxScaler::fit(closes.iter().copied())?;
        let scaled = scaler.scale_all(&closes);
        Some((scaler, scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_onto_unit_interval() {
        let values = [12.0, 10.0, 15.0, 20.0];
        let scaler = MinMaxScaler::fit(values.iter().copied()).unwrap();
        assert_eq!(scaler, MinMaxScaler { min: 10.0, max: 20.0 });
        assert_eq!(scaler.scale_all(&values), vec![0.2, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn inverse_round_trips() {
        let values = [101.25, 99.5, 130.75, 87.125, 115.0];
        let scaler = MinMaxScaler::fit(values.iter().copied()).unwrap();
        for val in values.iter() {
            assert!((scaler.inverse(scaler.scale(*val)) - val).abs() < 1e-9);
        }
    }

    #[test]
    fn degenerate_ranges() {
        assert_eq!(MinMaxScaler::<f64>::fit(Vec::new()), None);
        assert_eq!(MinMaxScaler::<f64>::fit(vec![f64::NAN]), None);
        let flat = MinMaxScaler::fit(vec![5.0f32, 5.0]).unwrap();
        assert_eq!(flat.scale(5.0), 0.0);
        assert_eq!(flat.inverse(0.0), 5.0);
    }
}
