/*!
Slicing a scaled series into fixed-length input windows with next-step targets
*/
use crate::{CpuFloat, Error, Result};
use std::ops::Range;

/// The default number of prices in an input window
pub const DEFAULT_WINDOW: usize = 60;

/// A set of overlapping windows over a scaled series.
///
/// Window `i` covers `values[i..i + length]` and its target is `values[i + length]`. Windows borrow the series
/// rather than copying it, and a split just narrows the range of window indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Windows<'a, F = CpuFloat> {
    values: &'a [F],
    length: usize,
    range: Range<usize>,
}

impl<'a, F: Copy> Windows<'a, F> {
    /// Build every window of `length` values over a scaled series.
    ///
    /// A series of `n` values yields `n - length` windows; at least one window must fit.
    pub fn new(values: &'a [F], length: usize) -> Result<Windows<'a, F>> {
        if length == 0 {
            return Err(Error::InvalidParameter(format!(
                "Invalid sequence length: {}",
                length
            )));
        }
        if values.len() <= length {
            return Err(Error::InsufficientData {
                needed: length + 1,
                got: values.len(),
            });
        }
        Ok(Windows {
            values,
            length,
            range: 0..values.len() - length,
        })
    }
    /// The number of values in each window
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }
    /// The number of windows
    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }
    /// Whether there are no windows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
    /// The position in the underlying series of each window's target
    pub fn target_indices(&self) -> Range<usize> {
        self.range.start + self.length..self.range.end + self.length
    }
    /// Get the `i`th window's inputs, relative to this set of windows
    #[inline]
    pub fn input(&self, i: usize) -> &'a [F] {
        let start = self.range.start + i;
        &self.values[start..start + self.length]
    }
    /// Get the `i`th window's target, relative to this set of windows
    #[inline]
    pub fn target(&self, i: usize) -> F {
        self.values[self.range.start + i + self.length]
    }
    /// Iterate over `(input, target)` pairs, ordered by the index of the target
    pub fn iter(&self) -> impl Iterator<Item = (&'a [F], F)> + '_ {
        (0..self.len()).map(move |i| (self.input(i), self.target(i)))
    }
    /// The targets of every window, in order
    pub fn targets(&self) -> Vec<F> {
        (0..self.len()).map(|i| self.target(i)).collect()
    }
    /// Split into a training prefix holding `floor(len * ratio)` windows and a test suffix holding the rest.
    ///
    /// The split is by position, so every training window precedes every test window.
    pub fn split(&self, ratio: f64) -> Result<(Windows<'a, F>, Windows<'a, F>)> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(Error::InvalidParameter(format!(
                "Invalid train/test split ratio: {}",
                ratio
            )));
        }
        let boundary = self.range.start + (self.len() as f64 * ratio) as usize;
        let train = Windows {
            range: self.range.start..boundary,
            ..self.clone()
        };
        let test = Windows {
            range: boundary..self.range.end,
            ..self.clone()
        };
        Ok((train, test))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_n_minus_l_windows() {
        let values: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();
        let windows = Windows::new(&values, 3).unwrap();
        assert_eq!(windows.len(), 7);
        for (i, (input, target)) in windows.iter().enumerate() {
            assert_eq!(input.len(), 3);
            assert_eq!(input, &values[i..i + 3]);
            assert_eq!(target, values[i + 3]);
        }
        assert_eq!(windows.target_indices(), 3..10);
    }

    #[test]
    fn rejects_bad_lengths() {
        let values = [0.0, 0.5, 1.0];
        assert!(Windows::new(&values[..], 0).unwrap_err().is_client_error());
        match Windows::new(&values[..], 3) {
            Err(Error::InsufficientData { needed: 4, got: 3 }) => {}
            other => panic!("Unexpected result {:?}", other),
        }
        assert_eq!(Windows::new(&values[..], 2).unwrap().len(), 1);
    }

    #[test]
    fn split_preserves_order() {
        let values: Vec<f64> = (0..15).map(f64::from).collect();
        let windows = Windows::new(&values, 5).unwrap();
        let (train, test) = windows.split(0.8).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        assert_eq!(train.target_indices().end, test.target_indices().start);
        assert_eq!(test.input(0), &values[8..13]);
        assert_eq!(test.targets(), vec![13.0, 14.0]);
        assert!(windows.split(1.5).is_err());
    }
}
