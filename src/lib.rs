/*!
Forecast daily closing prices with a recurrent network and replay a toy trading strategy against the forecast.

Designed to be run on [Yahoo Finance](https://finance.yahoo.com/) daily bars, but also to be modular: data sources
and forecasters are traits, so the pipeline runs just as well on CSV files, generated data or a simple linear model.
Served over HTTP by `closecast-server`, or run locally with `closecast`.
*/
#![forbid(missing_docs)]

pub mod data;
pub mod error;
pub mod evaluate;
pub mod horizon;
#[cfg(feature = "lstm")]
pub mod lstm;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod sim;
pub mod util;

pub use error::{Error, Result};

/// The floating point type to be used for CPU calculations
pub type CpuFloat = f64;

/// The floating point type to be used for GPU calculations
pub type GpuFloat = f32;
