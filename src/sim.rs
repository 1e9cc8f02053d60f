/*!
A greedy trading simulation driven by forecasts.

Each day from the second onwards, the forecast for that day is compared with the previous day's actual close. A
forecast above it buys as many whole shares as the cash balance allows; a forecast below it sells everything held.
Trades fill at the current day's actual close, with no slippage, partial fills or costs. Any shares still held at
the end are sold at the last close, so the simulation always finishes flat.
*/
use crate::{CpuFloat, Error, Result};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A trade direction
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Shares were bought
    #[serde(rename = "Bought")]
    Buy,
    /// Shares were sold
    #[serde(rename = "Sold")]
    Sell,
}

/// A trade made by the simulation
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// The trading day
    pub date: NaiveDate,
    /// Whether shares were bought or sold
    pub action: Action,
    /// The number of shares traded
    pub shares: u64,
    /// The fill price
    pub price: CpuFloat,
    /// The cash balance after the trade
    pub balance: CpuFloat,
}

/// Cash and shares held
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Position {
    /// Cash balance; never negative
    pub balance: CpuFloat,
    /// Shares held
    pub shares: u64,
}

impl Position {
    /// Buy as many whole shares as the balance allows at `price`, if it allows any
    fn buy(self, price: CpuFloat) -> Option<(Position, u64)> {
        if !(self.balance > price) {
            return None;
        }
        let mut shares = (self.balance / price).floor() as u64;
        // The rounded quotient can land on a whole number just above the true one
        if shares as CpuFloat * price > self.balance {
            shares -= 1;
        }
        let position = Position {
            balance: self.balance - shares as CpuFloat * price,
            shares: self.shares + shares,
        };
        Some((position, shares))
    }
    /// Sell every share held at `price`, if any are held
    fn sell(self, price: CpuFloat) -> Option<(Position, u64)> {
        if self.shares == 0 {
            return None;
        }
        let position = Position {
            balance: self.balance + self.shares as CpuFloat * price,
            shares: 0,
        };
        Some((position, self.shares))
    }
}

/// The outcome of a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    /// The starting cash balance
    pub initial_balance: CpuFloat,
    /// The cash balance after liquidating
    pub final_balance: CpuFloat,
    /// Every trade made, in date order
    pub trades: Vec<TradeRecord>,
}

impl Simulation {
    /// Final balance less initial balance
    pub fn profit_loss(&self) -> CpuFloat {
        self.final_balance - self.initial_balance
    }
}

/// Replay the strategy over aligned predicted prices, actual prices and dates
pub fn simulate(
    predicted: &[CpuFloat],
    actual: &[CpuFloat],
    dates: &[NaiveDate],
    initial_balance: CpuFloat,
) -> Result<Simulation> {
    if predicted.len() != actual.len() || actual.len() != dates.len() {
        return Err(Error::ShapeMismatch {
            predicted: predicted.len(),
            actual: actual.len().min(dates.len()),
        });
    }
    if !(initial_balance.is_finite() && initial_balance >= 0.0) {
        return Err(Error::InvalidParameter(format!(
            "Invalid initial balance {}",
            initial_balance
        )));
    }

    let mut position = Position {
        balance: initial_balance,
        shares: 0,
    };
    let mut trades = Vec::new();
    let days = actual
        .iter()
        .tuple_windows()
        .zip(predicted.iter().skip(1))
        .zip(dates.iter().skip(1));
    for (((&prev, &price), &forecast), &date) in days {
        let trade = if forecast > prev {
            position.buy(price).map(|trade| (Action::Buy, trade))
        } else if forecast < prev {
            position.sell(price).map(|trade| (Action::Sell, trade))
        } else {
            None
        };
        if let Some((action, (next, shares))) = trade {
            position = next;
            trades.push(TradeRecord {
                date,
                action,
                shares,
                price,
                balance: position.balance,
            });
        }
    }

    if let (Some(&price), Some(&date)) = (actual.last(), dates.last()) {
        if let Some((next, shares)) = position.sell(price) {
            position = next;
            trades.push(TradeRecord {
                date,
                action: Action::Sell,
                shares,
                price,
                balance: position.balance,
            });
        }
    }
    debug_assert_eq!(position.shares, 0);

    Ok(Simulation {
        initial_balance,
        final_balance: position.balance,
        trades,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::weekdays_after;

    fn dates(n: usize) -> Vec<NaiveDate> {
        weekdays_after(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), n)
    }

    fn cash_flow(sim: &Simulation) -> CpuFloat {
        sim.trades
            .iter()
            .map(|trade| match trade.action {
                Action::Buy => -(trade.shares as CpuFloat) * trade.price,
                Action::Sell => trade.shares as CpuFloat * trade.price,
            })
            .sum()
    }

    #[test]
    fn worked_example() {
        let actual = [100.0, 100.0, 90.0, 95.0];
        let predicted = [0.0, 105.0, 85.0, 97.0];
        let dates = dates(4);
        let sim = simulate(&predicted, &actual, &dates, 1000.0).unwrap();
        let summary: Vec<_> = sim
            .trades
            .iter()
            .map(|t| (t.date, t.action, t.shares, t.price, t.balance))
            .collect();
        assert_eq!(
            summary,
            vec![
                (dates[1], Action::Buy, 10, 100.0, 0.0),
                (dates[2], Action::Sell, 10, 90.0, 900.0),
                (dates[3], Action::Buy, 9, 95.0, 45.0),
                (dates[3], Action::Sell, 9, 95.0, 900.0),
            ]
        );
        assert_eq!(sim.final_balance, 900.0);
        assert_eq!(sim.profit_loss(), -100.0);
    }

    #[test]
    fn ties_do_nothing() {
        let actual = [100.0, 101.0, 102.0];
        let predicted = [0.0, 100.0, 101.0];
        let sim = simulate(&predicted, &actual, &dates(3), 500.0).unwrap();
        assert!(sim.trades.is_empty());
        assert_eq!(sim.final_balance, 500.0);
    }

    #[test]
    fn cannot_buy_without_cash() {
        let actual = [100.0, 120.0, 130.0];
        let predicted = [0.0, 200.0, 200.0];
        let sim = simulate(&predicted, &actual, &dates(3), 120.0).unwrap();
        // balance must strictly exceed the price
        assert!(sim.trades.is_empty());
        let sim = simulate(&predicted, &actual, &dates(3), 121.0).unwrap();
        assert_eq!(sim.trades[0].action, Action::Buy);
        assert_eq!(sim.trades[0].shares, 1);
    }

    #[test]
    fn buys_never_overspend() {
        let position = Position {
            balance: 1.7,
            shares: 0,
        };
        let (after, shares) = position.buy(0.1).unwrap();
        assert_eq!(shares, 16);
        assert!(after.balance >= 0.0);
        let position = Position {
            balance: 1.63,
            shares: 0,
        };
        let (after, shares) = position.buy(0.01).unwrap();
        assert_eq!(shares, 162);
        assert!(after.balance >= 0.0);
    }

    #[test]
    fn always_ends_flat_and_conserves_cash() {
        let actual: Vec<f64> = (0..50)
            .map(|i| 100.0 + ((i as f64) * 0.7).sin() * 10.0)
            .collect();
        let predicted: Vec<f64> = (0..50)
            .map(|i| 100.0 + ((i as f64 + 1.0) * 0.7).sin() * 10.0)
            .collect();
        let dates = dates(50);
        let sim = simulate(&predicted, &actual, &dates, 10_000.0).unwrap();
        assert!(!sim.trades.is_empty());
        let held: i64 = sim
            .trades
            .iter()
            .map(|t| match t.action {
                Action::Buy => t.shares as i64,
                Action::Sell => -(t.shares as i64),
            })
            .sum();
        assert_eq!(held, 0);
        assert!((sim.final_balance - (10_000.0 + cash_flow(&sim))).abs() < 1e-6);
        assert!(sim.trades.iter().all(|t| t.balance >= 0.0));
        assert!(sim.trades.windows(2).all(|w| w[0].date <= w[1].date));

        let again = simulate(&predicted, &actual, &dates, 10_000.0).unwrap();
        assert_eq!(sim, again);
    }

    #[test]
    fn degenerate_inputs() {
        let sim = simulate(&[], &[], &[], 100.0).unwrap();
        assert!(sim.trades.is_empty());
        assert_eq!(sim.profit_loss(), 0.0);
        assert!(simulate(&[1.0], &[1.0, 2.0], &dates(2), 100.0).is_err());
        assert!(simulate(&[1.0], &[1.0], &dates(1), f64::NAN).is_err());
    }

    #[test]
    fn actions_serialize_as_past_tense() {
        assert_eq!(serde_json::to_string(&Action::Buy).unwrap(), "\"Bought\"");
        assert_eq!(serde_json::to_string(&Action::Sell).unwrap(), "\"Sold\"");
    }
}
