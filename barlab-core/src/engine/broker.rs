//! Broker / account simulator.
//!
//! Holds cash, the single net position, the order list and the trade ledger.
//! Every order is settled immediately at the price it is submitted with (the
//! current bar's close), so an order never stays `Pending` past the bar that
//! produced it.
//!
//! Commission is a fraction `c` of notional:
//! - buy cost       = price * (1 + c) * units
//! - sell proceeds  = price * (1 - c) * units
//!
//! Orders are atomic: a rejection leaves the account untouched.

use crate::domain::{
    Direction, Fill, IdGen, Order, OrderIntent, OrderRejected, OrderSide, OrderSize,
    OrderStatus, Position, RejectReason, TradeRecord,
};
use chrono::{DateTime, Utc};

/// Relative slack when comparing a buy's cost with available cash.
const CASH_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Broker {
    commission_rate: f64,
    exclusive_orders: bool,
    cash: f64,
    position: Position,
    orders: Vec<Order>,
    trades: Vec<TradeRecord>,
    ids: IdGen,
}

/// Where an order executes.
#[derive(Debug, Clone, Copy)]
struct Quote {
    index: usize,
    time: DateTime<Utc>,
    price: f64,
}

impl Broker {
    pub fn new(starting_cash: f64, commission_rate: f64, exclusive_orders: bool) -> Self {
        Self {
            commission_rate,
            exclusive_orders,
            cash: starting_cash,
            position: Position::flat(),
            orders: Vec::new(),
            trades: Vec::new(),
            ids: IdGen::default(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Cash plus the open position marked at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    /// Submit an intent and settle it at `price`.
    ///
    /// Returns the fill, `None` when the intent resolved to zero units
    /// (recorded as `Cancelled`), or the rejection. Every outcome is appended
    /// to the order list.
    pub fn submit(
        &mut self,
        intent: OrderIntent,
        bar_index: usize,
        timestamp: DateTime<Utc>,
        price: f64,
    ) -> Result<Option<Fill>, OrderRejected> {
        let id = self.ids.next_order_id();
        let quote = Quote {
            index: bar_index,
            time: timestamp,
            price,
        };

        let outcome = match intent.side {
            OrderSide::Buy => self.settle_buy(intent.size, quote),
            OrderSide::Sell => self.settle_sell(intent.size, quote),
        };

        let (status, fill) = match &outcome {
            Ok(Some(fill)) => (OrderStatus::Filled, Some(fill.clone())),
            Ok(None) => (OrderStatus::Cancelled, None),
            Err(reason) => (OrderStatus::Rejected(reason.clone()), None),
        };
        // Non-finite sizes are kept only in the rejection text; JSON has no NaN.
        let size = if intent.size.is_finite() {
            intent.size
        } else {
            OrderSize::Units(0.0)
        };
        self.orders.push(Order {
            id,
            bar_index,
            timestamp,
            side: intent.side,
            size,
            status,
            fill,
        });

        outcome.map_err(|reason| OrderRejected {
            order_id: id,
            reason,
        })
    }

    /// Flatten the open position at `price`. No-op when already flat.
    pub fn close_position(
        &mut self,
        bar_index: usize,
        timestamp: DateTime<Utc>,
        price: f64,
    ) -> Result<Option<Fill>, OrderRejected> {
        let intent = match self.position.direction {
            Direction::Flat => return Ok(None),
            Direction::Long => OrderIntent::sell(),
            Direction::Short => {
                OrderIntent::buy().with_size(OrderSize::Units(self.position.units))
            }
        };
        self.submit(intent, bar_index, timestamp, price)
    }

    fn settle_buy(
        &mut self,
        size: OrderSize,
        quote: Quote,
    ) -> Result<Option<Fill>, RejectReason> {
        validate_size(size)?;
        let c = self.commission_rate;
        let unit_cost = quote.price * (1.0 + c);

        let units = match size {
            OrderSize::All => self.cash / unit_cost,
            OrderSize::Fraction(f) => f * self.cash / unit_cost,
            OrderSize::Units(n) => n,
        };
        if units <= 0.0 {
            if matches!(size, OrderSize::All) || self.cash <= 0.0 {
                return Err(RejectReason::InsufficientCash {
                    required: unit_cost,
                    available: self.cash,
                });
            }
            return Ok(None);
        }

        let cost = match size {
            OrderSize::All => self.cash,
            OrderSize::Fraction(f) => f * self.cash,
            OrderSize::Units(_) => units * unit_cost,
        };
        if cost > self.cash * (1.0 + CASH_TOLERANCE) {
            return Err(RejectReason::InsufficientCash {
                required: cost,
                available: self.cash,
            });
        }

        let covered = if self.position.is_short() {
            units.min(self.position.units)
        } else {
            0.0
        };
        if covered > 0.0 {
            self.reduce_position(covered, quote);
        }
        let opened = units - covered;
        if opened > 0.0 {
            self.add_to_position(Direction::Long, opened, quote);
        }

        self.cash = (self.cash - cost).max(0.0);
        Ok(Some(Fill {
            price: quote.price,
            units,
            commission: quote.price * c * units,
        }))
    }

    fn settle_sell(
        &mut self,
        size: OrderSize,
        quote: Quote,
    ) -> Result<Option<Fill>, RejectReason> {
        validate_size(size)?;
        let c = self.commission_rate;
        let held = if self.position.is_long() {
            self.position.units
        } else {
            0.0
        };

        let units = match size {
            OrderSize::All | OrderSize::Fraction(_) if held == 0.0 => {
                return Err(RejectReason::NoPosition);
            }
            OrderSize::Units(_) if held == 0.0 && self.exclusive_orders => {
                return Err(RejectReason::NoPosition);
            }
            OrderSize::All => held,
            OrderSize::Fraction(f) => f * held,
            OrderSize::Units(n) if self.exclusive_orders => n.min(held),
            OrderSize::Units(n) => n,
        };
        if units <= 0.0 {
            return Ok(None);
        }

        let closed = units.min(held);
        if closed > 0.0 {
            self.reduce_position(closed, quote);
        }
        let shorted = units - closed;
        if shorted > 0.0 {
            self.add_to_position(Direction::Short, shorted, quote);
        }

        self.cash += quote.price * (1.0 - c) * units;
        Ok(Some(Fill {
            price: quote.price,
            units,
            commission: quote.price * c * units,
        }))
    }

    fn add_to_position(&mut self, direction: Direction, units: f64, quote: Quote) {
        if self.position.is_flat() {
            self.position = Position::open(direction, units, quote.price, quote.index, quote.time);
            return;
        }
        debug_assert_eq!(self.position.direction, direction);
        let total = self.position.units + units;
        self.position.entry_price =
            (self.position.entry_price * self.position.units + quote.price * units) / total;
        self.position.units = total;
    }

    /// Close `units` of the open position and append the trade record.
    fn reduce_position(&mut self, units: f64, quote: Quote) {
        let c = self.commission_rate;
        let pos = &self.position;
        let entry = pos.entry_price;
        let exit = quote.price;

        let pnl = match pos.direction {
            Direction::Long => exit * (1.0 - c) * units - entry * (1.0 + c) * units,
            Direction::Short => entry * (1.0 - c) * units - exit * (1.0 + c) * units,
            Direction::Flat => 0.0,
        };

        self.trades.push(TradeRecord {
            direction: pos.direction,
            entry_index: pos.entry_index,
            entry_time: pos.entry_time.unwrap_or(quote.time),
            entry_price: entry,
            exit_index: quote.index,
            exit_time: quote.time,
            exit_price: exit,
            units,
            pnl,
            commission: (entry + exit) * c * units,
        });

        let remaining = self.position.units - units;
        if remaining > 0.0 {
            self.position.units = remaining;
        } else {
            self.position = Position::flat();
        }
    }
}

fn validate_size(size: OrderSize) -> Result<(), RejectReason> {
    let valid = match size {
        OrderSize::All => true,
        OrderSize::Units(n) => n.is_finite() && n >= 0.0,
        OrderSize::Fraction(f) => f.is_finite() && (0.0..=1.0).contains(&f),
    };
    if valid {
        Ok(())
    } else {
        Err(RejectReason::InvalidSize(format!("{size:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::base_time;
    use crate::indicators::assert_approx;
    use chrono::Duration;

    fn at(minutes: i64) -> DateTime<Utc> {
        base_time() + Duration::minutes(minutes)
    }

    #[test]
    fn buy_all_consumes_cash() {
        let mut broker = Broker::new(10_000.0, 0.002, true);
        let fill = broker
            .submit(OrderIntent::buy(), 0, at(0), 100.0)
            .unwrap()
            .unwrap();
        assert_approx(fill.units, 10_000.0 / 100.2, 1e-9);
        assert_eq!(broker.cash(), 0.0);
        assert!(broker.position().is_long());
        assert_approx(broker.equity(100.0), fill.units * 100.0, 1e-9);
    }

    #[test]
    fn round_trip_records_losing_trade() {
        let mut broker = Broker::new(10_000.0, 0.002, true);
        broker.submit(OrderIntent::buy(), 0, at(0), 100.0).unwrap();
        broker.submit(OrderIntent::sell(), 2, at(30), 90.0).unwrap();

        assert!(broker.position().is_flat());
        assert_eq!(broker.trades().len(), 1);
        let trade = &broker.trades()[0];
        assert_eq!(trade.direction, Direction::Long);
        assert_eq!(trade.entry_index, 0);
        assert_eq!(trade.exit_index, 2);
        assert!(trade.pnl < 0.0);

        let units = 10_000.0 / 100.2;
        assert_approx(broker.cash(), units * 89.82, 1e-6);
        assert_approx(10_000.0 + trade.pnl, broker.cash(), 1e-6);
    }

    #[test]
    fn sell_without_position_is_rejected_and_changes_nothing() {
        let mut broker = Broker::new(10_000.0, 0.002, true);
        let err = broker
            .submit(OrderIntent::sell(), 0, at(0), 100.0)
            .unwrap_err();
        assert_eq!(err.reason, RejectReason::NoPosition);
        assert_eq!(broker.cash(), 10_000.0);
        assert!(broker.position().is_flat());
        assert!(broker.trades().is_empty());
        assert!(broker.orders()[0].is_rejected());
    }

    #[test]
    fn exclusive_sell_units_are_clamped_to_holding() {
        let mut broker = Broker::new(1_000.0, 0.0, true);
        broker
            .submit(OrderIntent::buy().with_size(OrderSize::Units(5.0)), 0, at(0), 100.0)
            .unwrap();
        let fill = broker
            .submit(OrderIntent::sell().with_size(OrderSize::Units(8.0)), 1, at(15), 100.0)
            .unwrap()
            .unwrap();
        assert_eq!(fill.units, 5.0);
        assert!(broker.position().is_flat());
        assert_eq!(broker.cash(), 1_000.0);
    }

    #[test]
    fn buy_beyond_cash_is_rejected() {
        let mut broker = Broker::new(1_000.0, 0.0, true);
        let err = broker
            .submit(OrderIntent::buy().with_size(OrderSize::Units(11.0)), 0, at(0), 100.0)
            .unwrap_err();
        assert!(matches!(err.reason, RejectReason::InsufficientCash { .. }));
        assert_eq!(broker.cash(), 1_000.0);
        assert!(broker.position().is_flat());
    }

    #[test]
    fn second_all_in_buy_is_rejected_for_cash() {
        let mut broker = Broker::new(1_000.0, 0.001, true);
        broker.submit(OrderIntent::buy(), 0, at(0), 100.0).unwrap();
        let err = broker
            .submit(OrderIntent::buy(), 1, at(15), 100.0)
            .unwrap_err();
        assert!(matches!(err.reason, RejectReason::InsufficientCash { .. }));
    }

    #[test]
    fn partial_buys_average_entry_price() {
        let mut broker = Broker::new(1_000.0, 0.0, true);
        broker
            .submit(OrderIntent::buy().with_size(OrderSize::Units(2.0)), 0, at(0), 100.0)
            .unwrap();
        broker
            .submit(OrderIntent::buy().with_size(OrderSize::Units(2.0)), 1, at(15), 110.0)
            .unwrap();
        assert_eq!(broker.position().units, 4.0);
        assert_approx(broker.position().entry_price, 105.0, 1e-12);
        assert_eq!(broker.position().entry_index, 0);
    }

    #[test]
    fn partial_sell_keeps_remainder_open() {
        let mut broker = Broker::new(1_000.0, 0.0, true);
        broker
            .submit(OrderIntent::buy().with_size(OrderSize::Units(4.0)), 0, at(0), 100.0)
            .unwrap();
        broker
            .submit(OrderIntent::sell().with_size(OrderSize::Fraction(0.5)), 1, at(15), 120.0)
            .unwrap();
        assert_eq!(broker.position().units, 2.0);
        assert_eq!(broker.trades().len(), 1);
        assert_approx(broker.trades()[0].pnl, 40.0, 1e-12);
    }

    #[test]
    fn non_exclusive_sell_opens_short_and_buy_reverses() {
        let mut broker = Broker::new(1_000.0, 0.0, false);
        broker
            .submit(OrderIntent::sell().with_size(OrderSize::Units(5.0)), 0, at(0), 100.0)
            .unwrap();
        assert!(broker.position().is_short());
        assert_eq!(broker.cash(), 1_500.0);
        assert_eq!(broker.equity(100.0), 1_000.0);

        // Buy closes the short, then opens a long with what is left.
        broker.submit(OrderIntent::buy(), 1, at(15), 80.0).unwrap();
        assert!(broker.position().is_long());
        assert_eq!(broker.trades().len(), 1);
        let short = &broker.trades()[0];
        assert_eq!(short.direction, Direction::Short);
        assert_approx(short.pnl, 100.0, 1e-12);
        assert_approx(broker.position().units, 1_500.0 / 80.0 - 5.0, 1e-9);
        assert_eq!(broker.cash(), 0.0);
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let mut broker = Broker::new(1_000.0, 0.0, true);
        for size in [
            OrderSize::Units(-1.0),
            OrderSize::Units(f64::NAN),
            OrderSize::Fraction(1.5),
        ] {
            let err = broker
                .submit(OrderIntent::buy().with_size(size), 0, at(0), 100.0)
                .unwrap_err();
            assert_eq!(err.reason, RejectReason::InvalidSize(format!("{size:?}")));
        }
        assert_eq!(broker.cash(), 1_000.0);
        assert_eq!(broker.orders()[1].size, OrderSize::Units(0.0));
        assert_eq!(broker.orders()[2].size, OrderSize::Fraction(1.5));
    }

    #[test]
    fn fractional_all_in_buy_fits_large_accounts() {
        for k in 0..2_000 {
            let cash = 1e9 + k as f64 * 12_345.678;
            let price = 3.0 + 0.37 * k as f64;
            let mut broker = Broker::new(cash, 0.002, true);
            let fill = broker
                .submit(
                    OrderIntent::buy().with_size(OrderSize::Fraction(1.0)),
                    0,
                    at(0),
                    price,
                )
                .unwrap_or_else(|e| panic!("cash={cash} price={price}: {e}"))
                .unwrap();
            assert!(fill.units > 0.0);
            assert_eq!(broker.cash(), 0.0);
        }
    }

    #[test]
    fn half_fraction_spends_half_the_cash() {
        let mut broker = Broker::new(1e9, 0.002, true);
        broker
            .submit(OrderIntent::buy().with_size(OrderSize::Fraction(0.5)), 0, at(0), 7.13)
            .unwrap();
        assert_eq!(broker.cash(), 5e8);
    }

    #[test]
    fn non_exclusive_buy_all_with_short_cash_only_covers_part() {
        // Short 10 @ 100 leaves cash 1_500; at 200 that covers 7.5 units.
        let mut broker = Broker::new(500.0, 0.0, false);
        broker
            .submit(OrderIntent::sell().with_size(OrderSize::Units(10.0)), 0, at(0), 100.0)
            .unwrap();
        let fill = broker
            .submit(OrderIntent::buy(), 1, at(15), 200.0)
            .unwrap()
            .unwrap();
        assert_approx(fill.units, 7.5, 1e-12);
        assert!(broker.position().is_short());
        assert_approx(broker.position().units, 2.5, 1e-12);
        assert_eq!(broker.cash(), 0.0);
        assert_eq!(broker.trades().len(), 1);
    }

    #[test]
    fn zero_units_is_cancelled() {
        let mut broker = Broker::new(1_000.0, 0.0, true);
        let outcome = broker
            .submit(OrderIntent::buy().with_size(OrderSize::Units(0.0)), 0, at(0), 100.0)
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(broker.orders()[0].status, OrderStatus::Cancelled);
    }

    #[test]
    fn close_position_flattens_long_and_short() {
        let mut broker = Broker::new(1_000.0, 0.0, false);
        broker.submit(OrderIntent::buy(), 0, at(0), 100.0).unwrap();
        broker.close_position(1, at(15), 110.0).unwrap();
        assert!(broker.position().is_flat());
        assert_eq!(broker.cash(), 1_100.0);

        broker
            .submit(OrderIntent::sell().with_size(OrderSize::Units(3.0)), 2, at(30), 100.0)
            .unwrap();
        broker.close_position(3, at(45), 90.0).unwrap();
        assert!(broker.position().is_flat());
        assert_approx(broker.cash(), 1_130.0, 1e-9);
        assert!(broker.close_position(4, at(60), 90.0).unwrap().is_none());
    }

    #[test]
    fn order_ids_are_sequential() {
        let mut broker = Broker::new(1_000.0, 0.0, true);
        let _ = broker.submit(OrderIntent::sell(), 0, at(0), 100.0);
        broker.submit(OrderIntent::buy(), 0, at(0), 100.0).unwrap();
        let ids: Vec<u64> = broker.orders().iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
