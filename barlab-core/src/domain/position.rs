use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Flat,
    Short,
}

/// The single net position of an account.
///
/// `units` is a magnitude; the sign lives in `direction`. `units == 0.0`
/// exactly when `direction == Flat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub units: f64,
    /// Average raw fill price of the open units.
    pub entry_price: f64,
    pub entry_index: usize,
    pub entry_time: Option<DateTime<Utc>>,
}

impl Position {
    pub fn flat() -> Self {
        Self {
            direction: Direction::Flat,
            units: 0.0,
            entry_price: 0.0,
            entry_index: 0,
            entry_time: None,
        }
    }

    pub fn open(
        direction: Direction,
        units: f64,
        price: f64,
        index: usize,
        time: DateTime<Utc>,
    ) -> Self {
        debug_assert!(direction != Direction::Flat && units > 0.0);
        Self {
            direction,
            units,
            entry_price: price,
            entry_index: index,
            entry_time: Some(time),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.direction == Direction::Flat
    }

    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    /// Units with sign: positive long, negative short.
    pub fn signed_units(&self) -> f64 {
        match self.direction {
            Direction::Long => self.units,
            Direction::Short => -self.units,
            Direction::Flat => 0.0,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.signed_units() * price
    }

    /// Price move since entry times signed units. Excludes commission.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.signed_units() * (price - self.entry_price)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::flat()
    }
}
