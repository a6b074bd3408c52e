//! Orders: strategy intents and their broker-side lifecycle.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// How much an order should trade.
///
/// `All` means all available cash for a buy and all held units for a sell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum OrderSize {
    #[default]
    All,
    /// Absolute number of units (fractional units allowed).
    Units(f64),
    /// Fraction in `(0, 1]` of available cash (buy) or held units (sell).
    Fraction(f64),
}

impl OrderSize {
    /// False when a `Units` or `Fraction` amount is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::All => true,
            Self::Units(x) | Self::Fraction(x) => x.is_finite(),
        }
    }
}

/// What a strategy wants to happen on the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub side: OrderSide,
    pub size: OrderSize,
}

impl OrderIntent {
    /// Buy with all available cash.
    pub fn buy() -> Self {
        Self {
            side: OrderSide::Buy,
            size: OrderSize::All,
        }
    }

    /// Sell all held units.
    pub fn sell() -> Self {
        Self {
            side: OrderSide::Sell,
            size: OrderSize::All,
        }
    }

    pub fn with_size(mut self, size: OrderSize) -> Self {
        self.size = size;
        self
    }
}

/// Why the broker refused an order. Rejections are recoverable.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("insufficient cash: need {required:.4}, have {available:.4}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("no long position to sell")]
    NoPosition,

    /// Debug rendering of the requested size (it may hold NaN).
    #[error("invalid order size {0}")]
    InvalidSize(String),
}

/// A rejected order, as reported by the broker.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("order {order_id} rejected: {reason}")]
pub struct OrderRejected {
    pub order_id: OrderId,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Filled,
    /// The intent resolved to zero units; nothing to do.
    Cancelled,
    Rejected(RejectReason),
}

/// Execution details of a filled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Raw fill price (the bar close), before commission.
    pub price: f64,
    pub units: f64,
    pub commission: f64,
}

/// A single order and its final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub size: OrderSize,
    pub status: OrderStatus,
    pub fill: Option<Fill>,
}

impl Order {
    pub fn is_filled(&self) -> bool {
        matches!(self.status, OrderStatus::Filled)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.status, OrderStatus::Rejected(_))
    }
}
