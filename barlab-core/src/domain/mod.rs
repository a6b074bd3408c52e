//! Domain types for BarLab.

pub mod bar;
pub mod ids;
pub mod order;
pub mod position;
pub mod series;
pub mod trade;

#[cfg(test)]
pub(crate) mod test_support;

pub use bar::Bar;
pub use ids::{IdGen, OrderId};
pub use order::{
    Fill, Order, OrderIntent, OrderRejected, OrderSide, OrderSize, OrderStatus, RejectReason,
};
pub use position::{Direction, Position};
pub use series::{PriceSeries, SeriesError};
pub use trade::TradeRecord;
