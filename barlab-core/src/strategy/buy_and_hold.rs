//! Baseline strategy: go all-in on the first processed bar and hold.

use super::{BarContext, InitContext, Strategy, StrategyFault};
use crate::domain::OrderIntent;

#[derive(Debug, Clone, Default)]
pub struct BuyAndHold {
    bought: bool,
}

impl BuyAndHold {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn initialize(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), StrategyFault> {
        self.bought = false;
        Ok(())
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> Result<Vec<OrderIntent>, StrategyFault> {
        if self.bought || !ctx.position().is_flat() {
            return Ok(Vec::new());
        }
        self.bought = true;
        Ok(vec![OrderIntent::buy()])
    }
}
