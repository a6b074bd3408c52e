//! EMA crossover with a McGinley Dynamic trend filter.
//!
//! - Buy: fast EMA crosses above slow EMA AND close > McGinley.
//! - Sell: slow EMA crosses above fast EMA OR close < McGinley.
//!
//! The entry needs both conditions while the exit needs either one. The
//! asymmetry is intentional and kept as is; see DESIGN.md.

use super::{BarContext, InitContext, Strategy, StrategyFault};
use crate::domain::OrderIntent;
use crate::indicators::{crossover, Ema, McGinley};
use serde::{Deserialize, Serialize};

const FAST: &str = "ema_fast";
const SLOW: &str = "ema_slow";
const TREND: &str = "mcginley";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaCrossParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub trend_period: usize,
}

impl Default for EmaCrossParams {
    fn default() -> Self {
        Self {
            fast_period: 51,
            slow_period: 101,
            trend_period: 21,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmaCrossMcGinley {
    params: EmaCrossParams,
}

impl EmaCrossMcGinley {
    pub fn new(params: EmaCrossParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EmaCrossParams {
        &self.params
    }
}

impl Strategy for EmaCrossMcGinley {
    fn name(&self) -> &str {
        "ema_cross_mcginley"
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> Result<(), StrategyFault> {
        let p = &self.params;
        if p.fast_period == 0 || p.slow_period == 0 || p.trend_period == 0 {
            return Err(format!("all periods must be >= 1, got {p:?}").into());
        }
        ctx.compute(&Ema::named(p.fast_period, FAST))?;
        ctx.compute(&Ema::named(p.slow_period, SLOW))?;
        ctx.compute(&McGinley::named(p.trend_period, TREND))?;
        Ok(())
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>) -> Result<Vec<OrderIntent>, StrategyFault> {
        let fast = ctx.require(FAST)?;
        let slow = ctx.require(SLOW)?;
        let Some(trend) = ctx.require(TREND)?.current() else {
            return Ok(Vec::new());
        };
        let close = ctx.close();

        if crossover(&fast, &slow) && close > trend {
            Ok(vec![OrderIntent::buy()])
        } else if crossover(&slow, &fast) || close < trend {
            Ok(vec![OrderIntent::sell()])
        } else {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::bars_from_closes;
    use crate::domain::{OrderSide, PriceSeries};
    use crate::engine::broker::Broker;
    use crate::indicators::IndicatorSet;

    fn decisions(closes: &[f64], params: EmaCrossParams) -> Vec<Vec<OrderSide>> {
        let series = PriceSeries::load(bars_from_closes(closes)).unwrap();
        let mut set = IndicatorSet::new();
        let mut strategy = EmaCrossMcGinley::new(params);
        strategy
            .initialize(&mut InitContext::new(&series, &mut set))
            .unwrap();
        let broker = Broker::new(10_000.0, 0.0, true);
        (0..series.len())
            .map(|i| {
                let ctx = BarContext::new(i, &series, &set, &broker);
                strategy
                    .on_bar(&ctx)
                    .unwrap()
                    .into_iter()
                    .map(|intent| intent.side)
                    .collect()
            })
            .collect()
    }

    fn small() -> EmaCrossParams {
        EmaCrossParams {
            fast_period: 2,
            slow_period: 4,
            trend_period: 2,
        }
    }

    #[test]
    fn defaults_match_reference_periods() {
        let p = EmaCrossParams::default();
        assert_eq!((p.fast_period, p.slow_period, p.trend_period), (51, 101, 21));
    }

    #[test]
    fn rally_after_decline_triggers_buy() {
        let closes = [100.0, 98.0, 96.0, 94.0, 92.0, 90.0, 95.0, 101.0, 108.0, 116.0];
        let out = decisions(&closes, small());
        // Fast crosses above slow on bar 6 while the close is above the trend line.
        assert!(out[..6].iter().all(|d| !d.contains(&OrderSide::Buy)));
        assert_eq!(out[6], vec![OrderSide::Buy]);
        assert!(out[7].is_empty());
    }

    #[test]
    fn bearish_crossover_triggers_sell() {
        let closes = [100.0, 102.0, 104.0, 106.0, 108.0, 100.0];
        let out = decisions(&closes, small());
        assert!(out[3].is_empty());
        assert!(out[4].is_empty());
        assert_eq!(out[5], vec![OrderSide::Sell]);
    }

    #[test]
    fn warmup_bars_produce_no_intents() {
        let closes = [100.0, 101.0, 99.0];
        let out = decisions(&closes, small());
        // Slow EMA(4) is undefined for the whole series.
        assert!(out.iter().all(|d| d.is_empty()));
    }

    #[test]
    fn zero_period_fails_initialize() {
        let series = PriceSeries::load(bars_from_closes(&[1.0, 2.0])).unwrap();
        let mut set = IndicatorSet::new();
        let mut strategy = EmaCrossMcGinley::new(EmaCrossParams {
            fast_period: 0,
            ..EmaCrossParams::default()
        });
        assert!(strategy
            .initialize(&mut InitContext::new(&series, &mut set))
            .is_err());
    }
}
