//! Cost calculation.
//!
//! Every counter is priced independently: `cost.x = price.x / 1e6 * usage.x`.
//! Anthropic reports `input` net of cache reads and writes, so no subtraction
//! is needed here.

use vtx_core::messages::{Usage, UsageCost};
use vtx_core::models::{ModelCost, ModelInfo};

const PER_MILLION: f64 = 1_000_000.0;

/// Converts usage counters into a cost breakdown.
pub trait CostModel {
    /// Cost of `usage`.
    fn cost(&self, usage: &Usage) -> UsageCost;
}

impl CostModel for ModelCost {
    #[allow(clippy::cast_precision_loss)] // Token counts never approach 2^52
    fn cost(&self, usage: &Usage) -> UsageCost {
        let input = self.input / PER_MILLION * usage.input as f64;
        let output = self.output / PER_MILLION * usage.output as f64;
        let cache_read = self.cache_read / PER_MILLION * usage.cache_read as f64;
        let cache_write = self.cache_write / PER_MILLION * usage.cache_write as f64;
        UsageCost {
            input,
            output,
            cache_read,
            cache_write,
            total: input + output + cache_read + cache_write,
        }
    }
}

impl CostModel for ModelInfo {
    fn cost(&self, usage: &Usage) -> UsageCost {
        self.cost.cost(usage)
    }
}

/// Recompute `usage.cost` in place from `model`'s prices.
pub fn calculate_cost(model: &impl CostModel, usage: &mut Usage) {
    usage.cost = model.cost(usage);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vtx_core::models::claude_sonnet_4_5_vertex;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn usage(input: u64, output: u64, cache_read: u64, cache_write: u64) -> Usage {
        Usage {
            input,
            output,
            cache_read,
            cache_write,
            ..Usage::default()
        }
    }

    #[test]
    fn sonnet_cost_breakdown() {
        let model = claude_sonnet_4_5_vertex();
        let cost = model.cost(&usage(1_000_000, 100_000, 2_000_000, 400_000));
        assert!(approx(cost.input, 3.0));
        assert!(approx(cost.output, 1.5));
        assert!(approx(cost.cache_read, 0.6));
        assert!(approx(cost.cache_write, 1.5));
        assert!(approx(cost.total, 6.6));
    }

    #[test]
    fn zero_usage_is_free() {
        let cost = claude_sonnet_4_5_vertex().cost(&Usage::default());
        assert!(approx(cost.total, 0.0));
    }

    #[test]
    fn calculate_cost_writes_in_place() {
        let mut u = usage(10, 5, 0, 0);
        calculate_cost(&claude_sonnet_4_5_vertex(), &mut u);
        assert!(approx(u.cost.input, 0.00003));
        assert!(approx(u.cost.output, 0.000_075));
    }

    proptest! {
        #[test]
        fn total_is_sum_of_parts(
            input in 0u64..10_000_000,
            output in 0u64..1_000_000,
            cache_read in 0u64..10_000_000,
            cache_write in 0u64..10_000_000,
        ) {
            let cost = claude_sonnet_4_5_vertex().cost(&usage(input, output, cache_read, cache_write));
            let sum = cost.input + cost.output + cost.cache_read + cost.cache_write;
            prop_assert!((cost.total - sum).abs() < 1e-9);
            prop_assert!(cost.total >= 0.0);
        }
    }
}
