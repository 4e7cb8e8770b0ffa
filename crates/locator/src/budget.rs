use crate::config::FaultlocConfig;
use crate::error::{BudgetExceeded, BudgetKind};
use faultloc_vector_store::TokenUsage;
use serde::Serialize;
use std::time::{Duration, Instant};

const REFINE_MIN_SECS: f64 = 60.0;
const REFINE_MIN_USD: f64 = 0.10;
const REASONING_MIN_SECS: f64 = 30.0;
const REASONING_MIN_USD: f64 = 0.05;

/// Per-instance time and spend ledger.
///
/// Optional stages consult the `allow_*` flags, which only ever go from
/// `true` to `false`.
#[derive(Debug)]
pub struct BudgetManager {
    time_limit: Duration,
    cost_limit_usd: f64,
    price_input_per_1k: f64,
    price_output_per_1k: f64,
    started_at: Instant,
    spent_usd: f64,
    allow_llm_refine: bool,
    allow_ast_reasoning: bool,
    allow_retrieval_expand: bool,
}

/// Serializable view of a [`BudgetManager`]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BudgetSnapshot {
    pub time_limit_secs: f64,
    pub cost_limit_usd: f64,
    pub spent_usd: f64,
    pub allow_llm_refine: bool,
    pub allow_ast_reasoning: bool,
    pub allow_retrieval_expand: bool,
    pub elapsed_secs: f64,
    pub remaining_time_secs: f64,
    pub remaining_cost_usd: f64,
}

impl BudgetManager {
    #[must_use]
    pub fn new(config: &FaultlocConfig) -> Self {
        Self::with_limits(
            Duration::from_secs(config.time_limit_secs),
            config.cost_limit_usd,
            config.price_input_per_1k,
            config.price_output_per_1k,
        )
    }

    #[must_use]
    pub fn with_limits(
        time_limit: Duration,
        cost_limit_usd: f64,
        price_input_per_1k: f64,
        price_output_per_1k: f64,
    ) -> Self {
        Self {
            time_limit,
            cost_limit_usd,
            price_input_per_1k,
            price_output_per_1k,
            started_at: Instant::now(),
            spent_usd: 0.0,
            allow_llm_refine: true,
            allow_ast_reasoning: true,
            allow_retrieval_expand: true,
        }
    }

    /// Backdate the start instant
    #[must_use]
    pub fn started_at(mut self, instant: Instant) -> Self {
        self.started_at = instant;
        self
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    #[must_use]
    pub fn remaining_time_secs(&self) -> f64 {
        (self.time_limit.as_secs_f64() - self.elapsed().as_secs_f64()).max(0.0)
    }

    #[must_use]
    pub fn remaining_cost_usd(&self) -> f64 {
        (self.cost_limit_usd - self.spent_usd).max(0.0)
    }

    #[must_use]
    pub const fn spent_usd(&self) -> f64 {
        self.spent_usd
    }

    #[must_use]
    pub const fn allow_llm_refine(&self) -> bool {
        self.allow_llm_refine
    }

    #[must_use]
    pub const fn allow_ast_reasoning(&self) -> bool {
        self.allow_ast_reasoning
    }

    #[must_use]
    pub const fn allow_retrieval_expand(&self) -> bool {
        self.allow_retrieval_expand
    }

    /// Charge one external call and re-evaluate the degradation flags.
    ///
    /// A missing usage record costs nothing, but the flags are still updated
    /// because elapsed time alone can cross a threshold.
    pub fn add_cost_from_usage(&mut self, usage: Option<&TokenUsage>) {
        if let Some(usage) = usage {
            self.spent_usd += (usage.input() as f64 / 1000.0) * self.price_input_per_1k
                + (usage.output() as f64 / 1000.0) * self.price_output_per_1k;
        }
        self.apply_degradation();
    }

    fn apply_degradation(&mut self) {
        let time_left = self.remaining_time_secs();
        let cost_left = self.remaining_cost_usd();

        if self.allow_llm_refine && (time_left < REFINE_MIN_SECS || cost_left < REFINE_MIN_USD) {
            log::info!(
                "Disabling LLM refinement ({time_left:.1}s, ${cost_left:.3} remaining)"
            );
            self.allow_llm_refine = false;
        }
        if (self.allow_ast_reasoning || self.allow_retrieval_expand)
            && (time_left < REASONING_MIN_SECS || cost_left < REASONING_MIN_USD)
        {
            log::info!(
                "Disabling AST reasoning and retrieval expansion ({time_left:.1}s, ${cost_left:.3} remaining)"
            );
            self.allow_ast_reasoning = false;
            self.allow_retrieval_expand = false;
        }
    }

    /// Fail if either hard limit has been crossed
    pub fn ensure_within_budget(&self) -> Result<(), BudgetExceeded> {
        let elapsed = self.elapsed();
        if elapsed > self.time_limit {
            return Err(BudgetExceeded {
                kind: BudgetKind::Time,
                used: elapsed.as_secs_f64(),
                limit: self.time_limit.as_secs_f64(),
            });
        }
        if self.spent_usd > self.cost_limit_usd {
            return Err(BudgetExceeded {
                kind: BudgetKind::Cost,
                used: self.spent_usd,
                limit: self.cost_limit_usd,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot {
            time_limit_secs: self.time_limit.as_secs_f64(),
            cost_limit_usd: self.cost_limit_usd,
            spent_usd: self.spent_usd,
            allow_llm_refine: self.allow_llm_refine,
            allow_ast_reasoning: self.allow_ast_reasoning,
            allow_retrieval_expand: self.allow_retrieval_expand,
            elapsed_secs: round_to(self.elapsed().as_secs_f64(), 3),
            remaining_time_secs: round_to(self.remaining_time_secs(), 3),
            remaining_cost_usd: round_to(self.remaining_cost_usd(), 6),
        }
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
