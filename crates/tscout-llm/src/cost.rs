//! Token usage and dollar-cost accounting.

use serde::{Deserialize, Serialize};

/// Token usage reported for one API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another call's usage into this one.
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_input_tokens += other.cache_creation_input_tokens;
        self.cache_read_input_tokens += other.cache_read_input_tokens;
    }
}

/// Dollar rates per million tokens for one model family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRates {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
    /// Cache reads are billed at 10% of the input rate.
    pub cache_read_per_mtok: f64,
}

impl ModelRates {
    const fn new(input: f64, output: f64) -> Self {
        Self {
            input_per_mtok: input,
            output_per_mtok: output,
            cache_read_per_mtok: input * 0.1,
        }
    }

    /// Dollar cost of one call at these rates.
    pub fn cost_of(&self, usage: &TokenUsage) -> f64 {
        usage.input_tokens as f64 / 1_000_000.0 * self.input_per_mtok
            + usage.output_tokens as f64 / 1_000_000.0 * self.output_per_mtok
            + usage.cache_read_input_tokens as f64 / 1_000_000.0 * self.cache_read_per_mtok
    }
}

/// Baseline Sonnet-class rates: $3/M input, $15/M output.
pub const BASELINE_RATES: ModelRates = ModelRates::new(3.0, 15.0);

/// Look up rates for a model id.
pub fn rates_for_model(model: &str) -> ModelRates {
    let model = model.to_ascii_lowercase();
    if model.contains("haiku") {
        ModelRates::new(0.8, 4.0)
    } else if model.contains("opus") {
        ModelRates::new(15.0, 75.0)
    } else {
        BASELINE_RATES
    }
}

/// Cost of one labelled unit of work (a segment, a chunk, a batch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentCost {
    pub label: String,
    pub usage: TokenUsage,
    pub cost: f64,
}

/// Aggregated cost report for a pipeline run.
///
/// `total_cost` is maintained as the running sum of the per-segment
/// costs, so the two always agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CostReport {
    pub usage: TokenUsage,
    pub total_cost: f64,
    pub segments: Vec<SegmentCost>,
}

impl CostReport {
    /// Record one call's usage under `label`, priced for `model`.
    pub fn record(&mut self, model: &str, label: impl Into<String>, usage: TokenUsage) {
        let cost = rates_for_model(model).cost_of(&usage);
        self.usage.add(&usage);
        self.total_cost += cost;
        self.segments.push(SegmentCost {
            label: label.into(),
            usage,
            cost,
        });
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: CostReport) {
        self.usage.add(&other.usage);
        self.total_cost += other.total_cost;
        self.segments.extend(other.segments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_pricing() {
        let usage = TokenUsage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
            cache_creation_input_tokens: 0,
            cache_read_input_tokens: 1_000_000,
        };
        let cost = BASELINE_RATES.cost_of(&usage);
        // $3 input + $15 output + $0.30 cached input
        assert!((cost - 18.3).abs() < 1e-9);
    }

    #[test]
    fn model_rate_lookup() {
        assert_eq!(rates_for_model("claude-sonnet-4-20250514"), BASELINE_RATES);
        assert!(rates_for_model("claude-3-5-haiku-latest").input_per_mtok < 1.0);
        assert!(rates_for_model("claude-opus-4").output_per_mtok > 15.0);
    }

    #[test]
    fn report_total_equals_segment_sum() {
        let mut report = CostReport::default();
        for i in 0..17 {
            report.record(
                "claude-sonnet-4",
                format!("segment-{i}"),
                TokenUsage {
                    input_tokens: 12_345 + i,
                    output_tokens: 6_789 + i * 3,
                    cache_creation_input_tokens: 0,
                    cache_read_input_tokens: 1_111 * i,
                },
            );
        }

        let sum: f64 = report.segments.iter().map(|s| s.cost).sum();
        assert!((report.total_cost - sum).abs() < 1e-9);
        assert_eq!(report.segments.len(), 17);
    }

    #[test]
    fn merge_accumulates() {
        let mut a = CostReport::default();
        a.record("claude-sonnet-4", "x", TokenUsage { input_tokens: 100, output_tokens: 10, ..Default::default() });
        let mut b = CostReport::default();
        b.record("claude-sonnet-4", "y", TokenUsage { input_tokens: 200, output_tokens: 20, ..Default::default() });

        let b_cost = b.total_cost;
        let a_cost = a.total_cost;
        a.merge(b);
        assert_eq!(a.segments.len(), 2);
        assert!((a.total_cost - (a_cost + b_cost)).abs() < 1e-12);
        assert_eq!(a.usage.input_tokens, 300);
    }
}
