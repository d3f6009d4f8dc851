//! Risk scoring.

use shared_types::TransactionMessage;

/// Produces a risk score in `[0.0, 1.0]` for a transaction. Scoring is
/// pure and synchronous; anything that needs I/O belongs behind the
/// account directory instead.
pub trait RiskScorer: Send + Sync {
    fn score(&self, message: &TransactionMessage) -> f64;
}

/// Built-in heuristic scorer.
///
/// Signals, each contributing a fixed weight:
/// - large amounts relative to `high_amount` saturate toward 0.6
/// - suspiciously round amounts (whole thousands of minor units) add 0.2
/// - a missing merchant class adds 0.2
pub struct HeuristicScorer {
    /// Amount at which the amount signal alone reaches its maximum.
    pub high_amount: u64,
}

impl HeuristicScorer {
    #[must_use]
    pub fn new(high_amount: u64) -> Self {
        Self { high_amount }
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        // 10_000.00 in minor units.
        Self::new(1_000_000)
    }
}

impl RiskScorer for HeuristicScorer {
    fn score(&self, message: &TransactionMessage) -> f64 {
        let mut score = 0.0;
        if let Some(amount) = message.amount() {
            let ratio = amount as f64 / self.high_amount.max(1) as f64;
            score += 0.6 * ratio.min(1.0);
            if amount > 0 && amount % 100_000 == 0 {
                score += 0.2;
            }
        }
        if message.merchant_class().is_none() {
            score += 0.2;
        }
        score.min(1.0)
    }
}
