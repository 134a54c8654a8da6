// =============================================================================
// Bid Decision - Auditable record of every bid enhancement
// =============================================================================
//
// Captures the inputs (original bid, raw signals) and the outputs (multiplier,
// enhanced bid, go/no-go) together with the human-readable reasons, so that
// any bid the agent adjusted can be explained after the fact.
//
// `id` and `created_at` are the only fields that differ between two
// evaluations of identical inputs.
// =============================================================================

use serde::Serialize;

use crate::signals::SignalSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct BidDecision {
    /// Unique identifier for this decision (UUID v4).
    pub id: String,

    /// Impression this decision answers.
    pub impression_id: String,

    pub original_bid: f64,

    /// `original_bid * multiplier`, rounded to cents.
    pub enhanced_bid: f64,

    /// Product of every applied adjustment factor (1.0 if none applied).
    pub multiplier: f64,

    /// One entry per applied factor, in application order.
    pub reasons: Vec<String>,

    pub confidence: f64,

    /// False when the enhanced bid fell to or below the minimum bid floor.
    pub should_bid: bool,

    /// Raw signals the decision was computed from.
    pub signals: SignalSnapshot,

    /// ISO 8601 timestamp of when this decision was created.
    pub created_at: String,
}
