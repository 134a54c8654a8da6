// =============================================================================
// Bid Engine - Multiplicative blend of intelligence signals
// =============================================================================
//
// Starts from a multiplier of 1.0 and applies at most one factor per
// available signal, always in this order:
//
//   fatigue        score > 7            => x0.7
//   incrementality marginal < 0.5       => x0.8
//                  marginal > 1.5       => x1.3
//   supply quality quality < 0.6        => x0.9
//   audience value cross-platform > 2.0 => x1.2
//
// Factors are independent of each other, so the order only affects floating
// point rounding of the product.  A missing signal contributes nothing.
//
//   enhanced_bid = round(base_bid * multiplier, 2)
//   should_bid   = enhanced_bid > base_bid * 0.5
//
// Thresholds and factors come from `BidRules` (config).
// =============================================================================

use crate::decision::BidDecision;
use crate::runtime_config::BidRules;
use crate::signals::SignalSnapshot;
use crate::types::ImpressionRequest;

/// One applied adjustment factor and its explanation.
#[derive(Debug, Clone, PartialEq)]
struct Adjustment {
    factor: f64,
    reason: String,
}

/// Stateless evaluator of the bid rule table.
#[derive(Debug, Clone, Default)]
pub struct BidEngine {
    rules: BidRules,
}

impl BidEngine {
    pub fn new(rules: BidRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &BidRules {
        &self.rules
    }

    /// Compute the bid decision for `request` from whatever signals are in
    /// `signals`.  Never fails.
    pub fn evaluate(&self, request: &ImpressionRequest, signals: SignalSnapshot) -> BidDecision {
        let adjustments = self.adjustments(&signals);

        let multiplier = adjustments.iter().fold(1.0, |acc, adj| acc * adj.factor);
        let enhanced_bid = round_cents(request.base_bid * multiplier);
        let should_bid = enhanced_bid > request.base_bid * self.rules.min_bid_ratio;

        BidDecision {
            id: uuid::Uuid::new_v4().to_string(),
            impression_id: request.impression_id.clone(),
            original_bid: request.base_bid,
            enhanced_bid,
            multiplier,
            reasons: adjustments.into_iter().map(|adj| adj.reason).collect(),
            confidence: self.rules.confidence,
            should_bid,
            signals,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn adjustments(&self, signals: &SignalSnapshot) -> Vec<Adjustment> {
        let r = &self.rules;
        let mut out = Vec::with_capacity(4);

        if let Some(f) = &signals.creative_fatigue {
            if f.fatigue_score > r.fatigue_threshold {
                out.push(Adjustment {
                    factor: r.fatigue_factor,
                    reason: format!("Creative fatigue high ({}/10)", f.fatigue_score),
                });
            }
        }

        if let Some(i) = &signals.incrementality {
            if i.marginal_value < r.low_incrementality_threshold {
                out.push(Adjustment {
                    factor: r.low_incrementality_factor,
                    reason: format!("Low incremental value ({})", i.marginal_value),
                });
            } else if i.marginal_value > r.high_incrementality_threshold {
                out.push(Adjustment {
                    factor: r.high_incrementality_factor,
                    reason: format!("High incremental value ({})", i.marginal_value),
                });
            }
        }

        if let Some(s) = &signals.supply_quality {
            if s.quality_score < r.low_supply_quality_threshold {
                out.push(Adjustment {
                    factor: r.low_supply_quality_factor,
                    reason: format!("Low supply quality ({})", s.quality_score),
                });
            }
        }

        if let Some(a) = &signals.audience_value {
            if a.cross_platform_value > r.high_audience_value_threshold {
                out.push(Adjustment {
                    factor: r.high_audience_value_factor,
                    reason: format!("High-value audience ({}x)", a.cross_platform_value),
                });
            }
        }

        out
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
