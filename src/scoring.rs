use crate::config::DetectionConfig;
use crate::model::{AccountType, PatternEvidence};

/// Weight applied to every non-primary base score when combining evidence.
const SUPPORTING_WEIGHT: f64 = 0.2;

/// Reconcile all recorded evidence for one account into its final
/// suspicion score and ordered pattern list.
///
/// The steps are ordered deliberately: combine, then temporal adjust, then
/// the classification cap, then the final clamp. The cap must stay the last
/// suppressive step so pattern evidence is never discarded before the
/// classification policy is applied.
pub fn finalize(
    evidence: &[PatternEvidence],
    account_type: AccountType,
    config: &DetectionConfig,
) -> (f64, Vec<String>) {
    if evidence.is_empty() {
        return (0.0, Vec::new());
    }

    // Combine: strongest pattern plus 20% of everything else.
    let primary = evidence
        .iter()
        .map(|e| e.base_score)
        .fold(f64::MIN, f64::max);
    let supporting: f64 = evidence.iter().map(|e| e.base_score).sum::<f64>() - primary;
    let combined = primary + SUPPORTING_WEIGHT * supporting;

    // Temporal adjust: the multiplier travels with the evidence that won the
    // max; when two patterns tie on base score the fastest tier wins.
    let multiplier = evidence
        .iter()
        .filter(|e| e.base_score == primary)
        .map(|e| e.temporal_multiplier)
        .fold(1.0, f64::max);
    let adjusted = combined * multiplier;

    // Classification cap, then the final clamp.
    let capped = match account_type {
        AccountType::Merchant => adjusted.min(config.merchant_score_cap),
        AccountType::Payroll => adjusted.min(config.payroll_score_cap),
        AccountType::Shell | AccountType::Normal => adjusted,
    };
    let final_score = (capped.clamp(0.0, 100.0) * 100.0).round() / 100.0;

    // Patterns listed strongest-first; ties keep detector recording order.
    let mut ordered: Vec<&PatternEvidence> = evidence.iter().collect();
    ordered.sort_by(|a, b| b.base_score.partial_cmp(&a.base_score).unwrap_or(std::cmp::Ordering::Equal));
    let patterns = ordered.into_iter().map(|e| e.label.clone()).collect();

    (final_score, patterns)
}
