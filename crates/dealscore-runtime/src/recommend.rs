//! Recommendation synthesis from an analysis.
//!
//! One recommendation per flag, severity mapped to priority, with curated
//! action text for the codes agents see most. Score-band globals are
//! appended, then everything is sorted by priority with insertion order
//! preserved inside a band.

use dealscore_core::{Recommendation, RecommendationPriority, RiskAnalysis, RiskFlag};

/// Curated action text for well-known flag codes.
fn curated_action(flag: &RiskFlag) -> Option<&'static str> {
    let action = match flag.code.as_str() {
        "DISCLOSURE_MISSING" => "Request all required disclosure documents from the seller.",
        "DISCLOSURE_SET_INCOMPLETE" => {
            "Collect the outstanding disclosures before contingency removal."
        }
        "FIN_CONTINGENCY_MISSING" => {
            "Add a financing contingency before any contingency removal deadline."
        }
        "FIN_CONTINGENCY_WAIVED" => {
            "Confirm the buyer understands the risk of waiving the financing contingency."
        }
        "INSP_CONTINGENCY_MISSING" => {
            "Add an inspection contingency covering standard inspections."
        }
        "INSP_CONTINGENCY_WAIVED" => {
            "Confirm the buyer understands the risk of waiving inspections."
        }
        "APPRAISAL_MISSING" => "Add an appraisal contingency for this financed purchase.",
        "EMD_AMOUNT_TOO_LOW" => {
            "Negotiate an earnest money deposit within the typical 1-3% range."
        }
        "EMD_REFUND_NON_REFUNDABLE" => {
            "Push back on the non-refundable deposit terms before signing."
        }
        "ESCROW_NO_ESCROW_HOLDER" => {
            "Route the earnest money through a neutral escrow or title company."
        }
        "ESCROW_RISKY_ESCROW" => {
            "Move the deposit to a neutral escrow holder immediately."
        }
        "PRE_APPROVAL_NO_PREAPPROVAL" => {
            "Obtain and attach a lender pre-approval letter."
        }
        "UNSUPPORTED_STATE" => {
            "Confirm state-specific requirements with local counsel."
        }
        _ => return None,
    };
    Some(action)
}

/// Build the recommendation list for an analysis.
pub fn recommendations_for(analysis: &RiskAnalysis) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = analysis
        .score
        .flags
        .iter()
        .map(|flag| Recommendation {
            priority: RecommendationPriority::from_severity(flag.severity),
            action: curated_action(flag)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Review and address: {}", flag.description)),
            flag_code: Some(flag.code.clone()),
        })
        .collect();

    let score = analysis.score.score;
    if score < 40 {
        recommendations.push(Recommendation {
            priority: RecommendationPriority::Immediate,
            action: "Have a real-estate attorney review this contract before proceeding."
                .to_string(),
            flag_code: None,
        });
    } else if score < 60 {
        recommendations.push(Recommendation {
            priority: RecommendationPriority::Soon,
            action: "Negotiate or address the flagged terms before removing contingencies."
                .to_string(),
            flag_code: None,
        });
    }

    // Stable: ties keep insertion order.
    recommendations.sort_by_key(|r| r.priority);
    recommendations
}
