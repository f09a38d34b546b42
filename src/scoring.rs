//! Lead qualification policy.
//!
//! `qualified_score` is derived from the raw `lead_score` by clamping it onto
//! the 0-10 scale. Clamping is monotonic and leaves the tier thresholds where
//! they are, so tiering on the qualified score is the same as tiering on the
//! raw score:
//!
//! | qualified_score | status             | priority |
//! |-----------------|--------------------|----------|
//! | >= 8.0          | `qualified_high`   | high     |
//! | 5.0 ..< 8.0     | `qualified_medium` | medium   |
//! | < 5.0           | `qualified_low`    | low      |

use crate::errors::AppError;
use crate::models::{LeadStatus, Priority};
use regex::Regex;
use std::sync::OnceLock;

pub const HIGH_THRESHOLD: f64 = 8.0;
pub const MEDIUM_THRESHOLD: f64 = 5.0;
pub const MAX_QUALIFIED_SCORE: f64 = 10.0;

/// Normalizes a raw lead score onto the 0-10 qualification scale.
pub fn qualified_score(lead_score: f64) -> f64 {
    lead_score.clamp(0.0, MAX_QUALIFIED_SCORE)
}

/// Status tier for a qualified score.
pub fn tier_for(qualified_score: f64) -> LeadStatus {
    if qualified_score >= HIGH_THRESHOLD {
        LeadStatus::QualifiedHigh
    } else if qualified_score >= MEDIUM_THRESHOLD {
        LeadStatus::QualifiedMedium
    } else {
        LeadStatus::QualifiedLow
    }
}

/// Priority a lead must carry once it moves to `status`.
///
/// Qualified tiers fix the priority, terminal outreach states clear it, and
/// `new` keeps whatever the lead already had.
pub fn priority_for(status: LeadStatus, current: Option<Priority>) -> Option<Priority> {
    match status {
        LeadStatus::QualifiedHigh => Some(Priority::High),
        LeadStatus::QualifiedMedium => Some(Priority::Medium),
        LeadStatus::QualifiedLow => Some(Priority::Low),
        LeadStatus::Contacted | LeadStatus::Converted | LeadStatus::Rejected => None,
        LeadStatus::New => current,
    }
}

/// Rejects raw scores that are negative, NaN or infinite.
pub fn validate_lead_score(lead_score: f64) -> Result<f64, AppError> {
    if !lead_score.is_finite() || lead_score < 0.0 {
        return Err(AppError::Validation(format!(
            "lead_score must be a finite number >= 0, got {}",
            lead_score
        )));
    }
    Ok(lead_score)
}

/// Firmographic attributes used by [`heuristic_score`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Firmographics<'a> {
    pub industry: Option<&'a str>,
    pub size: Option<&'a str>,
    pub location: Option<&'a str>,
}

/// Provisional score for leads the AI scoring service has not seen yet.
///
/// Base 5, +2 for technology/marketing/consulting, +1 for a 10-50 headcount
/// band or +2 for 20-100, +1 for Johannesburg or Cape Town. Capped at 10.
pub fn heuristic_score(profile: &Firmographics<'_>) -> f64 {
    let mut score = 5.0;

    if let Some(industry) = profile.industry {
        let industry = industry.trim().to_lowercase();
        if matches!(industry.as_str(), "technology" | "marketing" | "consulting") {
            score += 2.0;
        }
    }

    match profile.size.map(str::trim) {
        Some("10-50") => score += 1.0,
        Some("20-100") => score += 2.0,
        _ => {}
    }

    if let Some(location) = profile.location {
        if matches!(location.trim(), "Johannesburg" | "Cape Town") {
            score += 1.0;
        }
    }

    f64::min(score, MAX_QUALIFIED_SCORE)
}

static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

/// Validate email address
///
/// Checks for:
/// - Basic email format (contains @ and .)
/// - Fake/placeholder patterns (repeated digits like 999999, 111111)
/// - Minimum length requirements
/// - Valid domain structure
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    let fake_patterns = ["999999", "111111", "000000", "123456789"];
    if let Some(pattern) = fake_patterns.iter().find(|p| email.contains(*p)) {
        tracing::warn!(email, pattern, "Rejected placeholder email");
        return false;
    }

    // RFC 5322 simplified: local@domain.tld
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .ok()
    });

    match regex {
        Some(re) => re.is_match(email),
        None => false,
    }
}
