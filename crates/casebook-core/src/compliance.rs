use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
    Checking,
}

impl CheckStatus {
    /// Contribution of a check to the compliance score
    pub fn weight(&self) -> f64 {
        match self {
            CheckStatus::Pass => 1.0,
            CheckStatus::Warning => 0.5,
            CheckStatus::Fail | CheckStatus::Checking => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warning => "warning",
            CheckStatus::Fail => "fail",
            CheckStatus::Checking => "checking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub id: String,
    pub name: String,
    pub category: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceRating {
    Good,
    NeedsAttention,
    Critical,
}

impl ComplianceRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => ComplianceRating::Good,
            50..=79 => ComplianceRating::NeedsAttention,
            _ => ComplianceRating::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub case_id: String,
    pub checks: Vec<ComplianceCheck>,
    pub score: u8,
    pub rating: ComplianceRating,
    pub generated_at: i64,
}

impl ComplianceReport {
    pub fn new(case_id: &str, checks: Vec<ComplianceCheck>) -> Self {
        let score = score(&checks);
        Self {
            case_id: case_id.to_string(),
            checks,
            score,
            rating: ComplianceRating::from_score(score),
            generated_at: crate::now_millis(),
        }
    }
}

/// Average status weight as a percentage, rounded to the nearest integer. No checks scores 0.
pub fn score(checks: &[ComplianceCheck]) -> u8 {
    if checks.is_empty() {
        return 0;
    }
    let total: f64 = checks.iter().map(|c| c.status.weight()).sum();
    (total * 100.0 / checks.len() as f64).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(statuses: &[CheckStatus]) -> Vec<ComplianceCheck> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| ComplianceCheck {
                id: format!("check-{}", i),
                name: format!("Check {}", i),
                category: "General".to_string(),
                status: *s,
                details: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_score_weights() {
        use CheckStatus::*;
        assert_eq!(score(&checks(&[Pass, Pass])), 100);
        assert_eq!(score(&checks(&[Pass, Warning])), 75);
        assert_eq!(score(&checks(&[Pass, Warning, Fail])), 50);
        assert_eq!(score(&checks(&[Pass, Fail, Checking])), 33);
        assert_eq!(score(&checks(&[Pass, Pass, Warning])), 83);
        assert_eq!(score(&checks(&[Fail, Checking])), 0);
    }

    #[test]
    fn test_score_rounds_half_up() {
        use CheckStatus::*;
        // 0.5 / 8 = 6.25%, 1.0 / 8 = 12.5% -> 13
        assert_eq!(score(&checks(&[Warning, Warning, Fail, Fail, Fail, Fail, Fail, Fail])), 13);
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(score(&[]), 0);
        let report = ComplianceReport::new("case-1", Vec::new());
        assert_eq!(report.rating, ComplianceRating::Critical);
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(ComplianceRating::from_score(100), ComplianceRating::Good);
        assert_eq!(ComplianceRating::from_score(80), ComplianceRating::Good);
        assert_eq!(ComplianceRating::from_score(79), ComplianceRating::NeedsAttention);
        assert_eq!(ComplianceRating::from_score(50), ComplianceRating::NeedsAttention);
        assert_eq!(ComplianceRating::from_score(49), ComplianceRating::Critical);
    }
}
