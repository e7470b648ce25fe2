//! Per-outcome achievement progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Projection;
use crate::statement::vocabulary::extensions;
use crate::statement::{LearningOutcome, Statement};

/// Latest achievement on one outcome. Defaults to a zero score with no
/// timestamp or evidence when nothing has been achieved yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProgress {
    pub score: f64,
    pub timestamp: Option<DateTime<Utc>>,
    pub evidence: Option<String>,
}

impl OutcomeProgress {
    pub fn is_achieved(&self) -> bool {
        self.timestamp.is_some()
    }
}

/// Progress on every outcome, keyed in outcome enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressReport {
    outcomes: BTreeMap<LearningOutcome, OutcomeProgress>,
}

impl ProgressReport {
    pub fn get(&self, outcome: LearningOutcome) -> OutcomeProgress {
        self.outcomes.get(&outcome).cloned().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LearningOutcome, &OutcomeProgress)> {
        self.outcomes.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl FromIterator<(LearningOutcome, OutcomeProgress)> for ProgressReport {
    fn from_iter<I: IntoIterator<Item = (LearningOutcome, OutcomeProgress)>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

/// Keeps the newest statement it is shown.
///
/// Callers feed it the achievements of a single outcome.
#[derive(Debug, Default)]
pub struct AchievementProjection {
    latest: Option<Statement>,
    folded: usize,
}

impl Projection for AchievementProjection {
    type Output = OutcomeProgress;
    const NAME: &'static str = "progress";

    fn apply(&mut self, statement: &Statement) {
        self.folded += 1;
        let newer = match &self.latest {
            Some(current) => statement.is_newer_than(current),
            None => true,
        };
        if newer {
            self.latest = Some(statement.clone());
        }
    }

    fn folded(&self) -> usize {
        self.folded
    }

    fn finish(self) -> OutcomeProgress {
        let Some(latest) = self.latest else {
            return OutcomeProgress::default();
        };
        OutcomeProgress {
            score: latest.score_raw().unwrap_or(0.0),
            timestamp: Some(latest.timestamp),
            evidence: latest
                .result_extension(extensions::EVIDENCE)
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }
}

/// Progress from one outcome's achievement statements.
pub fn latest_achievement(statements: &[Statement]) -> OutcomeProgress {
    super::fold::<AchievementProjection>(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::{Learner, StatementBuilder};
    use chrono::TimeZone;

    #[test]
    fn test_no_achievements_is_default() {
        let progress = latest_achievement(&[]);
        assert_eq!(progress, OutcomeProgress::default());
        assert_eq!(progress.score, 0.0);
        assert!(!progress.is_achieved());
    }

    #[test]
    fn test_latest_achievement_wins_regardless_of_order() {
        let b = StatementBuilder::default();
        let l = Learner::new("learner-3", "Sam", "student");
        let mut early = b.build_achievement_event(&l, "design-refine-prompts", 90.0, "first");
        early.timestamp = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut late = b.build_achievement_event(&l, "design-refine-prompts", 60.0, "second");
        late.timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let progress = latest_achievement(&[late.clone(), early.clone()]);
        assert_eq!(progress.score, 60.0);
        assert_eq!(progress.evidence.as_deref(), Some("second"));
        assert_eq!(latest_achievement(&[early, late]), progress);
    }

    #[test]
    fn test_report_lookup_defaults_missing_outcomes() {
        let report: ProgressReport = [(
            LearningOutcome::ApplyEthicalGuidelines,
            OutcomeProgress {
                score: 75.0,
                timestamp: None,
                evidence: None,
            },
        )]
        .into_iter()
        .collect();
        assert_eq!(report.get(LearningOutcome::ApplyEthicalGuidelines).score, 75.0);
        assert_eq!(report.get(LearningOutcome::UseExplainEvaluate), OutcomeProgress::default());
    }

    #[test]
    fn test_report_serializes_slug_keys() {
        let report: ProgressReport = LearningOutcome::ALL
            .into_iter()
            .map(|o| (o, OutcomeProgress::default()))
            .collect();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["critically-assess-output"]["score"], 0.0);
        assert_eq!(report.iter().next().map(|(o, _)| o), Some(LearningOutcome::UseExplainEvaluate));
    }
}
