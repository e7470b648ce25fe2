//! Verbs, activity types, extension keys and learning outcomes used by the
//! language-learning platform.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::model::{LanguageMap, Verb};
use crate::error::LearnlogError;

/// Default activity id prefix.
pub const DEFAULT_ACTIVITY_BASE: &str = "http://aiforl.edu/activities";

/// Homepage that scopes learner account names.
pub const ACCOUNT_HOME_PAGE: &str = "http://aiforl.edu";

/// Activity id of the platform itself.
pub const PLATFORM_ACTIVITY: &str = "http://aiforl.edu/platform";

pub const DEFAULT_PLATFORM_NAME: &str = "AI-Assisted Language Learning Platform";
pub const DEFAULT_CONTEXT_LANGUAGE: &str = "en-US";

/// Prompt descriptions keep at most this many characters.
pub const PROMPT_PREVIEW_CHARS: usize = 100;

pub const DEFAULT_PROMPT_TECHNIQUE: &str = "chain-of-thought";

pub mod activity_types {
    pub const LANGUAGE_PROJECT: &str = "http://aiforl.edu/activities/language-project";
    pub const AI_TOOL: &str = "http://aiforl.edu/activities/ai-tool";
    pub const PROMPT_ENGINEERING: &str = "http://aiforl.edu/activities/prompt-engineering";
    pub const LEARNING_OUTCOME: &str = "http://aiforl.edu/activities/learning-outcome";
    pub const APPLICATION: &str = "http://adlnet.gov/expapi/activities/application";
}

pub mod extensions {
    pub const STAGE: &str = "http://aiforl.edu/extensions/stage";
    pub const LANGUAGE: &str = "http://aiforl.edu/extensions/language";
    pub const PROJECT_ID: &str = "http://aiforl.edu/extensions/project-id";
    pub const TITLE: &str = "http://aiforl.edu/extensions/title";
    pub const THEME: &str = "http://aiforl.edu/extensions/theme";
    pub const GOALS: &str = "http://aiforl.edu/extensions/goals";
    pub const PURPOSE: &str = "http://aiforl.edu/extensions/purpose";
    pub const REFINEMENTS: &str = "http://aiforl.edu/extensions/refinements";
    pub const TECHNIQUE: &str = "http://aiforl.edu/extensions/technique";
    pub const EVIDENCE: &str = "http://aiforl.edu/extensions/evidence";
    pub const USER_ROLE: &str = "http://aiforl.edu/extensions/user-role";
    pub const PROJECT_STAGE: &str = "http://aiforl.edu/extensions/project-stage";
}

// =============================================================================
// Verbs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerbKind {
    Initialized,
    Progressed,
    Achieved,
    UsedAiTool,
    EngineeredPrompt,
}

impl VerbKind {
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Initialized => "http://adlnet.gov/expapi/verbs/initialized",
            Self::Progressed => "http://adlnet.gov/expapi/verbs/progressed",
            Self::Achieved => "http://adlnet.gov/expapi/verbs/achieved",
            Self::UsedAiTool => "http://aiforl.edu/verbs/used-ai-tool",
            Self::EngineeredPrompt => "http://aiforl.edu/verbs/engineered-prompt",
        }
    }

    fn labels(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Initialized => &[("en-US", "initialized")],
            Self::Progressed => &[("en-US", "progressed to")],
            Self::Achieved => &[("en-US", "achieved")],
            Self::UsedAiTool => &[("en-US", "used AI tool"), ("zh-CN", "使用AI工具")],
            Self::EngineeredPrompt => &[("en-US", "engineered prompt"), ("zh-CN", "设计提示词")],
        }
    }

    pub fn to_verb(&self) -> Verb {
        Verb {
            id: self.id().to_string(),
            display: self
                .labels()
                .iter()
                .map(|(locale, label)| (locale.to_string(), label.to_string()))
                .collect(),
        }
    }
}

// =============================================================================
// Project Stages
// =============================================================================

/// Stages a language project moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStage {
    Define,
    Collect,
    Create,
    Present,
}

impl ProjectStage {
    pub const ALL: [ProjectStage; 4] = [Self::Define, Self::Collect, Self::Create, Self::Present];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Define => "define",
            Self::Collect => "collect",
            Self::Create => "create",
            Self::Present => "present",
        }
    }
}

impl std::fmt::Display for ProjectStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStage {
    type Err = LearnlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| LearnlogError::invalid_input("stage", format!("Invalid stage: {}", s)))
    }
}

// =============================================================================
// Learning Outcomes
// =============================================================================

/// Intended learning outcomes tracked through "achieved" statements.
///
/// Declaration order is the enumeration order of progress reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningOutcome {
    UseExplainEvaluate,
    ApplyEthicalGuidelines,
    DesignRefinePrompts,
    CriticallyAssessOutput,
    IntegratePersonalizedLearning,
}

impl LearningOutcome {
    pub const ALL: [LearningOutcome; 5] = [
        Self::UseExplainEvaluate,
        Self::ApplyEthicalGuidelines,
        Self::DesignRefinePrompts,
        Self::CriticallyAssessOutput,
        Self::IntegratePersonalizedLearning,
    ];

    pub const fn slug(&self) -> &'static str {
        match self {
            Self::UseExplainEvaluate => "use-explain-evaluate",
            Self::ApplyEthicalGuidelines => "apply-ethical-guidelines",
            Self::DesignRefinePrompts => "design-refine-prompts",
            Self::CriticallyAssessOutput => "critically-assess-output",
            Self::IntegratePersonalizedLearning => "integrate-personalized-learning",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.slug() == slug)
    }

    /// Short title used as the activity name on achievement statements.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::UseExplainEvaluate => "Use, Explain and Evaluate AI Tools",
            Self::ApplyEthicalGuidelines => "Apply Ethical Guidelines",
            Self::DesignRefinePrompts => "Design and Refine Prompts",
            Self::CriticallyAssessOutput => "Critically Assess Output",
            Self::IntegratePersonalizedLearning => "Integrate Personalized Learning",
        }
    }

    pub fn name(&self) -> LanguageMap {
        let (en, zh) = match self {
            Self::UseExplainEvaluate => (
                "Use, Explain and Evaluate AI Tools",
                "使用、解释和评估AI工具",
            ),
            Self::ApplyEthicalGuidelines => (
                "Apply Ethical Guidelines in AI Use",
                "在AI使用中应用道德准则",
            ),
            Self::DesignRefinePrompts => (
                "Design and Refine Effective Prompts",
                "设计和优化有效提示词",
            ),
            Self::CriticallyAssessOutput => (
                "Critically Assess AI-Generated Output",
                "批判性评估AI生成的输出",
            ),
            Self::IntegratePersonalizedLearning => (
                "Integrate AI into Personalized Learning",
                "将AI整合到个性化学习中",
            ),
        };
        localized(en, zh)
    }

    pub fn description(&self) -> LanguageMap {
        let (en, zh) = match self {
            Self::UseExplainEvaluate => (
                "Use and describe AI tools for language production and assess their benefits and limitations",
                "使用和描述用于语言生产的AI工具，并评估其优势和局限性",
            ),
            Self::ApplyEthicalGuidelines => (
                "Demonstrate responsible AI use through academic integrity and data protection",
                "通过学术诚信和数据保护展示负责任的AI使用",
            ),
            Self::DesignRefinePrompts => (
                "Create and iteratively improve prompts for context-appropriate AI support",
                "创建并迭代改进提示词以获得适合语境的AI支持",
            ),
            Self::CriticallyAssessOutput => (
                "Analyze AI content for linguistic accuracy and cultural appropriateness",
                "分析AI内容的语言准确性和文化适当性",
            ),
            Self::IntegratePersonalizedLearning => (
                "Support self-directed learning with goal setting and progress monitoring",
                "通过目标设定和进度监控支持自主学习",
            ),
        };
        localized(en, zh)
    }
}

impl std::fmt::Display for LearningOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for LearningOutcome {
    type Err = LearnlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slug(s).ok_or_else(|| {
            LearnlogError::invalid_input("outcome", format!("Unknown learning outcome: {}", s))
        })
    }
}

fn localized(en: &str, zh: &str) -> LanguageMap {
    LanguageMap::from([
        ("en-US".to_string(), en.to_string()),
        ("zh-CN".to_string(), zh.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_parsing() {
        assert_eq!("collect".parse::<ProjectStage>().unwrap(), ProjectStage::Collect);
        let err = "publish".parse::<ProjectStage>().unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidInput);
    }

    #[test]
    fn test_outcome_slugs_roundtrip() {
        for outcome in LearningOutcome::ALL {
            assert_eq!(LearningOutcome::from_slug(outcome.slug()), Some(outcome));
        }
        assert!(LearningOutcome::from_slug("unknown").is_none());
    }

    #[test]
    fn test_outcome_order_is_declaration_order() {
        let mut sorted = LearningOutcome::ALL;
        sorted.sort();
        assert_eq!(sorted, LearningOutcome::ALL);
    }

    #[test]
    fn test_verb_display_labels() {
        let verb = VerbKind::UsedAiTool.to_verb();
        assert_eq!(verb.id, "http://aiforl.edu/verbs/used-ai-tool");
        assert_eq!(verb.display.get("zh-CN").map(String::as_str), Some("使用AI工具"));
        assert_eq!(VerbKind::Achieved.to_verb().display.len(), 1);
    }
}
