//! Explanation types: factor and confidence analyses, narratives,
//! counterfactuals, and visual-element descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{DecisionId, ExplanationId};

/// Who the explanation is written for. Tone and jargon level vary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceType {
    Technical,
    #[default]
    Business,
    Executive,
    Regulatory,
    Customer,
}

impl AudienceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudienceType::Technical => "technical",
            AudienceType::Business => "business",
            AudienceType::Executive => "executive",
            AudienceType::Regulatory => "regulatory",
            AudienceType::Customer => "customer",
        }
    }
}

/// Requested explanation depth, 1 (one sentence) through 5 (comprehensive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetailLevel(u8);

impl DetailLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Clamps into the valid range rather than rejecting.
    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Factor retention cap scales with requested depth.
    pub fn max_factors(&self) -> usize {
        3 * self.0 as usize
    }
}

impl Default for DetailLevel {
    fn default() -> Self {
        Self(3)
    }
}

/// Output representation of the explanation narrative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationFormat {
    #[default]
    Text,
    Structured,
}

/// Cache/storage key for a generated explanation.
///
/// Two requests with the same key must receive the same explanation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExplanationKey {
    pub decision_id: DecisionId,
    pub audience: AudienceType,
    pub include_counterfactuals: bool,
    pub detail_level: DetailLevel,
    pub format: ExplanationFormat,
}

/// Whether a factor came from reasoning evidence or was synthesized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSource {
    /// Extracted from the decision's recorded reasoning.
    Evidence,
    /// Inferred from decision type, action, and context when extraction
    /// produced nothing. Callers must be able to tell the difference.
    Synthetic,
}

/// Direction a factor pushed the decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorDirection {
    Positive,
    Negative,
}

/// One weighted, directional factor behind a decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionFactor {
    pub name: String,
    /// Normalized importance in (0, 1]; the top factor is always 1.0.
    pub importance: f64,
    pub direction: FactorDirection,
    #[serde(default)]
    pub description: String,
}

/// Weighted factor breakdown for a decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorAnalysis {
    /// Sorted by importance, descending. Capped at `3 x detail_level`.
    pub factors: Vec<DecisionFactor>,
    pub source: FactorSource,
}

/// Discrete interpretation of a confidence value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            ConfidenceBand::VeryHigh
        } else if confidence >= 0.75 {
            ConfidenceBand::High
        } else if confidence >= 0.6 {
            ConfidenceBand::Moderate
        } else if confidence >= 0.4 {
            ConfidenceBand::Low
        } else {
            ConfidenceBand::VeryLow
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBand::VeryHigh => "Very High",
            ConfidenceBand::High => "High",
            ConfidenceBand::Moderate => "Moderate",
            ConfidenceBand::Low => "Low",
            ConfidenceBand::VeryLow => "Very Low",
        }
    }
}

/// Confidence decomposition across recommendation sources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAnalysis {
    /// The committed decision's confidence.
    pub base: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub std_deviation: f64,
    /// `1 - std_deviation`: how closely the sources agreed.
    pub consensus: f64,
    pub interpretation: ConfidenceBand,
}

/// Whether the narrative came from the text service or a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    Generated,
    /// Deterministic templated text used when generation failed.
    Fallback,
}

/// One counterfactual: what would have flipped the decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Counterfactual {
    pub alternative_action: String,
    pub required_changes: Vec<String>,
    pub description: String,
}

/// Counterfactual breakdown over alternative actions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualAnalysis {
    pub scenarios: Vec<Counterfactual>,
}

/// Kind of structured visual descriptor attached to an explanation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualElementKind {
    FactorChart,
    ConfidenceGauge,
    DecisionTree,
}

/// Structured data for a renderer; never rendered graphics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualElement {
    pub kind: VisualElementKind,
    pub title: String,
    pub data: Value,
}

/// A generated, audience-tailored account of why a decision was made.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Explanation {
    pub id: ExplanationId,
    pub decision_id: DecisionId,
    pub audience: AudienceType,
    pub detail_level: DetailLevel,
    pub factor_analysis: FactorAnalysis,
    pub confidence_analysis: ConfidenceAnalysis,
    pub text: String,
    pub text_source: NarrativeSource,
    #[serde(default)]
    pub counterfactuals: Option<CounterfactualAnalysis>,
    pub visuals: Vec<VisualElement>,
    pub generated_at: DateTime<Utc>,
}
