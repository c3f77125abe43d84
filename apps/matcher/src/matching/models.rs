//! Data model for the matching engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_EMAIL: &str = "unknown@example.com";
/// Sentinel used wherever a list or phrase would otherwise be empty.
pub const NONE_SENTINEL: &str = "None";

pub const MAX_KEY_MATCHES: usize = 5;
pub const MAX_MISSING_REQUIREMENTS: usize = 5;
pub const MAX_SOFT_SKILLS: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Structured CV
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub role: String,
    pub company: String,
    pub years: u32,
}

/// Fields extracted from a CV. Every field always has a value; the canonical empty
/// record (`StructuredCv::default()`) stands in when extraction fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCv {
    pub name: String,
    pub email: String,
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub experience: Vec<Experience>,
    pub education: String,
}

impl Default for StructuredCv {
    fn default() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            email: UNKNOWN_EMAIL.to_string(),
            technical_skills: vec![],
            soft_skills: vec![],
            experience: vec![],
            education: String::new(),
        }
    }
}

const CV_KEYS: [&str; 6] = [
    "name",
    "email",
    "technical_skills",
    "soft_skills",
    "experience",
    "education",
];

impl StructuredCv {
    /// Builds a record from a model-produced JSON object, coercing field types.
    ///
    /// Returns `None` when the object carries none of the expected keys.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if !CV_KEYS.iter().any(|k| obj.contains_key(*k)) {
            return None;
        }
        let defaults = Self::default();

        Some(Self {
            name: non_blank_string(obj.get("name")).unwrap_or(defaults.name),
            email: non_blank_string(obj.get("email")).unwrap_or(defaults.email),
            technical_skills: string_list(obj.get("technical_skills")),
            soft_skills: string_list(obj.get("soft_skills")),
            experience: obj
                .get("experience")
                .map(experience_list)
                .unwrap_or_default(),
            education: non_blank_string(obj.get("education")).unwrap_or_default(),
        })
    }
}

fn experience_list(value: &Value) -> Vec<Experience> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => std::slice::from_ref(value),
        _ => return vec![],
    };

    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            Some(Experience {
                role: non_blank_string(obj.get("role")).unwrap_or_default(),
                company: non_blank_string(obj.get("company")).unwrap_or_default(),
                years: obj.get("years").and_then(whole_years).unwrap_or(0),
            })
        })
        .filter(|e| !(e.role.is_empty() && e.company.is_empty()))
        .collect()
}

/// Years as a non-negative integer. Accepts integers, floats and strings like "3" or "2.5 years".
fn whole_years(value: &Value) -> Option<u32> {
    let years = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s
            .split_whitespace()
            .next()?
            .trim_end_matches('+')
            .parse::<f64>()
            .ok()?,
        _ => return None,
    };
    if !years.is_finite() {
        return None;
    }
    Some(years.max(0.0).floor().min(u32::MAX as f64) as u32)
}

// ────────────────────────────────────────────────────────────────────────────
// Score result
// ────────────────────────────────────────────────────────────────────────────

/// Rubric score and explanation for one CV against one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Always within 0..=100.
    pub relevance_score: u8,
    pub justification: String,
    /// Never empty; `["None"]` when nothing matched.
    pub key_matches: Vec<String>,
    pub missing_requirements: Vec<String>,
    pub soft_skills: Vec<String>,
    pub domain_fit: String,
}

impl ScoreResult {
    /// Fixed record returned whenever scoring cannot produce a real answer.
    pub fn failed() -> Self {
        Self {
            relevance_score: 0,
            justification: "Analysis failed".to_string(),
            key_matches: vec![NONE_SENTINEL.to_string()],
            missing_requirements: vec![],
            soft_skills: vec![],
            domain_fit: NONE_SENTINEL.to_string(),
        }
    }

    /// Coerces a model-produced JSON object into a score.
    ///
    /// `relevance_score` must be numeric (or a numeric string) and `justification`
    /// must be present; otherwise `None`. Lists are coerced and capped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let relevance_score = obj.get("relevance_score").and_then(score_0_to_100)?;
        let justification = non_blank_string(obj.get("justification"))?;

        let mut key_matches = string_list(obj.get("key_matches"));
        key_matches.retain(|m| !m.eq_ignore_ascii_case(NONE_SENTINEL));
        key_matches.truncate(MAX_KEY_MATCHES);
        if key_matches.is_empty() {
            key_matches.push(NONE_SENTINEL.to_string());
        }

        let mut missing_requirements = string_list(obj.get("missing_requirements"));
        missing_requirements.truncate(MAX_MISSING_REQUIREMENTS);

        let mut soft_skills = string_list(obj.get("soft_skills"));
        soft_skills.truncate(MAX_SOFT_SKILLS);

        Some(Self {
            relevance_score,
            justification,
            key_matches,
            missing_requirements,
            soft_skills,
            domain_fit: non_blank_string(obj.get("domain_fit"))
                .unwrap_or_else(|| NONE_SENTINEL.to_string()),
        })
    }
}

/// Accepts 87, 87.4, "87", "87/100" or "87%"; rounds and clamps to 0..=100.
fn score_0_to_100(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .split('/')
            .next()?
            .trim()
            .parse::<f64>()
            .ok()?,
        Value::Array(items) if items.len() == 1 => return score_0_to_100(&items[0]),
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient field coercion shared by both records
// ────────────────────────────────────────────────────────────────────────────

fn non_blank_string(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// A list of non-blank strings. A bare scalar becomes a one-element list.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| non_blank_string(Some(item)))
            .collect(),
        Some(other) => non_blank_string(Some(other)).into_iter().collect(),
        None => vec![],
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request-scoped weights
// ────────────────────────────────────────────────────────────────────────────

/// Weights fusing embedding similarity with rubric relevance into `combined_score`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub similarity: f32,
    pub relevance: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            similarity: 0.4,
            relevance: 0.6,
        }
    }
}

/// Emphasis between technical and soft skills inside the rubric prompt.
/// Independent of `FusionWeights`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RubricWeights {
    pub technical: f32,
    pub soft: f32,
}

impl Default for RubricWeights {
    fn default() -> Self {
        Self {
            technical: 0.7,
            soft: 0.3,
        }
    }
}

impl RubricWeights {
    /// Technical and soft shares as whole percentages summing to 100.
    pub fn percentages(&self) -> (u32, u32) {
        let total = self.technical + self.soft;
        if total <= 0.0 {
            return Self::default().percentages();
        }
        let technical = ((self.technical / total) * 100.0).round() as u32;
        (technical, 100 - technical)
    }
}

/// Checks that a weight is usable: finite and non-negative.
pub fn check_weight(name: &str, value: f32) -> Result<f32, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{name} must be a non-negative number (got {value})"));
    }
    Ok(value)
}

// ────────────────────────────────────────────────────────────────────────────
// Per-request and per-CV state
// ────────────────────────────────────────────────────────────────────────────

/// The job side of a match request. The embedding is computed once per request.
#[derive(Debug, Clone)]
pub struct JobQuery {
    pub title: String,
    pub description: String,
    pub embedding: Vec<f32>,
    pub top_n: usize,
    pub fusion: FusionWeights,
    pub rubric: RubricWeights,
}

/// A CV that made it through extraction, parsing and embedding.
#[derive(Debug, Clone)]
pub struct CvDocument {
    /// Position in the request's `cv_paths`; the ranking tie-breaker.
    pub index: usize,
    pub path: String,
    pub id: String,
    pub text: String,
    pub structured: StructuredCv,
    pub embedding: Vec<f32>,
    pub similarity: f32,
}

/// Where a CV is in the pipeline. A failure records the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvStage {
    Queued,
    Extracting,
    Parsing,
    Embedding,
    Scoring,
    Ranked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ExtractionFailed,
    EmptyDocument,
    SimilarityUndefined,
    UpstreamUnavailable,
}

/// Diagnostic for a CV excluded from ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvFailure {
    pub cv_path: String,
    pub stage: CvStage,
    pub kind: FailureKind,
    pub message: String,
}

/// One ranked candidate. Serialized flat: score fields sit beside the ranking fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub applicant: String,
    pub cv_id: String,
    pub cv_path: String,
    pub similarity: f32,
    pub combined_score: f32,
    #[serde(flatten)]
    pub score: ScoreResult,
}
