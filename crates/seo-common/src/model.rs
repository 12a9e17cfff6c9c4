use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Business details the user fills in before any audit can run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BusinessContext {
    pub name: String,
    pub industry: String,
    pub location: String,
    /// Core services / keywords, free-form.
    pub keywords: String,
    /// Optional. Not used by any prompt.
    #[serde(default)]
    pub competitors: String,
}

impl BusinessContext {
    /// Name, industry, location and keywords must be non-blank.
    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("industry", &self.industry),
            ("location", &self.location),
            ("keywords", &self.keywords),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Url,
    Code,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeoScores {
    pub basic: u8,
    pub technical: u8,
    pub advanced: u8,
    pub aeo: u8,
    pub geo: u8,
}

impl SeoScores {
    pub const MAX: u8 = 100;

    /// Scores paired with their display labels, in chart order.
    pub fn labelled(&self) -> [(&'static str, u8); 5] {
        [
            ("Basic SEO", self.basic),
            ("Technical SEO", self.technical),
            ("Advanced SEO", self.advanced),
            ("AEO", self.aeo),
            ("GEO", self.geo),
        ]
    }

    pub fn out_of_range(&self) -> Option<(&'static str, u8)> {
        self.labelled()
            .into_iter()
            .find(|(_, score)| *score > Self::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Impact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Status {
    Pass,
    Fail,
    Warning,
}

impl Status {
    /// Display priority: failures first, passes last.
    pub fn priority(self) -> u8 {
        match self {
            Status::Fail => 0,
            Status::Warning => 1,
            Status::Pass => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    Basic,
    Technical,
    Advanced,
    #[serde(rename = "AEO")]
    Aeo,
    #[serde(rename = "GEO")]
    Geo,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Basic,
        Category::Technical,
        Category::Advanced,
        Category::Aeo,
        Category::Geo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Basic => "Basic",
            Category::Technical => "Technical",
            Category::Advanced => "Advanced",
            Category::Aeo => "AEO",
            Category::Geo => "GEO",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub impact: Impact,
    pub status: Status,
    pub category: Category,
    /// Concrete fix, usually with an example snippet.
    pub solution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Intent {
    Informational,
    Commercial,
    Transactional,
    Navigational,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Informational => "Informational",
            Intent::Commercial => "Commercial",
            Intent::Transactional => "Transactional",
            Intent::Navigational => "Navigational",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Difficulty {
    Hard,
    Medium,
    Easy,
}

impl Difficulty {
    pub fn weight(self) -> u8 {
        match self {
            Difficulty::Hard => 3,
            Difficulty::Medium => 2,
            Difficulty::Easy => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Volume {
    High,
    Medium,
    Low,
}

impl Volume {
    pub fn weight(self) -> u8 {
        match self {
            Volume::High => 3,
            Volume::Medium => 2,
            Volume::Low => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct KeywordData {
    pub keyword: String,
    pub intent: Intent,
    pub difficulty: Difficulty,
    pub volume: Volume,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BacklinkStrategy {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    /// Outreach example: pitch subject line or target site type.
    pub example: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub summary: String,
    pub scores: SeoScores,
    pub recommendations: Vec<Recommendation>,
    pub blog_ideas: Vec<String>,
    pub keywords: Vec<KeywordData>,
    pub backlinks: Vec<BacklinkStrategy>,
}

impl AuditResult {
    pub fn count_by_impact(&self, impact: Impact) -> usize {
        self.recommendations
            .iter()
            .filter(|r| r.impact == impact)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodeAnalysis {
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BlogDraft {
    pub topic: String,
    /// Markdown body as returned by the model.
    pub content: String,
}
