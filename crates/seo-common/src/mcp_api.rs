use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ingest::SkippedFile;
use crate::model::{BacklinkStrategy, BlogDraft, BusinessContext, CodeAnalysis, KeywordData};
use crate::report::{Dashboard, KeywordTable, RecommendationGroup, SortField, SortOrder};
use crate::state::View;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnalyzeUrlParams {
    /// Website URL to audit, e.g. "https://example.com".
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnalyzeFolderParams {
    /// Local path of the website source folder to upload.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnalyzeCodeParams {
    /// Source to audit. Defaults to the most recently uploaded code.
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SortKeywordsParams {
    /// Column to sort by; repeating the active column flips the order.
    pub field: SortField,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ResearchKeywordsParams {
    /// Seed keyword to expand into related suggestions.
    pub seed: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreatePostParams {
    /// Keyword to hand over to the blog view as a topic.
    pub keyword: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateBlogParams {
    /// Topic to write about. Defaults to the pending topic handed over from the keyword view.
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FixCodeParams {
    /// Code to fix. Defaults to the most recently uploaded code.
    pub code: Option<String>,
    /// Audit issues to address. Defaults to general SEO/AEO improvements.
    pub issues: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetViewParams {
    pub view: View,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BusinessContextResponse {
    pub business: BusinessContext,
    pub valid: bool,
    pub missing_fields: Vec<String>,
}

impl BusinessContextResponse {
    pub fn from_context(business: &BusinessContext) -> Self {
        Self {
            business: business.clone(),
            valid: business.is_valid(),
            missing_fields: business
                .missing_fields()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FolderAuditResponse {
    pub files_included: usize,
    pub truncated: bool,
    pub skipped: Vec<SkippedFile>,
    pub dashboard: Dashboard,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReportResponse {
    pub groups: Vec<RecommendationGroup>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct KeywordTableResponse {
    pub sort_field: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    pub keywords: Vec<KeywordData>,
}

impl KeywordTableResponse {
    pub fn from_table(table: &KeywordTable) -> Self {
        let (sort_field, sort_order) = match table.sort_state() {
            Some((field, order)) => (Some(field), Some(order)),
            None => (None, None),
        };
        Self {
            sort_field,
            sort_order,
            keywords: table.rows(),
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BacklinksResponse {
    pub backlinks: Vec<BacklinkStrategy>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BlogView {
    pub ideas: Vec<String>,
    pub context: String,
    pub pending_topic: Option<String>,
    pub draft: Option<BlogDraft>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CodeView {
    pub original: Option<String>,
    pub analysis: Option<CodeAnalysis>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ViewResponse {
    pub active_view: View,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct OkResponse {
    pub ok: bool,
}
