use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{AuditResult, BlogDraft, BusinessContext, CodeAnalysis};
use crate::prompts::DEFAULT_BLOG_CONTEXT;
use crate::report::KeywordTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Dashboard,
    Report,
    Keywords,
    Backlinks,
    Blogs,
    Code,
}

/// Everything the views observe. One instance per session; replaced piecewise by
/// completed requests, never merged.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub business: BusinessContext,
    pub url: Option<String>,
    pub result: Option<AuditResult>,
    pub active_view: View,
    pub uploaded_code: Option<String>,
    /// Topic picked in the keyword view, waiting for the blog view to consume it.
    pub pending_blog_topic: Option<String>,
    pub keyword_table: KeywordTable,
    pub blog: Option<BlogDraft>,
    pub code_fix: Option<CodeAnalysis>,
}

impl AppState {
    /// Install a fresh audit result and return to the dashboard.
    pub fn apply_audit(&mut self, result: AuditResult) {
        self.keyword_table = KeywordTable::new(result.keywords.clone());
        self.result = Some(result);
        self.active_view = View::Dashboard;
    }

    pub fn request_blog_topic(&mut self, topic: &str) {
        self.pending_blog_topic = Some(topic.trim().to_string());
        self.active_view = View::Blogs;
    }

    pub fn take_pending_topic(&mut self) -> Option<String> {
        self.pending_blog_topic.take()
    }

    pub fn blog_context(&self) -> String {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_BLOG_CONTEXT)
            .to_string()
    }

    /// Drop the current analysis. Business details are kept.
    pub fn reset(&mut self) {
        self.result = None;
        self.url = None;
        self.uploaded_code = None;
        self.active_view = View::Dashboard;
    }
}
