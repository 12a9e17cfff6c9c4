use std::cmp::Ordering;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{AuditResult, Category, Impact, KeywordData, Recommendation, SeoScores, Status};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct RecommendationGroup {
    pub category: Category,
    pub title: String,
    pub description: String,
    pub fail_count: usize,
    pub pass_count: usize,
    /// Fail, then Warning, then Pass; ties keep their input order.
    pub items: Vec<Recommendation>,
}

fn section_heading(category: Category) -> (&'static str, &'static str) {
    match category {
        Category::Basic => ("Basic SEO", "Titles, meta tags, headings and alt text"),
        Category::Technical => (
            "Technical SEO",
            "Speed, mobile, HTTPS, crawlability and Core Web Vitals",
        ),
        Category::Advanced => (
            "Advanced SEO",
            "E-E-A-T, content depth, topic clusters and internal linking",
        ),
        Category::Aeo => (
            "AEO (Answer Engine)",
            "Featured snippets, voice search and AI overviews",
        ),
        Category::Geo => (
            "GEO (Local SEO)",
            "Google Business Profile, local schema and NAP consistency",
        ),
    }
}

/// Partition by category in fixed display order, dropping empty buckets.
pub fn group_recommendations(recommendations: &[Recommendation]) -> Vec<RecommendationGroup> {
    Category::ALL
        .into_iter()
        .filter_map(|category| {
            let mut items: Vec<Recommendation> = recommendations
                .iter()
                .filter(|r| r.category == category)
                .cloned()
                .collect();
            if items.is_empty() {
                return None;
            }
            items.sort_by_key(|r| r.status.priority());

            let (title, description) = section_heading(category);
            Some(RecommendationGroup {
                category,
                title: title.to_string(),
                description: description.to_string(),
                fail_count: items.iter().filter(|r| r.status == Status::Fail).count(),
                pass_count: items.iter().filter(|r| r.status == Status::Pass).count(),
                items,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ScoreEntry {
    pub label: String,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Dashboard {
    pub summary: String,
    pub scores: Vec<ScoreEntry>,
    pub high_impact: usize,
    pub medium_impact: usize,
    pub report: Vec<RecommendationGroup>,
}

impl Dashboard {
    pub fn from_result(result: &AuditResult) -> Self {
        Self {
            summary: result.summary.clone(),
            scores: score_entries(&result.scores),
            high_impact: result.count_by_impact(Impact::High),
            medium_impact: result.count_by_impact(Impact::Medium),
            report: group_recommendations(&result.recommendations),
        }
    }
}

fn score_entries(scores: &SeoScores) -> Vec<ScoreEntry> {
    scores
        .labelled()
        .into_iter()
        .map(|(label, score)| ScoreEntry {
            label: label.to_string(),
            score,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Keyword,
    Intent,
    Difficulty,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

fn compare_by(field: SortField, a: &KeywordData, b: &KeywordData) -> Ordering {
    match field {
        SortField::Keyword => a.keyword.cmp(&b.keyword),
        SortField::Intent => a.intent.as_str().cmp(b.intent.as_str()),
        SortField::Difficulty => a.difficulty.weight().cmp(&b.difficulty.weight()),
        SortField::Volume => a.volume.weight().cmp(&b.volume.weight()),
    }
}

/// The keyword list plus its column-sort state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    keywords: Vec<KeywordData>,
    sort: Option<(SortField, SortOrder)>,
}

impl KeywordTable {
    pub fn new(keywords: Vec<KeywordData>) -> Self {
        Self {
            keywords,
            sort: None,
        }
    }

    /// Replace the whole list; the previous sort no longer applies.
    pub fn replace(&mut self, keywords: Vec<KeywordData>) {
        self.keywords = keywords;
        self.sort = None;
    }

    /// Same column flips the order, a new column starts ascending.
    pub fn toggle_sort(&mut self, field: SortField) {
        self.sort = match self.sort {
            Some((active, order)) if active == field => Some((field, order.flipped())),
            _ => Some((field, SortOrder::Asc)),
        };
    }

    pub fn sort_state(&self) -> Option<(SortField, SortOrder)> {
        self.sort
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Rows in display order. The stored list is left untouched.
    pub fn rows(&self) -> Vec<KeywordData> {
        let mut rows = self.keywords.clone();
        if let Some((field, order)) = self.sort {
            rows.sort_by(|a, b| {
                let ord = compare_by(field, a, b);
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }
        rows
    }
}
