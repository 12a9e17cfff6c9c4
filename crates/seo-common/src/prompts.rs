/// Prompt text and output schemas for every generation call.
///
/// Schemas use the generative service's OpenAPI-subset dialect (upper-case `type` names).
use serde_json::{json, Value};

use crate::model::{AnalysisMode, BusinessContext};

/// Source code beyond this many characters is cut before it reaches the prompt.
pub const MAX_CODE_PROMPT_CHARS: usize = 50_000;
/// Blog context beyond this many characters is cut before it reaches the prompt.
pub const MAX_BLOG_CONTEXT_CHARS: usize = 500;
pub const KEYWORD_SUGGESTION_COUNT: usize = 10;

pub const DEFAULT_FIX_ISSUES: &str = "General SEO/AEO Improvements based on audit";
pub const DEFAULT_BLOG_CONTEXT: &str = "General Industry Context";

pub const SYSTEM_INSTRUCTION: &str = "\
You are an advanced SEO automation engine for businesses that cannot afford a monthly SEO \
agency. Act as a complete SEO expert.

Responsibilities:
1. SEO audit covering basic, technical, advanced, AEO and GEO optimisation.
2. Blog and content generation.
3. Keyword research and backlink strategy.
4. Code audit with optional code fixes.
5. Clear reporting.

Inputs may be a website URL, source code, or business details.

When asked for an audit, return valid JSON with: summary (short executive summary), scores \
(basic, technical, advanced, aeo, geo; integers 0-100), recommendations, blogIdeas, keywords \
(keyword, intent, difficulty, volume) and backlinks (type, description, example).
For blog generation, return Markdown. For code fixes, return the corrected code.

Knowledge base:
1. Basic SEO: titles, meta descriptions, H1-H6 hierarchy, alt text; speed, mobile, HTTPS, \
Core Web Vitals.
2. Advanced SEO: semantic intent, E-E-A-T, topic clusters, backlink strategy, advanced schema.
3. AEO: featured snippets, voice search, AI overviews. Pattern: question, then a precise \
40-60 word answer, then detail.
4. GEO: Google Business Profile, local keywords, local schema.";

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn string_enum(values: &[&str]) -> Value {
    json!({ "type": "STRING", "enum": values })
}

fn keyword_item_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "keyword": string(),
            "intent": string_enum(&["Informational", "Commercial", "Transactional", "Navigational"]),
            "difficulty": string_enum(&["Hard", "Medium", "Easy"]),
            "volume": string_enum(&["High", "Medium", "Low"]),
        },
        "required": ["keyword", "intent", "difficulty", "volume"],
    })
}

pub fn audit_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": string(),
            "scores": {
                "type": "OBJECT",
                "properties": {
                    "basic": { "type": "INTEGER" },
                    "technical": { "type": "INTEGER" },
                    "advanced": { "type": "INTEGER" },
                    "aeo": { "type": "INTEGER" },
                    "geo": { "type": "INTEGER" },
                },
                "required": ["basic", "technical", "advanced", "aeo", "geo"],
            },
            "recommendations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": string(),
                        "description": string(),
                        "impact": string_enum(&["High", "Medium", "Low"]),
                        "status": string_enum(&["Pass", "Fail", "Warning"]),
                        "category": string_enum(&["Basic", "Technical", "Advanced", "AEO", "GEO"]),
                        "solution": {
                            "type": "STRING",
                            "description": "Detailed fix with code example or specific action.",
                        },
                    },
                    "required": ["title", "description", "impact", "status", "category", "solution"],
                },
            },
            "blogIdeas": { "type": "ARRAY", "items": string() },
            "keywords": { "type": "ARRAY", "items": keyword_item_schema() },
            "backlinks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": string(),
                        "description": string(),
                        "example": string(),
                    },
                    "required": ["type", "description", "example"],
                },
            },
        },
        "required": ["summary", "scores", "recommendations", "blogIdeas", "keywords", "backlinks"],
    })
}

pub fn keyword_list_schema() -> Value {
    json!({ "type": "ARRAY", "items": keyword_item_schema() })
}

pub fn code_fix_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "issues": { "type": "ARRAY", "items": string() },
            "fixedCode": string(),
            "explanation": string(),
        },
    })
}

fn business_block(business: Option<&BusinessContext>) -> String {
    match business {
        Some(b) => format!(
            "BUSINESS CONTEXT (tailor the audit to this):\n\
- Name: {}\n- Industry: {}\n- Location: {}\n- Services: {}\n",
            b.name.trim(),
            b.industry.trim(),
            b.location.trim(),
            b.keywords.trim()
        ),
        None => String::new(),
    }
}

const AUDIT_INSTRUCTIONS: &str = "\
Perform a comprehensive SEO audit.
Return BOTH passing items (what is already right) and failing items (what to fix).
For every 'Fail' or 'Warning', give a specific solution with an example \
(e.g. \"Change <title> to 'X'\" or \"Add schema JSON: {...}\").

Categorise items strictly into:
1. Basic: titles, metas, headings, alt tags.
2. Technical: speed, mobile, HTTPS, robots.txt, sitemap, Core Web Vitals.
3. Advanced: E-E-A-T, content depth, topic clusters, internal linking.
4. AEO: answer engine optimisation, featured snippets, voice search, Q&A format.
5. GEO: local SEO, Google Business Profile, local schema, NAP consistency.

Scores should reflect the ratio of passed to failed items in each category.";

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub fn audit_prompt(input: &str, mode: AnalysisMode, business: Option<&BusinessContext>) -> String {
    let business = business_block(business);
    match mode {
        AnalysisMode::Url => format!(
            "{business}\nAnalyze this website URL contextually: {input}\n\n{AUDIT_INSTRUCTIONS}\n\n\
Simulate a full crawl based on public knowledge or general best practices for this domain.\n\
Include at least 5 items per category (Basic, Technical, Advanced, AEO, GEO).\n",
            input = input.trim()
        ),
        AnalysisMode::Code => format!(
            "{business}\nAnalyze this provided WEBSITE SOURCE CODE contextually:\n\
SOURCE CODE START:\n{code}\nSOURCE CODE END.\n\n{AUDIT_INSTRUCTIONS}\n\
Treat this as a full technical code audit.\n",
            code = truncate_chars(input, MAX_CODE_PROMPT_CHARS)
        ),
    }
}

pub fn blog_prompt(topic: &str, context: &str) -> String {
    format!(
        "Write a comprehensive, SEO-optimized blog post about \"{topic}\".\n\
Context: {context}...\n\n\
Requirements:\n\
- Optimized title and meta description.\n\
- H1, H2, H3 structure.\n\
- An \"AEO\" section (question and answer block).\n\
- Internal link suggestions.\n\
- FAQ section with JSON-LD schema markup at the end.\n\
- Tone: professional, authoritative, yet easy to read.\n",
        topic = topic.trim(),
        context = truncate_chars(context, MAX_BLOG_CONTEXT_CHARS)
    )
}

pub fn code_fix_prompt(code: &str, issues: &str) -> String {
    format!(
        "Here is the original code:\n```\n{code}\n```\n\n\
Based on the SEO audit issues found: {issues}\n\n\
1. Fix the code to follow SEO, AEO and GEO best practices (titles, metas, semantic tags, schema, etc).\n\
2. Explain the changes briefly.\n\n\
Return the response in JSON format.\n"
    )
}

pub fn keyword_prompt(seed: &str) -> String {
    format!(
        "Act as an SEO expert. Perform keyword research for the seed keyword: \"{seed}\".\n\
Generate {KEYWORD_SUGGESTION_COUNT} highly relevant related keywords including long-tail variations.\n\
For each, determine the search intent, difficulty level (Easy/Medium/Hard) and estimated \
search volume (Low/Medium/High).\n\
Return the result as a JSON array.",
        seed = seed.trim()
    )
}
