/// MCP server for the SEO autopilot.
///
/// Action tools (`analyze_*`, `research_keywords`, `generate_blog`, `fix_code`) each issue
/// one generation request behind a per-action busy gate. View tools (`get_*`) read the
/// shared [`AppState`] and never dispatch anything.
use std::path::PathBuf;
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use seo_common::engine::Engine;
use seo_common::ingest::{self, IngestLimits};
use seo_common::mcp_api::{
    AnalyzeCodeParams, AnalyzeFolderParams, AnalyzeUrlParams, BacklinksResponse, BlogView,
    BusinessContextResponse, CodeView, CreatePostParams, FixCodeParams, FolderAuditResponse,
    GenerateBlogParams, KeywordTableResponse, OkResponse, ReportResponse, ResearchKeywordsParams,
    SetViewParams, SortKeywordsParams, ViewResponse,
};
use seo_common::model::{AnalysisMode, AuditResult, BlogDraft, BusinessContext};
use seo_common::report::{group_recommendations, Dashboard};
use seo_common::state::AppState;

use crate::gate::{Action, ActionGate};

const NO_RESULT: &str = "no audit result yet: run analyze_url, analyze_folder or analyze_code first";

#[derive(Clone)]
pub struct SeoAutopilotServer {
    engine: Engine,
    state: Arc<RwLock<AppState>>,
    gate: ActionGate,
    limits: IngestLimits,
    tool_router: ToolRouter<SeoAutopilotServer>,
}

impl SeoAutopilotServer {
    pub fn new(engine: Engine, limits: IngestLimits) -> Self {
        Self {
            engine,
            state: Arc::new(RwLock::new(AppState::default())),
            gate: ActionGate::new(),
            limits,
            tool_router: Self::tool_router(),
        }
    }

    async fn require_business(&self) -> Result<BusinessContext, String> {
        let business = self.state.read().await.business.clone();
        if !business.is_valid() {
            return Err(format!(
                "business context incomplete, missing: {}",
                business.missing_fields().join(", ")
            ));
        }
        Ok(business)
    }

    async fn with_result<T>(&self, f: impl FnOnce(&AuditResult) -> T) -> Result<T, String> {
        let state = self.state.read().await;
        state.result.as_ref().map(f).ok_or_else(|| NO_RESULT.to_string())
    }

    /// Run one audit. State is only touched when the whole result parsed.
    async fn audit(
        &self,
        input: &str,
        mode: AnalysisMode,
        business: &BusinessContext,
    ) -> Result<AuditResult, String> {
        self.engine
            .run_audit(input, mode, Some(business))
            .await
            .inspect_err(|e| warn!(error = %e, ?mode, "audit failed"))
            .map_err(|e| format!("analysis failed: {e}"))
    }

    async fn blog_view(&self) -> BlogView {
        let state = self.state.read().await;
        BlogView {
            ideas: state
                .result
                .as_ref()
                .map(|r| r.blog_ideas.clone())
                .unwrap_or_default(),
            context: state.blog_context(),
            pending_topic: state.pending_blog_topic.clone(),
            draft: state.blog.clone(),
        }
    }
}

#[tool_router]
impl SeoAutopilotServer {
    #[tool(description = "Set the business details used to tailor every audit. name, industry, location and keywords are required; competitors is optional.")]
    async fn set_business_context(
        &self,
        Parameters(business): Parameters<BusinessContext>,
    ) -> Result<Json<BusinessContextResponse>, String> {
        let mut state = self.state.write().await;
        state.business = business;
        Ok(Json(BusinessContextResponse::from_context(&state.business)))
    }

    #[tool(description = "Show the current business details and whether they are complete enough to run an audit.")]
    async fn get_business_context(&self) -> Result<Json<BusinessContextResponse>, String> {
        let state = self.state.read().await;
        Ok(Json(BusinessContextResponse::from_context(&state.business)))
    }

    #[tool(description = "Run a full SEO audit (Basic, Technical, Advanced, AEO, GEO) for a website URL. Replaces the current result and returns the dashboard.")]
    async fn analyze_url(
        &self,
        Parameters(params): Parameters<AnalyzeUrlParams>,
    ) -> Result<Json<Dashboard>, String> {
        let url = params.url.trim().to_string();
        if url.is_empty() {
            return Err("url must not be empty".to_string());
        }
        let business = self.require_business().await?;
        let _busy = self.gate.try_begin(Action::Audit)?;

        let result = self.audit(&url, AnalysisMode::Url, &business).await?;
        let dashboard = Dashboard::from_result(&result);

        let mut state = self.state.write().await;
        state.url = Some(url);
        state.apply_audit(result);
        Ok(Json(dashboard))
    }

    #[tool(description = "Upload a local website source folder: text/code files are filtered (paths containing node_modules, .git, dist, build or .next are dropped; text extensions only; 200KB per file) and concatenated, then audited as source code.")]
    async fn analyze_folder(
        &self,
        Parameters(params): Parameters<AnalyzeFolderParams>,
    ) -> Result<Json<FolderAuditResponse>, String> {
        let path = params.path.trim().to_string();
        if path.is_empty() {
            return Err("path must not be empty".to_string());
        }
        let business = self.require_business().await?;
        let _busy = self.gate.try_begin(Action::Audit)?;

        let aggregate = ingest::aggregate_folder(PathBuf::from(&path), self.limits)
            .await
            .map_err(|e| format!("failed to read files: {e}"))?;
        info!(
            path = %path,
            files = aggregate.file_count,
            truncated = aggregate.truncated,
            "folder uploaded"
        );

        let result = self.audit(&aggregate.text, AnalysisMode::Code, &business).await?;
        let dashboard = Dashboard::from_result(&result);

        let mut state = self.state.write().await;
        state.uploaded_code = Some(aggregate.text);
        state.apply_audit(result);

        Ok(Json(FolderAuditResponse {
            files_included: aggregate.file_count,
            truncated: aggregate.truncated,
            skipped: aggregate.skipped,
            dashboard,
        }))
    }

    #[tool(description = "Audit pasted website source code (or the last uploaded folder when no code is given). Replaces the current result and returns the dashboard.")]
    async fn analyze_code(
        &self,
        Parameters(params): Parameters<AnalyzeCodeParams>,
    ) -> Result<Json<Dashboard>, String> {
        let business = self.require_business().await?;
        let code = match params.code.filter(|c| !c.trim().is_empty()) {
            Some(code) => code,
            None => self
                .state
                .read()
                .await
                .uploaded_code
                .clone()
                .ok_or_else(|| "no code to analyze: pass code or upload a folder first".to_string())?,
        };
        let _busy = self.gate.try_begin(Action::Audit)?;

        let result = self.audit(&code, AnalysisMode::Code, &business).await?;
        let dashboard = Dashboard::from_result(&result);

        let mut state = self.state.write().await;
        state.uploaded_code = Some(code);
        state.apply_audit(result);
        Ok(Json(dashboard))
    }

    #[tool(description = "Dashboard of the current audit: summary, the five scores, high/medium impact counts and the grouped report.")]
    async fn get_dashboard(&self) -> Result<Json<Dashboard>, String> {
        let dashboard = self.with_result(Dashboard::from_result).await?;
        Ok(Json(dashboard))
    }

    #[tool(description = "Recommendations grouped by category (Basic, Technical, Advanced, AEO, GEO), failures first.")]
    async fn get_report(&self) -> Result<Json<ReportResponse>, String> {
        let groups = self
            .with_result(|r| group_recommendations(&r.recommendations))
            .await?;
        Ok(Json(ReportResponse { groups }))
    }

    #[tool(description = "Current keyword table in display order, with the active sort column and direction.")]
    async fn get_keywords(&self) -> Result<Json<KeywordTableResponse>, String> {
        let state = self.state.read().await;
        Ok(Json(KeywordTableResponse::from_table(&state.keyword_table)))
    }

    #[tool(description = "Sort the keyword table by keyword, intent, difficulty or volume. Sorting by the active column again flips the direction; a new column starts ascending.")]
    async fn sort_keywords(
        &self,
        Parameters(params): Parameters<SortKeywordsParams>,
    ) -> Result<Json<KeywordTableResponse>, String> {
        let mut state = self.state.write().await;
        state.keyword_table.toggle_sort(params.field);
        Ok(Json(KeywordTableResponse::from_table(&state.keyword_table)))
    }

    #[tool(description = "Research related keywords for a seed term (intent, difficulty, volume). Replaces the keyword table.")]
    async fn research_keywords(
        &self,
        Parameters(params): Parameters<ResearchKeywordsParams>,
    ) -> Result<Json<KeywordTableResponse>, String> {
        let seed = params.seed.trim().to_string();
        if seed.is_empty() {
            return Err("seed must not be empty".to_string());
        }
        self.require_business().await?;
        let _busy = self.gate.try_begin(Action::Keywords)?;

        let keywords = self
            .engine
            .research_keywords(&seed)
            .await
            .map_err(|e| format!("keyword research failed: {e}"))?;

        let mut state = self.state.write().await;
        state.keyword_table.replace(keywords);
        Ok(Json(KeywordTableResponse::from_table(&state.keyword_table)))
    }

    #[tool(description = "Hand a keyword over to the blog view as the next topic to write about. Call generate_blog afterwards.")]
    async fn create_post_from_keyword(
        &self,
        Parameters(params): Parameters<CreatePostParams>,
    ) -> Result<Json<BlogView>, String> {
        let keyword = params.keyword.trim();
        if keyword.is_empty() {
            return Err("keyword must not be empty".to_string());
        }
        self.state.write().await.request_blog_topic(keyword);
        Ok(Json(self.blog_view().await))
    }

    #[tool(description = "Backlink strategies from the current audit.")]
    async fn get_backlinks(&self) -> Result<Json<BacklinksResponse>, String> {
        let backlinks = self.with_result(|r| r.backlinks.clone()).await?;
        Ok(Json(BacklinksResponse { backlinks }))
    }

    #[tool(description = "Blog view: topic ideas from the audit, the pending topic, and the last generated draft.")]
    async fn get_blog(&self) -> Result<Json<BlogView>, String> {
        Ok(Json(self.blog_view().await))
    }

    #[tool(description = "Generate an SEO-optimized Markdown blog post (title, meta, H1-H3, AEO Q&A, FAQ with JSON-LD). Uses the given topic or the pending topic from create_post_from_keyword.")]
    async fn generate_blog(
        &self,
        Parameters(params): Parameters<GenerateBlogParams>,
    ) -> Result<Json<BlogView>, String> {
        self.require_business().await?;
        let _busy = self.gate.try_begin(Action::Blog)?;

        let explicit = params
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let (topic, context) = {
            let mut state = self.state.write().await;
            let pending = state.take_pending_topic();
            let topic = explicit
                .or(pending)
                .ok_or_else(|| "topic must not be empty".to_string())?;
            (topic, state.blog_context())
        };

        let content = self
            .engine
            .generate_blog(&topic, &context)
            .await
            .map_err(|e| format!("blog generation failed: {e}"))?;

        self.state.write().await.blog = Some(BlogDraft { topic, content });
        Ok(Json(self.blog_view().await))
    }

    #[tool(description = "Rewrite source code to follow SEO/AEO/GEO best practices. Returns the original next to the fixed code and an explanation.")]
    async fn fix_code(
        &self,
        Parameters(params): Parameters<FixCodeParams>,
    ) -> Result<Json<CodeView>, String> {
        self.require_business().await?;
        let code = match params.code.filter(|c| !c.trim().is_empty()) {
            Some(code) => code,
            None => self
                .state
                .read()
                .await
                .uploaded_code
                .clone()
                .ok_or_else(|| "no code to fix: pass code or upload a folder first".to_string())?,
        };
        let _busy = self.gate.try_begin(Action::CodeFix)?;

        let analysis = self
            .engine
            .fix_code(&code, params.issues.as_deref().unwrap_or_default())
            .await
            .map_err(|e| format!("fix failed: {e}"))?;

        let mut state = self.state.write().await;
        state.uploaded_code = Some(code);
        state.code_fix = Some(analysis);
        Ok(Json(CodeView {
            original: state.uploaded_code.clone(),
            analysis: state.code_fix.clone(),
        }))
    }

    #[tool(description = "Code view: the uploaded or pasted source and the last code fix, if any.")]
    async fn get_code(&self) -> Result<Json<CodeView>, String> {
        let state = self.state.read().await;
        Ok(Json(CodeView {
            original: state.uploaded_code.clone(),
            analysis: state.code_fix.clone(),
        }))
    }

    #[tool(description = "Switch the active view (dashboard, report, keywords, backlinks, blogs, code).")]
    async fn set_view(
        &self,
        Parameters(params): Parameters<SetViewParams>,
    ) -> Result<Json<ViewResponse>, String> {
        let mut state = self.state.write().await;
        state.active_view = params.view;
        Ok(Json(ViewResponse {
            active_view: state.active_view,
        }))
    }

    #[tool(description = "Clear the current audit, analyzed URL and uploaded code. Business details are kept.")]
    async fn reset(&self) -> Result<Json<OkResponse>, String> {
        self.state.write().await.reset();
        Ok(Json(OkResponse { ok: true }))
    }
}

#[tool_handler]
impl ServerHandler for SeoAutopilotServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "seo-autopilot".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "AI SEO audit server. Call set_business_context first (name, industry, location, \
keywords). Then audit with analyze_url, analyze_folder or analyze_code and browse the result with \
get_dashboard/get_report/get_keywords/get_backlinks. Follow-ups: research_keywords, sort_keywords, \
create_post_from_keyword + generate_blog, fix_code. reset clears the current analysis."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use seo_common::generator::{GenerationError, GenerationRequest, TextGenerator};
    use seo_common::report::SortField;
    use seo_common::state::View;
    use tokio::sync::Notify;

    use super::*;

    const AUDIT_JSON: &str = r#"{
        "summary": "Good start.",
        "scores": {"basic": 70, "technical": 60, "advanced": 50, "aeo": 40, "geo": 30},
        "recommendations": [
            {"title": "Alt text ok", "description": "", "impact": "Low", "status": "Pass", "category": "Basic", "solution": ""},
            {"title": "No meta", "description": "", "impact": "High", "status": "Fail", "category": "Basic", "solution": "Add one"}
        ],
        "blogIdeas": ["Ten pizza toppings"],
        "keywords": [
            {"keyword": "pizza", "intent": "Commercial", "difficulty": "Hard", "volume": "High"},
            {"keyword": "calzone", "intent": "Informational", "difficulty": "Easy", "volume": "Low"}
        ],
        "backlinks": [{"type": "Guest Post", "description": "Food blogs", "example": "Pitch"}]
    }"#;

    struct FakeGenerator {
        responses: Mutex<Vec<Result<String, GenerationError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        fn new(mut responses: Vec<Result<String, GenerationError>>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().expect("lock").len()
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
            self.prompts.lock().expect("lock").push(request.prompt);
            self.responses
                .lock()
                .expect("lock")
                .pop()
                .unwrap_or(Err(GenerationError::EmptyResponse))
        }
    }

    fn server(generator: Arc<FakeGenerator>) -> SeoAutopilotServer {
        SeoAutopilotServer::new(Engine::new(generator, "test-model"), IngestLimits::default())
    }

    fn business() -> BusinessContext {
        BusinessContext {
            name: "Joe's Pizza".to_string(),
            industry: "Restaurant".to_string(),
            location: "Brooklyn".to_string(),
            keywords: "pizza".to_string(),
            competitors: String::new(),
        }
    }

    async fn with_business(server: &SeoAutopilotServer) {
        server
            .set_business_context(Parameters(business()))
            .await
            .expect("business set");
    }

    fn url(u: &str) -> Parameters<AnalyzeUrlParams> {
        Parameters(AnalyzeUrlParams { url: u.to_string() })
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = SeoAutopilotServer::tool_router().list_all();
        for name in [
            "set_business_context",
            "get_business_context",
            "analyze_url",
            "analyze_folder",
            "analyze_code",
            "get_dashboard",
            "get_report",
            "get_keywords",
            "sort_keywords",
            "research_keywords",
            "create_post_from_keyword",
            "get_backlinks",
            "get_blog",
            "generate_blog",
            "fix_code",
            "get_code",
            "set_view",
            "reset",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn incomplete_business_blocks_dispatch() {
        let generator = FakeGenerator::new(vec![Ok(AUDIT_JSON.to_string())]);
        let server = server(generator.clone());
        let mut partial = business();
        partial.location = "  ".to_string();
        server
            .set_business_context(Parameters(partial))
            .await
            .expect("stored");

        let err = server.analyze_url(url("https://joes.example")).await.err().expect("blocked");
        assert!(err.contains("location"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let generator = FakeGenerator::new(vec![]);
        let server = server(generator.clone());
        with_business(&server).await;
        assert!(server.analyze_url(url("   ")).await.is_err());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn failed_audit_keeps_previous_result() {
        let generator = FakeGenerator::new(vec![
            Ok(AUDIT_JSON.to_string()),
            Ok("not json".to_string()),
            Ok(String::new()),
        ]);
        let server = server(generator);
        with_business(&server).await;

        let Json(first) = server
            .analyze_url(url("https://joes.example"))
            .await
            .expect("first audit");
        assert_eq!(first.high_impact, 1);
        assert_eq!(first.report[0].items[0].title, "No meta");

        assert!(server.analyze_url(url("https://other.example")).await.is_err());
        assert!(server.analyze_url(url("https://third.example")).await.is_err());

        let Json(dashboard) = server.get_dashboard().await.expect("still has result");
        assert_eq!(dashboard.summary, "Good start.");
        assert_eq!(
            server.state.read().await.url.as_deref(),
            Some("https://joes.example")
        );
    }

    #[tokio::test]
    async fn views_need_a_result() {
        let server = server(FakeGenerator::new(vec![]));
        assert!(server.get_dashboard().await.is_err());
        assert!(server.get_report().await.is_err());
        assert!(server.get_backlinks().await.is_err());
        let Json(keywords) = server.get_keywords().await.expect("empty table");
        assert!(keywords.keywords.is_empty());
    }

    #[tokio::test]
    async fn keyword_sort_and_research_flow() {
        let generator = FakeGenerator::new(vec![
            Ok(AUDIT_JSON.to_string()),
            Ok(r#"[{"keyword": "pizza oven", "intent": "Commercial", "difficulty": "Medium", "volume": "Medium"}]"#
                .to_string()),
        ]);
        let server = server(generator);
        with_business(&server).await;
        server
            .analyze_url(url("https://joes.example"))
            .await
            .expect("audit");

        let Json(sorted) = server
            .sort_keywords(Parameters(SortKeywordsParams {
                field: SortField::Difficulty,
            }))
            .await
            .expect("sorted");
        assert_eq!(sorted.keywords[0].keyword, "calzone");

        let Json(researched) = server
            .research_keywords(Parameters(ResearchKeywordsParams {
                seed: "pizza".to_string(),
            }))
            .await
            .expect("research");
        assert_eq!(researched.sort_field, None);
        assert_eq!(researched.keywords.len(), 1);

        let Json(dashboard) = server.get_dashboard().await.expect("result intact");
        assert_eq!(dashboard.summary, "Good start.");
    }

    #[tokio::test]
    async fn keyword_handoff_feeds_blog_generation() {
        let generator = FakeGenerator::new(vec![Ok("# Calzone guide".to_string())]);
        let server = server(generator.clone());
        with_business(&server).await;

        let Json(view) = server
            .create_post_from_keyword(Parameters(CreatePostParams {
                keyword: "calzone".to_string(),
            }))
            .await
            .expect("handoff");
        assert_eq!(view.pending_topic.as_deref(), Some("calzone"));

        let Json(view) = server
            .generate_blog(Parameters(GenerateBlogParams { topic: None }))
            .await
            .expect("blog");
        assert_eq!(view.pending_topic, None);
        let draft = view.draft.expect("draft stored");
        assert_eq!(draft.topic, "calzone");
        assert_eq!(draft.content, "# Calzone guide");

        let prompts = generator.prompts.lock().expect("lock");
        assert!(prompts[0].contains("General Industry Context"));
    }

    #[tokio::test]
    async fn blog_without_topic_is_rejected() {
        let generator = FakeGenerator::new(vec![]);
        let server = server(generator.clone());
        with_business(&server).await;
        assert!(server
            .generate_blog(Parameters(GenerateBlogParams { topic: None }))
            .await
            .is_err());
        assert_eq!(generator.calls(), 0);
        assert!(!server.gate.is_busy(Action::Blog));
    }

    #[tokio::test]
    async fn folder_upload_audits_aggregated_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("site");
        std::fs::create_dir_all(root.join("dist")).expect("mkdir");
        std::fs::write(root.join("index.html"), "<title>Joe's</title>").expect("write");
        std::fs::write(root.join("dist/bundle.js"), "BUNDLED").expect("write");

        let generator = FakeGenerator::new(vec![Ok(AUDIT_JSON.to_string())]);
        let server = server(generator.clone());
        with_business(&server).await;

        let Json(response) = server
            .analyze_folder(Parameters(AnalyzeFolderParams {
                path: root.to_string_lossy().to_string(),
            }))
            .await
            .expect("folder audit");
        assert_eq!(response.files_included, 1);
        assert!(!response.truncated);

        let prompts = generator.prompts.lock().expect("lock");
        assert!(prompts[0].contains("/* --- FILE: site/index.html --- */"));
        assert!(!prompts[0].contains("BUNDLED"));
        drop(prompts);

        let Json(code) = server.get_code().await.expect("code view");
        assert!(code.original.expect("uploaded").contains("<title>Joe's</title>"));
    }

    #[tokio::test]
    async fn empty_folder_fails_without_dispatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("logo.png"), [1u8, 2, 3]).expect("write");

        let generator = FakeGenerator::new(vec![]);
        let server = server(generator.clone());
        with_business(&server).await;

        let err = server
            .analyze_folder(Parameters(AnalyzeFolderParams {
                path: dir.path().to_string_lossy().to_string(),
            }))
            .await
            .err()
            .expect("empty");
        assert!(err.contains("no valid code files"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn fix_code_stores_original_and_fix() {
        let generator = FakeGenerator::new(vec![Ok(
            r#"{"issues": ["no title"], "fixedCode": "<title>x</title>", "explanation": "added"}"#.to_string(),
        )]);
        let server = server(generator);
        with_business(&server).await;

        let Json(view) = server
            .fix_code(Parameters(FixCodeParams {
                code: Some("<html></html>".to_string()),
                issues: None,
            }))
            .await
            .expect("fixed");
        assert_eq!(view.original.as_deref(), Some("<html></html>"));
        assert_eq!(
            view.analysis.and_then(|a| a.explanation).as_deref(),
            Some("added")
        );
    }

    #[tokio::test]
    async fn reset_clears_analysis_only() {
        let generator = FakeGenerator::new(vec![Ok(AUDIT_JSON.to_string())]);
        let server = server(generator);
        with_business(&server).await;
        server
            .analyze_url(url("https://joes.example"))
            .await
            .expect("audit");

        server.reset().await.expect("reset");
        assert!(server.get_dashboard().await.is_err());
        let Json(business) = server.get_business_context().await.expect("business");
        assert!(business.valid);
    }

    /// Holds every request until released, so a second call can observe the busy gate.
    struct BlockingGenerator {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl TextGenerator for BlockingGenerator {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(AUDIT_JSON.to_string())
        }
    }

    fn code(c: Option<&str>) -> Parameters<AnalyzeCodeParams> {
        Parameters(AnalyzeCodeParams {
            code: c.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn analyze_code_audits_pasted_source() {
        let generator = FakeGenerator::new(vec![Ok(AUDIT_JSON.to_string())]);
        let server = server(generator.clone());
        with_business(&server).await;

        let Json(dashboard) = server
            .analyze_code(code(Some("<html><title>Joe's</title></html>")))
            .await
            .expect("code audit");
        assert_eq!(dashboard.summary, "Good start.");

        let prompts = generator.prompts.lock().expect("lock");
        assert!(prompts[0].contains("SOURCE CODE START:\n<html><title>Joe's</title></html>"));
        drop(prompts);

        let state = server.state.read().await;
        assert_eq!(
            state.uploaded_code.as_deref(),
            Some("<html><title>Joe's</title></html>")
        );
        assert!(state.url.is_none());
    }

    #[tokio::test]
    async fn analyze_code_falls_back_to_uploaded_source() {
        let generator = FakeGenerator::new(vec![
            Ok(AUDIT_JSON.to_string()),
            Ok(AUDIT_JSON.to_string()),
        ]);
        let server = server(generator.clone());
        with_business(&server).await;

        let err = server.analyze_code(code(None)).await.err().expect("nothing uploaded");
        assert!(err.contains("no code to analyze"));
        assert_eq!(generator.calls(), 0);

        server
            .analyze_code(code(Some("<p>UPLOADED</p>")))
            .await
            .expect("first audit");
        server
            .analyze_code(code(Some("   ")))
            .await
            .expect("blank code uses upload");

        let prompts = generator.prompts.lock().expect("lock");
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("<p>UPLOADED</p>"));
    }

    #[tokio::test]
    async fn fix_code_falls_back_to_uploaded_source() {
        let generator = FakeGenerator::new(vec![
            Ok(AUDIT_JSON.to_string()),
            Ok(r#"{"issues": [], "fixedCode": "<p>FIXED</p>"}"#.to_string()),
        ]);
        let server = server(generator.clone());
        with_business(&server).await;

        assert!(server
            .fix_code(Parameters(FixCodeParams {
                code: None,
                issues: None,
            }))
            .await
            .is_err());

        server
            .analyze_code(code(Some("<p>UPLOADED</p>")))
            .await
            .expect("audit");
        let Json(view) = server
            .fix_code(Parameters(FixCodeParams {
                code: None,
                issues: Some("missing title".to_string()),
            }))
            .await
            .expect("fixed");
        assert_eq!(view.original.as_deref(), Some("<p>UPLOADED</p>"));
        assert_eq!(
            view.analysis.and_then(|a| a.fixed_code).as_deref(),
            Some("<p>FIXED</p>")
        );

        let prompts = generator.prompts.lock().expect("lock");
        assert!(prompts[1].contains("<p>UPLOADED</p>"));
        assert!(prompts[1].contains("missing title"));
    }

    #[tokio::test]
    async fn report_groups_current_result() {
        let generator = FakeGenerator::new(vec![Ok(AUDIT_JSON.to_string())]);
        let server = server(generator);
        with_business(&server).await;
        server
            .analyze_url(url("https://joes.example"))
            .await
            .expect("audit");

        let Json(report) = server.get_report().await.expect("report");
        assert_eq!(report.groups.len(), 1);
        let basic = &report.groups[0];
        assert_eq!(basic.title, "Basic SEO");
        assert_eq!(basic.fail_count, 1);
        assert_eq!(basic.pass_count, 1);
        let titles: Vec<&str> = basic.items.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["No meta", "Alt text ok"]);
    }

    #[tokio::test]
    async fn set_view_switches_and_getters_do_not() {
        let server = server(FakeGenerator::new(vec![]));

        let Json(view) = server
            .set_view(Parameters(SetViewParams {
                view: View::Keywords,
            }))
            .await
            .expect("view set");
        assert_eq!(view.active_view, View::Keywords);

        server.get_keywords().await.expect("keywords");
        server.get_blog().await.expect("blog");
        server.get_code().await.expect("code");
        assert_eq!(server.state.read().await.active_view, View::Keywords);

        server
            .create_post_from_keyword(Parameters(CreatePostParams {
                keyword: "calzone".to_string(),
            }))
            .await
            .expect("handoff");
        assert_eq!(server.state.read().await.active_view, View::Blogs);
    }

    #[tokio::test]
    async fn second_audit_is_rejected_while_one_is_in_flight() {
        let generator = Arc::new(BlockingGenerator {
            started: Notify::new(),
            release: Notify::new(),
        });
        let server = SeoAutopilotServer::new(
            Engine::new(generator.clone(), "test-model"),
            IngestLimits::default(),
        );
        with_business(&server).await;

        let first = {
            let server = server.clone();
            tokio::spawn(async move { server.analyze_url(url("https://joes.example")).await })
        };
        generator.started.notified().await;
        assert!(server.gate.is_busy(Action::Audit));

        let err = server
            .analyze_url(url("https://other.example"))
            .await
            .err()
            .expect("busy");
        assert!(err.contains("audit already in progress"));
        let err = server
            .analyze_code(code(Some("<html></html>")))
            .await
            .err()
            .expect("busy");
        assert!(err.contains("audit already in progress"));

        generator.release.notify_one();
        let Json(dashboard) = first.await.expect("join").expect("first audit");
        assert_eq!(dashboard.summary, "Good start.");
        assert!(!server.gate.is_busy(Action::Audit));
        assert_eq!(
            server.state.read().await.url.as_deref(),
            Some("https://joes.example")
        );
    }

    #[tokio::test]
    async fn failed_folder_audit_leaves_code_view_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("site");
        std::fs::create_dir_all(&root).expect("mkdir");
        std::fs::write(root.join("index.html"), "<title>NEW</title>").expect("write");

        let generator = FakeGenerator::new(vec![
            Ok(r#"{"issues": [], "fixedCode": "<p>FIXED</p>"}"#.to_string()),
            Ok("not json".to_string()),
        ]);
        let server = server(generator);
        with_business(&server).await;
        server
            .fix_code(Parameters(FixCodeParams {
                code: Some("<p>OLD</p>".to_string()),
                issues: None,
            }))
            .await
            .expect("fixed");

        assert!(server
            .analyze_folder(Parameters(AnalyzeFolderParams {
                path: root.to_string_lossy().to_string(),
            }))
            .await
            .is_err());

        let Json(view) = server.get_code().await.expect("code view");
        assert_eq!(view.original.as_deref(), Some("<p>OLD</p>"));
        assert!(view.analysis.is_some());
    }
}
