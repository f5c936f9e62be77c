use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use msc_core::persist::IndexPaths;
use msc_core::{Course, Engine, EngineError, LazyEngine, Scheme};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub scheme: Option<String>,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub scheme: Scheme,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: f32,
    pub title: String,
    pub university: String,
    pub url: String,
    pub snippet: Option<String>,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: u32,
    #[serde(flatten)]
    pub course: Course,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LazyEngine>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Engine(EngineError),
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self { ApiError::Engine(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Engine(e) if e.is_not_built() => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            ApiError::Engine(e) => {
                tracing::error!(error = %e, "engine failure");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Router over the index at `index_dir`. The index is loaded on the first request
/// that needs it, so the server can start before a build has run.
pub fn build_app(index_dir: String) -> Result<Router> {
    Ok(router(Arc::new(LazyEngine::open(IndexPaths::new(&index_dir)))))
}

/// Router over an engine the caller already holds, e.g. one preloaded at startup.
pub fn router(engine: Arc<LazyEngine>) -> Router {
    let app_state = AppState { engine };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// The loaded engine. The first load reads and decodes the snapshot, so it runs
/// on the blocking pool.
async fn loaded_engine(state: &AppState) -> Result<Arc<Engine>, ApiError> {
    if state.engine.is_loaded() {
        return Ok(state.engine.get()?);
    }
    let lazy = Arc::clone(&state.engine);
    let engine = tokio::task::spawn_blocking(move || lazy.get())
        .await
        .map_err(|e| ApiError::Internal(format!("index load task failed: {e}")))??;
    Ok(engine)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let scheme = match params.scheme.as_deref() {
        None | Some("") => Scheme::Tfidf,
        Some(s) => s.parse::<Scheme>().map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };
    let engine = loaded_engine(&state).await?;
    let k = params.k.min(MAX_K);
    let hits = engine.search(&params.q, k, scheme)?;

    let raw_terms: Vec<&str> = params.q.split_whitespace().collect();
    let results: Vec<SearchHit> = hits
        .into_iter()
        .map(|hit| SearchHit {
            doc_id: hit.doc_id,
            score: hit.similarity,
            title: hit.course.title().to_string(),
            university: hit.course.university_name.clone(),
            url: hit.course.url.clone(),
            snippet: snippet(&hit.course.description, &raw_terms),
        })
        .collect();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse {
        query: params.q,
        scheme,
        took_s: elapsed.as_secs_f64(),
        total_hits: results.len(),
        results,
    }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<DocResponse>, ApiError> {
    let engine = loaded_engine(&state).await?;
    match engine.course(doc_id) {
        Some(course) => Ok(Json(DocResponse { doc_id, course: course.clone() })),
        None => Err(ApiError::NotFound(format!("no document with id {doc_id}"))),
    }
}

/// One case-insensitive alternation over the query words, longest first.
fn terms_pattern(terms: &[&str]) -> Option<regex::Regex> {
    let mut alternatives: Vec<String> = terms.iter().filter(|t| !t.is_empty()).map(|t| regex::escape(t)).collect();
    if alternatives.is_empty() {
        return None;
    }
    alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    alternatives.dedup();
    regex::RegexBuilder::new(&alternatives.join("|")).case_insensitive(true).build().ok()
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// Up to ~300 bytes of `text` around the first query word, words wrapped in `<em>`.
fn snippet(text: &str, raw_terms: &[&str]) -> Option<String> {
    if text.is_empty() { return None; }
    let pattern = terms_pattern(raw_terms);
    let first_idx = pattern.as_ref().and_then(|re| re.find(text)).map(|m| m.start());
    let window = match first_idx {
        Some(idx) => {
            let mut start = idx.saturating_sub(100);
            while !text.is_char_boundary(start) { start -= 1; }
            let mut end = (idx + 200).min(text.len());
            while !text.is_char_boundary(end) { end += 1; }
            &text[start..end]
        }
        None => {
            let end = text.char_indices().nth(200).map(|(i, _)| i).unwrap_or(text.len());
            &text[..end]
        }
    };
    Some(highlight_terms(window, pattern.as_ref()))
}

/// HTML-escape `snippet`, wrapping every match of `pattern` in `<em>` in one pass.
fn highlight_terms(snippet: &str, pattern: Option<&regex::Regex>) -> String {
    let mut out = String::with_capacity(snippet.len() + 16);
    let mut last = 0;
    if let Some(re) = pattern {
        for m in re.find_iter(snippet) {
            escape_html(&snippet[last..m.start()], &mut out);
            out.push_str("<em>");
            escape_html(m.as_str(), &mut out);
            out.push_str("</em>");
            last = m.end();
        }
    }
    escape_html(&snippet[last..], &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_highlights_query_words() {
        let s = snippet("An MSc covering Statistics and data.", &["statistics"]).unwrap();
        assert_eq!(s, "An MSc covering <em>Statistics</em> and data.");
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = format!("{}data{}", "é".repeat(120), "ü".repeat(150));
        let s = snippet(&text, &["data"]).unwrap();
        assert!(s.contains("<em>data</em>"));
        assert!(snippet("", &["data"]).is_none());
    }

    #[test]
    fn highlighting_does_not_touch_inserted_tags() {
        let s = snippet("data mining", &["data", "em"]).unwrap();
        assert_eq!(s, "<em>data</em> mining");
        let s = snippet("an MSc in data", &["em", "data", "msc"]).unwrap();
        assert_eq!(s, "an <em>MSc</em> in <em>data</em>");
    }

    #[test]
    fn description_markup_is_escaped() {
        let s = snippet("<b>Data</b> & AI", &["data"]).unwrap();
        assert_eq!(s, "&lt;b&gt;<em>Data</em>&lt;/b&gt; &amp; AI");
        assert_eq!(snippet("R&D <lab>", &[]).unwrap(), "R&amp;D &lt;lab&gt;");
    }
}
