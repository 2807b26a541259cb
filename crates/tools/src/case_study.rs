//! Case-study lookup: one targeted web search, ranked for "this customer
//! used our product and got results" pages.

use async_trait::async_trait;
use regex_lite::Regex;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::search::{SearchBackend, SearchHit};

const SEARCH_COUNT: u32 = 8;

const CASE_STUDY_KEYWORDS: &[&str] = &[
    "case study",
    "customer story",
    "success story",
    "implementation",
    "results",
    "roi",
    "transformation",
    "deployment",
    "metrics",
    "performance",
    "growth",
    "improvement",
    "testimonial",
    "customer success",
    "client story",
    "business case",
    "use case",
    "implementation story",
];

const IMPLEMENTATION_KEYWORDS: &[&str] = &[
    "implementation",
    "deployed",
    "launched",
    "achieved",
    "increased",
    "improved",
    "reduced",
    "saved",
];

const METRICS_KEYWORDS: &[&str] = &[
    "roi",
    "results",
    "metrics",
    "performance",
    "growth",
    "increase",
    "improvement",
    "%",
    "percent",
    "x increase",
];

const LISTICLE_MARKERS: &[&str] = &["top 10", "best practices", "tips", "guide to", "how to"];

const COMPANY_INDICATORS: &[&str] = &["customer", "client", "company", "business", "organization"];

#[derive(Debug, Clone, Serialize)]
pub struct RankedHit {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub relevance_score: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseStudySummary {
    pub title: String,
    pub url: String,
    pub description: String,
    pub key_metrics: Vec<String>,
    pub content_preview: String,
    pub relevance_score: i32,
}

/// Ranked lookup result shared with `save_as_markdown`.
#[derive(Debug, Clone, Serialize)]
pub struct CaseStudyReport {
    pub company_domain: String,
    pub summary: CaseStudySummary,
    pub results: Vec<RankedHit>,
    pub total_found: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Search failed: {0}")]
    Search(String),

    #[error("No case studies found for this domain")]
    NothingFound,
}

pub fn build_query(company_domain: &str, context: &str, rep_domain: &str) -> String {
    let site_filter = if rep_domain.is_empty() {
        String::new()
    } else {
        format!("site:{rep_domain} OR site:resources.{rep_domain}")
    };
    let raw = format!(
        "\"{company_domain}\" {context} customer case study implementation results metrics {site_filter}"
    );
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Search, rank and summarize case studies for `company_domain`.
pub async fn lookup(
    backend: &dyn SearchBackend,
    company_domain: &str,
    context: &str,
    rep_domain: &str,
) -> Result<CaseStudyReport, LookupError> {
    let query = build_query(company_domain, context, rep_domain);
    let hits = backend
        .search(&query, SEARCH_COUNT)
        .await
        .map_err(|e| LookupError::Search(e.to_string()))?;
    info!(company = company_domain, hits = hits.len(), "Case study search complete");

    let ranked = rank(hits, company_domain, rep_domain);
    let top = ranked.first().ok_or(LookupError::NothingFound)?;
    Ok(CaseStudyReport {
        company_domain: company_domain.to_string(),
        summary: summarize(top),
        total_found: ranked.len(),
        results: ranked,
    })
}

pub fn score(hit: &SearchHit, company: &str, rep_domain: &str) -> i32 {
    let title = hit.title.to_lowercase();
    let description = hit.description.to_lowercase();
    let url = hit.url.to_lowercase();
    let company = company.to_lowercase();
    let mut score = 0;

    if !rep_domain.is_empty() && url.contains(&rep_domain.to_lowercase()) {
        score += 2;
    }
    if url.contains("resources.") || url.contains(".pdf") {
        score += 1;
    }
    let ownership = format!("how {company}");
    if title.contains(&ownership) || description.contains(&ownership) {
        score -= 3;
    }
    if LISTICLE_MARKERS.iter().any(|m| title.contains(m)) {
        score -= 2;
    }

    if title.contains(&company) {
        score += 10;
    }
    if description.contains(&company) {
        score += 5;
    }

    for (keywords, in_title, in_description) in [
        (CASE_STUDY_KEYWORDS, 8, 4),
        (IMPLEMENTATION_KEYWORDS, 8, 5),
        (METRICS_KEYWORDS, 6, 3),
    ] {
        for keyword in keywords {
            if title.contains(keyword) {
                score += in_title;
            }
            if description.contains(keyword) {
                score += in_description;
            }
        }
    }

    for indicator in COMPANY_INDICATORS {
        if title.contains(&format!("{indicator} story")) || title.contains(&format!("{indicator} case")) {
            score += 10;
        }
    }
    if title.contains("2024") || title.contains("2023") {
        score += 3;
    }
    score
}

/// Drop non-positive scores, sort descending, keep the first hit per URL.
pub fn rank(hits: Vec<SearchHit>, company: &str, rep_domain: &str) -> Vec<RankedHit> {
    let mut scored: Vec<RankedHit> = hits
        .into_iter()
        .map(|hit| RankedHit {
            relevance_score: score(&hit, company, rep_domain),
            hit,
        })
        .filter(|r| r.relevance_score > 0)
        .collect();
    scored.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));

    let mut seen = HashSet::new();
    scored.retain(|r| seen.insert(r.hit.url.clone()));
    scored
}

fn metric_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"\d+%?\s*(?:increase|improvement|growth|boost|rise)",
            r"\d+%?\s*(?:decrease|reduction|drop|decline)",
            r"\d+x\s*(?:faster|quicker|more|better)",
            r"\$\d+[kmb]?\s*(?:saved|revenue|profit|cost)",
            r"\d+%?\s*roi",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).map_err(|e| warn!(pattern = *p, error = %e, "Bad metric pattern")).ok())
        .collect()
    })
}

pub fn extract_metrics(text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    metric_patterns()
        .iter()
        .flat_map(|re| re.find_iter(&text).map(|m| m.as_str().to_string()))
        .take(5)
        .collect()
}

fn summarize(top: &RankedHit) -> CaseStudySummary {
    let hit = &top.hit;
    let description: String = hit.description.chars().take(500).collect();
    CaseStudySummary {
        title: hit.title.clone(),
        url: hit.url.clone(),
        key_metrics: extract_metrics(&format!("{} {}", hit.title, hit.description)),
        content_preview: hit.snippet.chars().take(1000).collect(),
        description,
        relevance_score: top.relevance_score,
    }
}

pub struct CaseStudyLookupTool {
    backend: Option<Arc<dyn SearchBackend>>,
}

impl CaseStudyLookupTool {
    pub fn new(backend: Option<Arc<dyn SearchBackend>>) -> Self {
        Self { backend }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    company_domain: String,
    #[serde(default)]
    context: String,
    #[serde(default)]
    rep_domain: String,
}

#[async_trait]
impl Tool for CaseStudyLookupTool {
    fn name(&self) -> &str {
        "case_study_lookup"
    }

    fn description(&self) -> &str {
        "Find customer case studies for a prospect company, optionally restricted to the rep's own site."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "company_domain": { "type": "string", "description": "Prospect company name or domain" },
                "context": { "type": "string", "description": "Extra search terms (industry, product)" },
                "rep_domain": { "type": "string", "description": "Sales rep's company domain to search within" }
            },
            "required": ["company_domain"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;
        let Some(backend) = &self.backend else {
            return Ok(json!({
                "tool": "case_study_lookup",
                "success": false,
                "company_domain": args.company_domain,
                "error": "Brave Search is not available. Please configure BRAVE_API_KEY environment variable.",
            }));
        };

        match lookup(backend.as_ref(), &args.company_domain, &args.context, &args.rep_domain).await {
            Ok(report) => Ok(json!({
                "tool": "case_study_lookup",
                "success": true,
                "company_domain": report.company_domain,
                "summary": report.summary,
                "results": report.results.iter().take(3).collect::<Vec<_>>(),
                "total_found": report.total_found,
            })),
            Err(e) => Ok(json!({
                "tool": "case_study_lookup",
                "success": false,
                "company_domain": args.company_domain,
                "error": e.to_string(),
            })),
        }
    }
}
