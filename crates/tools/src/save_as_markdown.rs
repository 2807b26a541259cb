//! Runs a case-study lookup and saves the analysis as a markdown report in
//! the workspace.

use async_trait::async_trait;
use chrono::Local;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::case_study::{self, CaseStudyReport};
use crate::search::SearchBackend;
use crate::workspace::Workspace;

pub struct SaveAsMarkdownTool {
    backend: Option<Arc<dyn SearchBackend>>,
    workspace: Arc<Workspace>,
}

impl SaveAsMarkdownTool {
    pub fn new(backend: Option<Arc<dyn SearchBackend>>, workspace: Arc<Workspace>) -> Self {
        Self { backend, workspace }
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
    #[serde(default)]
    output_path: Option<String>,
}

fn failure(error: impl ToString) -> Value {
    json!({ "tool": "save_as_markdown", "success": false, "error": error.to_string() })
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > 50 {
        format!("{}...", title.chars().take(50).collect::<String>())
    } else {
        title.to_string()
    }
}

pub fn render_report(report: &CaseStudyReport, generated_at: &str) -> String {
    let summary = &report.summary;
    let mut md = String::new();

    let _ = writeln!(md, "# Case Study Analysis: {}\n", report.company_domain);
    let _ = writeln!(md, "*Generated on {generated_at}*\n");
    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "**Company:** {}  ", report.company_domain);
    let _ = writeln!(md, "**Total Results Found:** {}\n", report.total_found);

    let _ = writeln!(md, "## Top Case Study\n");
    let _ = writeln!(md, "### {}\n", summary.title);
    let _ = writeln!(md, "**URL:** [{0}]({0})  ", summary.url);
    let _ = writeln!(md, "**Relevance Score:** {}\n", summary.relevance_score);
    let _ = writeln!(md, "#### Description\n{}\n", summary.description);
    let _ = writeln!(md, "#### Key Metrics");
    if summary.key_metrics.is_empty() {
        let _ = writeln!(md, "- No specific metrics found");
    }
    for metric in &summary.key_metrics {
        let _ = writeln!(md, "- {metric}");
    }
    let _ = writeln!(md, "\n#### Content Preview\n{}\n", summary.content_preview);

    let _ = writeln!(md, "## All Results\n");
    let _ = writeln!(md, "| Rank | Title | URL | Score |");
    let _ = writeln!(md, "|------|-------|-----|-------|");
    for (i, result) in report.results.iter().take(10).enumerate() {
        let _ = writeln!(
            md,
            "| {0} | {1} | [{2}]({2}) | {3} |",
            i + 1,
            truncate_title(&result.hit.title),
            result.hit.url,
            result.relevance_score
        );
    }
    md
}

#[async_trait]
impl Tool for SaveAsMarkdownTool {
    fn name(&self) -> &str {
        "save_as_markdown"
    }

    fn description(&self) -> &str {
        "Look up case studies for a company and save the analysis as a markdown report in output/case_studies."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "company_domain": { "type": "string", "description": "Prospect company name or domain" },
                "context": { "type": "string", "description": "Extra search terms" },
                "rep_domain": { "type": "string", "description": "Sales rep's company domain" },
                "output_path": { "type": "string", "description": "Workspace path for the report (optional)" }
            },
            "required": ["company_domain"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;
        let Some(backend) = &self.backend else {
            return Ok(failure(
                "Brave Search is not available. Please configure BRAVE_API_KEY environment variable.",
            ));
        };

        let report = match case_study::lookup(backend.as_ref(), &args.company_domain, &args.context, &args.rep_domain).await
        {
            Ok(report) => report,
            Err(e) => return Ok(failure(e)),
        };

        let now = Local::now();
        let path = args.output_path.unwrap_or_else(|| {
            format!(
                "output/case_studies/case_study_{}_{}.md",
                args.company_domain,
                now.format("%Y%m%d_%H%M%S")
            )
        });
        let markdown = render_report(&report, &now.format("%Y-%m-%d %H:%M:%S").to_string());

        match self.workspace.write_file(&path, &markdown, false).await {
            Ok(receipt) => {
                let filename = receipt.path.rsplit('/').next().unwrap_or(&receipt.path).to_string();
                Ok(json!({
                    "tool": "save_as_markdown",
                    "success": true,
                    "filepath": receipt.path,
                    "filename": filename,
                    "size": receipt.size,
                    "message": format!("Case study analysis saved to {}", receipt.path),
                }))
            }
            Err(e) => Ok(failure(e)),
        }
    }
}
