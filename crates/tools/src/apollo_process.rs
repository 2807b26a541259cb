//! Apollo.io prospecting helper.
//!
//! Two jobs: summarize an Apollo CSV export that lives in the workspace, and
//! turn an Apollo company-list URL into a people search filtered by job
//! title.

use async_trait::async_trait;
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

use crate::workspace::Workspace;

const PEOPLE_SEARCH_URL: &str = "https://app.apollo.io/#/people";
const SEARCH_ID_PARAMS: &[&str] = &[
    "qOrganizationSearchListId",
    "organizationSearchListId",
    "searchListId",
    "listId",
];
const DEFAULT_ROW_LIMIT: usize = 10;
const MAX_ROW_LIMIT: usize = 200;

const PRIORITY_TITLES: &[&str] = &[
    "CEO",
    "CTO",
    "CFO",
    "VP Sales",
    "VP Marketing",
    "VP Engineering",
    "VP Product",
    "Chief Revenue Officer",
    "Chief Marketing Officer",
    "Chief Technology Officer",
    "Chief Financial Officer",
    "President",
    "Co-Founder",
    "Founder",
    "Head of Sales",
];

/// Job titles for a named seniority band; unknown names get the priority list.
pub fn titles_for(category: &str) -> &'static [&'static str] {
    match category {
        "c_suite" => &[
            "CEO",
            "CTO",
            "CFO",
            "COO",
            "Chief Executive Officer",
            "Chief Technology Officer",
            "Chief Financial Officer",
            "Chief Operating Officer",
            "Chief Revenue Officer",
            "Chief Marketing Officer",
            "Chief Product Officer",
            "Chief Data Officer",
        ],
        "vp_level" => &[
            "VP Sales",
            "VP Marketing",
            "VP Engineering",
            "VP Product",
            "VP Operations",
            "VP Business Development",
            "Vice President Sales",
            "Vice President Marketing",
            "Executive Vice President",
            "Senior Vice President",
        ],
        "director_level" => &[
            "Director of Sales",
            "Director of Marketing",
            "Director of Engineering",
            "Director of Product",
            "Sales Director",
            "Marketing Director",
            "Managing Director",
        ],
        "head_level" => &[
            "Head of Sales",
            "Head of Marketing",
            "Head of Engineering",
            "Head of Product",
            "Head of Growth",
            "Head of Customer Success",
        ],
        "founders" => &["Founder", "Co-Founder", "Founding Partner", "Founding Member"],
        _ => PRIORITY_TITLES,
    }
}

/// Organization search-list id from the URL fragment's query, then the URL's
/// own query. Values come back percent-decoded.
pub fn extract_search_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let fragment_pairs: Vec<(String, String)> = parsed
        .fragment()
        .and_then(|f| f.split_once('?'))
        .map(|(_, q)| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let main_pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

    for pairs in [&fragment_pairs, &main_pairs] {
        for key in SEARCH_ID_PARAMS {
            if let Some((_, id)) = pairs.iter().find(|(k, v)| k == key && !v.is_empty()) {
                return Some(id.clone());
            }
        }
    }
    None
}

/// Apollo routes on the fragment, so the query is appended after `#/people`.
pub fn build_people_url(search_id: &str, titles: &[&str], page: u32) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("page", &page.to_string())
        .append_pair("sortAscending", "false")
        .append_pair("sortByField", "[none]")
        .append_pair("qOrganizationSearchListId", search_id);
    for title in titles {
        query.append_pair("personTitles[]", title);
    }
    format!("{PEOPLE_SEARCH_URL}?{}", query.finish())
}

/// Split CSV text into records. Quoted fields may hold commas, `""` escapes
/// and line breaks; blank records are dropped.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', _) => quoted = !quoted,
            (',', false) => record.push(std::mem::take(&mut field)),
            ('\r', false) if chars.peek() == Some(&'\n') => {}
            ('\n', false) | ('\r', false) => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    record.push(field);
    push_record(&mut records, record);
    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.iter().all(|f| f.trim().is_empty());
    if !blank {
        records.push(record);
    }
}

pub struct ApolloProcessTool {
    workspace: Arc<Workspace>,
}

impl ApolloProcessTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    async fn summarize_export(&self, path: &str, limit: usize) -> Value {
        let file = match self.workspace.read_file(path).await {
            Ok(file) => file,
            Err(e) => return json!({ "error": e.to_string() }),
        };
        let Some(content) = file.content else {
            return json!({ "error": format!("{} is not a text file", file.path) });
        };

        let mut records = parse_records(content.trim_start_matches('\u{feff}')).into_iter();
        let Some(headers) = records.next() else {
            return json!({ "error": format!("{} is empty", file.path) });
        };

        let mut row_count = 0usize;
        let mut rows = Vec::new();
        for fields in records {
            row_count += 1;
            if rows.len() < limit {
                let record: Map<String, Value> = headers
                    .iter()
                    .cloned()
                    .zip(fields.into_iter().map(Value::String))
                    .collect();
                rows.push(Value::Object(record));
            }
        }
        debug!(path = %file.path, row_count, "Summarized Apollo export");

        json!({
            "path": file.path,
            "headers": headers,
            "row_count": row_count,
            "rows": rows,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    search_url: Option<String>,
    #[serde(default)]
    title_category: Option<String>,
    #[serde(default)]
    page: Option<u32>,
}

#[async_trait]
impl Tool for ApolloProcessTool {
    fn name(&self) -> &str {
        "apollo_process"
    }

    fn description(&self) -> &str {
        "Summarize an Apollo CSV export in the workspace and/or build an Apollo people search URL from a company list URL."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Workspace path of an Apollo CSV export" },
                "limit": { "type": "integer", "description": "Rows to return from the export (default 10)" },
                "search_url": { "type": "string", "description": "Apollo URL containing an organization search list id" },
                "title_category": {
                    "type": "string",
                    "description": "Job title band: c_suite, vp_level, director_level, head_level, founders (default: priority titles)"
                },
                "page": { "type": "integer", "description": "Result page for the people search (default 1)" }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;
        if args.path.is_none() && args.search_url.is_none() {
            return Err(ToolError::InvalidArguments(
                "apollo_process needs 'path' or 'search_url'".into(),
            ));
        }

        let mut out = Map::new();
        out.insert("tool".into(), json!("apollo_process"));
        let mut errors = Vec::new();

        if let Some(path) = &args.path {
            let limit = args.limit.unwrap_or(DEFAULT_ROW_LIMIT).min(MAX_ROW_LIMIT);
            let export = self.summarize_export(path, limit).await;
            if let Some(error) = export.get("error").and_then(Value::as_str) {
                errors.push(error.to_string());
            }
            out.insert("export".into(), export);
        }

        if let Some(url) = &args.search_url {
            match extract_search_id(url) {
                Some(search_id) => {
                    let category = args.title_category.as_deref().unwrap_or("priority");
                    let titles = titles_for(category);
                    out.insert(
                        "people_search".into(),
                        json!({
                            "search_id": search_id,
                            "title_category": category,
                            "job_titles": titles,
                            "url": build_people_url(&search_id, titles, args.page.unwrap_or(1).max(1)),
                        }),
                    );
                }
                None => {
                    warn!(url, "No Apollo search id in URL");
                    errors.push(format!("No search list id found in URL: {url}"));
                }
            }
        }

        out.insert("success".into(), json!(errors.is_empty()));
        if !errors.is_empty() {
            out.insert("error".into(), json!(errors.join("; ")));
        }
        Ok(Value::Object(out))
    }
}
