//! `/fs/*`: direct access to the sandboxed workspace.
//!
//! Every route answers `200` with `{ok: true, ...}` or `{ok: false, error}`,
//! including paths that escape the workspace.

use crate::SharedState;
use axum::extract::{Query, State};
use axum::response::Json;
use scout_tools::workspace::{
    Created, EditReceipt, FileContent, FileEntry, Listing, Removal, SearchReport, WriteReceipt,
};
use scout_tools::FsResponse;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub include_hidden: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteBody {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub append: bool,
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
    pub path: String,
    pub old_text: String,
    pub new_text: String,
}

#[derive(Debug, Deserialize)]
pub struct MkdirBody {
    pub path: String,
}

pub async fn list_handler(State(state): State<SharedState>, Query(q): Query<PathQuery>) -> Json<FsResponse<Listing>> {
    Json(state.workspace.list_files(&q.path, q.include_hidden).await.into())
}

pub async fn read_handler(
    State(state): State<SharedState>,
    Query(q): Query<PathQuery>,
) -> Json<FsResponse<FileContent>> {
    Json(state.workspace.read_file(&q.path).await.into())
}

pub async fn write_handler(
    State(state): State<SharedState>,
    Json(body): Json<WriteBody>,
) -> Json<FsResponse<WriteReceipt>> {
    Json(state.workspace.write_file(&body.path, &body.content, body.append).await.into())
}

pub async fn edit_handler(
    State(state): State<SharedState>,
    Json(body): Json<EditBody>,
) -> Json<FsResponse<EditReceipt>> {
    Json(
        state
            .workspace
            .edit_file(&body.path, &body.old_text, &body.new_text)
            .await
            .into(),
    )
}

pub async fn search_handler(
    State(state): State<SharedState>,
    Query(q): Query<SearchQuery>,
) -> Json<FsResponse<SearchReport>> {
    Json(state.workspace.search_files(&q.query, &q.path).await.into())
}

pub async fn info_handler(State(state): State<SharedState>, Query(q): Query<PathQuery>) -> Json<FsResponse<FileEntry>> {
    Json(state.workspace.file_info(&q.path).await.into())
}

pub async fn delete_handler(State(state): State<SharedState>, Query(q): Query<PathQuery>) -> Json<FsResponse<Removal>> {
    Json(state.workspace.delete(&q.path).await.into())
}

pub async fn mkdir_handler(State(state): State<SharedState>, Json(body): Json<MkdirBody>) -> Json<FsResponse<Created>> {
    Json(state.workspace.create_directory(&body.path).await.into())
}

#[cfg(test)]
mod tests {
    use crate::build_router;
    use crate::tests::{body_json, test_state};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> Value {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        body_json(app.clone().oneshot(req).await.unwrap()).await
    }

    #[tokio::test]
    async fn write_read_edit_round_trip() {
        let dir = TempDir::new().unwrap();
        let app = build_router(test_state(&dir, &["unused"]));

        let w = call(&app, "POST", "/fs/write", Some(json!({"path": "output/note.md", "content": "hello world"}))).await;
        assert_eq!(w["ok"], true);
        assert_eq!(w["size"], 11);

        let e = call(
            &app,
            "POST",
            "/fs/edit",
            Some(json!({"path": "output/note.md", "old_text": "world", "new_text": "scout"})),
        )
        .await;
        assert_eq!(e["replacements"], 1);

        let r = call(&app, "GET", "/fs/read?path=output/note.md", None).await;
        assert_eq!(r["ok"], true);
        assert_eq!(r["content"], "hello scout");
    }

    #[tokio::test]
    async fn listing_search_and_info() {
        let dir = TempDir::new().unwrap();
        let app = build_router(test_state(&dir, &["unused"]));
        call(&app, "POST", "/fs/write", Some(json!({"path": "knowledge_base/acme.md", "content": "Acme case study"}))).await;

        let list = call(&app, "GET", "/fs/list?path=knowledge_base", None).await;
        assert_eq!(list["total_files"], 1);
        assert_eq!(list["files"][0]["name"], "acme.md");

        let search = call(&app, "GET", "/fs/search?query=case%20study", None).await;
        assert_eq!(search["ok"], true);
        assert!(search["total_matches"].as_u64().unwrap() >= 1);

        let info = call(&app, "GET", "/fs/info?path=knowledge_base/acme.md", None).await;
        assert_eq!(info["type"], "file");
    }

    #[tokio::test]
    async fn mkdir_then_delete() {
        let dir = TempDir::new().unwrap();
        let app = build_router(test_state(&dir, &["unused"]));

        let made = call(&app, "POST", "/fs/mkdir", Some(json!({"path": "output/reports"}))).await;
        assert_eq!(made["ok"], true);
        assert!(dir.path().join("output/reports").is_dir());

        let gone = call(&app, "DELETE", "/fs/delete?path=output/reports", None).await;
        assert_eq!(gone["ok"], true);
        assert!(!dir.path().join("output/reports").exists());
    }

    #[tokio::test]
    async fn escaping_paths_are_refused_not_errors() {
        let dir = TempDir::new().unwrap();
        let app = build_router(test_state(&dir, &["unused"]));

        let r = call(&app, "GET", "/fs/read?path=../../etc/passwd", None).await;
        assert_eq!(r["ok"], false);
        assert!(r["error"].is_string());
    }
}
