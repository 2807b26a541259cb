//! Email drafting tool: saves a markdown draft and optionally sends it.

use async_trait::async_trait;
use chrono::{Local, Utc};
use scout_core::error::ToolError;
use scout_core::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::email::Mailer;
use crate::workspace::Workspace;

pub struct EmailWriteTool {
    workspace: Arc<Workspace>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl EmailWriteTool {
    pub fn new(workspace: Arc<Workspace>, mailer: Option<Arc<dyn Mailer>>) -> Self {
        Self { workspace, mailer }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Args {
    subject: String,
    content: String,
    #[serde(default)]
    to_email: String,
    #[serde(default)]
    path: String,
    /// Defaults to sending whenever a recipient is given.
    #[serde(default)]
    send: Option<bool>,
}

/// Subject reduced to a filename-safe slug.
pub fn safe_subject(subject: &str) -> String {
    let kept: String = subject
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim_end()
        .replace(' ', "_")
        .to_lowercase()
        .chars()
        .take(50)
        .collect()
}

pub fn render_draft(to_email: &str, subject: &str, content: &str, created: &str) -> String {
    let to = if to_email.is_empty() { "[Recipient Email]" } else { to_email };
    format!(
        "# Email Draft\n\n**To:** {to}\n**Subject:** {subject}\n\n---\n\n{content}\n\n---\n*Draft created: {created}*\n"
    )
}

#[async_trait]
impl Tool for EmailWriteTool {
    fn name(&self) -> &str {
        "email_write"
    }

    fn description(&self) -> &str {
        "Write an email draft to output/emails and, when a recipient is given, send it."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "subject": { "type": "string", "description": "Email subject line" },
                "content": { "type": "string", "description": "Email body" },
                "to_email": { "type": "string", "description": "Recipient address (optional)" },
                "path": { "type": "string", "description": "Workspace path for the draft (optional)" },
                "send": { "type": "boolean", "description": "Send the email when a recipient is given (default true)" }
            },
            "required": ["subject", "content"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Args = crate::parse_args(arguments)?;

        let path = if args.path.is_empty() {
            format!(
                "output/emails/email_{}_{}.md",
                safe_subject(&args.subject),
                Utc::now().timestamp()
            )
        } else {
            args.path.clone()
        };
        let draft = render_draft(
            &args.to_email,
            &args.subject,
            &args.content,
            &Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );

        let receipt = match self.workspace.write_file(&path, &draft, false).await {
            Ok(receipt) => receipt,
            Err(e) => {
                return Ok(json!({
                    "tool": "email_write",
                    "subject": args.subject,
                    "error": format!("Error creating email draft: {e}"),
                }));
            }
        };

        let recipient = args.to_email.trim();
        let wants_send = args.send.unwrap_or(true) && !recipient.is_empty();

        let (status, message) = if !wants_send {
            (
                "draft_created",
                format!("Email draft created at {}. Ready for preview and sending.", receipt.path),
            )
        } else {
            let outcome = match &self.mailer {
                Some(mailer) => mailer.send(recipient, &args.subject, &args.content).await.map_err(|e| e.to_string()),
                None => Err("email delivery is not configured".to_string()),
            };
            match outcome {
                Ok(()) => (
                    "sent",
                    format!("Email sent successfully to {recipient} and draft saved at {}.", receipt.path),
                ),
                Err(e) => {
                    warn!(to = recipient, error = %e, "Email send failed");
                    (
                        "draft_created_send_failed",
                        format!("Email draft created at {} but sending failed: {e}", receipt.path),
                    )
                }
            }
        };

        Ok(json!({
            "tool": "email_write",
            "path": receipt.path,
            "subject": args.subject,
            "to_email": args.to_email,
            "content": args.content,
            "preview_content": draft,
            "size": receipt.size,
            "status": status,
            "message": message,
        }))
    }
}
