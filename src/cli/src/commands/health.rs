//! Health check command.
//!
//! Queries the `/health` endpoint and shows the server's session status.

use anyhow::Result;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

pub async fn execute(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: serde_json::Value = client.get_raw("/health").await?;

    match format {
        OutputFormat::Table => {
            let field = |key: &str| health.get(key).and_then(|v| v.as_str());
            let status = field("status").unwrap_or("unknown");

            output::print_header("Server Health");
            output::print_detail("Status", status);
            output::print_detail("API URL", client.base_url());
            if let Some(version) = field("version") {
                output::print_detail("Version", version);
            }
            if let Some(session) = field("session") {
                output::print_detail("Session", session);
            }
            if let Some(ts) = field("timestamp") {
                output::print_detail("Timestamp", ts);
            }

            if status == "healthy" {
                output::print_success("Server is up");
            } else {
                output::print_error(&format!("Server status: {}", status));
            }
        }
        _ => output::print_item(&health, format),
    }

    Ok(())
}
