//! Ask the server what navigating to a path would do for the current session.

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct AccessArgs {
    /// Paths to check, e.g. /users /investors/42
    #[arg(required = true)]
    paths: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct AccessReport {
    path: String,
    outcome: String,
    #[serde(default)]
    page: Option<String>,
    #[serde(default)]
    redirect_to: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct AccessRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Page")]
    page: String,
    #[tabled(rename = "Redirect")]
    redirect_to: String,
}

impl From<&AccessReport> for AccessRow {
    fn from(report: &AccessReport) -> Self {
        Self {
            path: report.path.clone(),
            outcome: report.outcome.clone(),
            page: report.page.clone().unwrap_or_else(|| "-".into()),
            redirect_to: report.redirect_to.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

pub async fn execute(args: AccessArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let mut reports = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        let report: AccessReport = client
            .get_with_query("/api/access", &[("path", path.as_str())])
            .await?;
        reports.push(report);
    }

    match format {
        OutputFormat::Table => {
            let rows: Vec<AccessRow> = reports.iter().map(AccessRow::from).collect();
            output::print_list(&rows, format);
        }
        _ => output::print_item(&reports, format),
    }

    Ok(())
}
