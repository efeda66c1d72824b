//! Sidebar menu for the signed-in user.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct NavigationItem {
    name: String,
    href: String,
    icon: String,
    #[serde(default)]
    required_permission: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct NavigationRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path")]
    href: String,
    #[tabled(rename = "Requires")]
    requires: String,
}

impl From<NavigationItem> for NavigationRow {
    fn from(item: NavigationItem) -> Self {
        Self {
            name: item.name,
            href: item.href,
            requires: item.required_permission.unwrap_or_else(|| "-".into()),
        }
    }
}

pub async fn execute(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let items: Vec<NavigationItem> = client.get("/api/navigation").await?;

    match format {
        OutputFormat::Table => {
            let rows: Vec<NavigationRow> = items.into_iter().map(NavigationRow::from).collect();
            output::print_list(&rows, format);
        }
        _ => output::print_item(&items, format),
    }

    Ok(())
}
