//! User management commands (admin only).
//!
//! Provides list and set-role operations on user profiles.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum UserCommands {
    /// List user profiles, newest first
    List {
        /// Match against email or full name
        #[arg(short, long)]
        search: Option<String>,

        /// Only show users with this role (admin, staff, investor)
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Change another user's role
    SetRole {
        /// User ID
        user_id: String,

        /// New role (admin, staff, investor)
        role: String,
    },
}

// ── API response types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
struct Profile {
    id: String,
    email: String,
    #[serde(default)]
    full_name: Option<String>,
    role: String,
    #[serde(default)]
    avatar_url: Option<String>,
    created_at: String,
}

#[derive(Debug, Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Created")]
    created_at: String,
}

impl From<&Profile> for ProfileRow {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id.clone(),
            email: p.email.clone(),
            name: p.full_name.clone().unwrap_or_else(|| "-".into()),
            role: p.role.clone(),
            created_at: p.created_at.clone(),
        }
    }
}

#[derive(Serialize)]
struct ListQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

pub async fn execute(cmd: UserCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        UserCommands::List { search, role } => {
            let query = ListQuery {
                search: search.as_deref(),
                role: role.as_deref(),
            };
            let profiles: Vec<Profile> = client.get_with_query("/api/users", &query).await?;

            match format {
                OutputFormat::Table => {
                    let rows: Vec<ProfileRow> = profiles.iter().map(ProfileRow::from).collect();
                    output::print_list(&rows, format);
                }
                _ => output::print_item(&profiles, format),
            }
        }

        UserCommands::SetRole { user_id, role } => {
            let path = format!("/api/users/{}/role", user_id);
            let profile: Profile = client
                .put(&path, &serde_json::json!({ "role": role }))
                .await?;

            match format {
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "{} is now {}",
                        profile.email, profile.role
                    ));
                }
                _ => output::print_item(&profile, format),
            }
        }
    }

    Ok(())
}
