//! Sign-in, sign-out and session inspection.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::config;
use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login {
        /// Account email (defaults to the configured `email`)
        email: Option<String>,

        /// Account password
        #[arg(short, long, env = "ZIGMA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Start an OAuth sign-in and print the provider URL
    Oauth {
        /// Identity provider
        #[arg(short, long, default_value = "google")]
        provider: String,

        /// Where the provider sends the browser back to
        #[arg(long)]
        redirect_to: Option<String>,
    },

    /// Sign out of the current session
    Logout,

    /// Show the current session, role and permissions
    Whoami,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SessionInfo {
    pub status: String,
    pub loading: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub permissions: Option<BTreeMap<String, bool>>,
    pub default_route: String,
}

impl SessionInfo {
    fn granted(&self) -> Vec<&str> {
        self.permissions
            .iter()
            .flatten()
            .filter(|(_, granted)| **granted)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct OAuthRedirect {
    provider: String,
    url: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct OAuthBody<'a> {
    provider: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to: Option<&'a str>,
}

pub async fn execute(cmd: AuthCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let Some(email) = email.or_else(|| config::load_value("email")) else {
                anyhow::bail!("No email given and none configured (zigma config set email ...)");
            };
            let session: SessionInfo = client
                .post(
                    "/api/auth/login",
                    &LoginBody {
                        email: &email,
                        password: &password,
                    },
                )
                .await?;

            match format {
                OutputFormat::Table => {
                    let role = session.role.as_deref().unwrap_or("unresolved");
                    output::print_success(&format!("Signed in as {} ({})", email, role));
                    output::print_detail("Home", &session.default_route);
                }
                _ => output::print_item(&session, format),
            }
        }

        AuthCommands::Oauth {
            provider,
            redirect_to,
        } => {
            let redirect: OAuthRedirect = client
                .post(
                    "/api/auth/oauth",
                    &OAuthBody {
                        provider: &provider,
                        redirect_to: redirect_to.as_deref(),
                    },
                )
                .await?;

            match format {
                OutputFormat::Table => {
                    output::print_info(&format!(
                        "Continue the {} sign-in in your browser:",
                        redirect.provider
                    ));
                    println!("{}", redirect.url);
                }
                _ => output::print_item(&redirect, format),
            }
        }

        AuthCommands::Logout => {
            let session: SessionInfo = client
                .post("/api/auth/logout", &serde_json::json!({}))
                .await?;
            match format {
                OutputFormat::Table => output::print_success("Signed out"),
                _ => output::print_item(&session, format),
            }
        }

        AuthCommands::Whoami => {
            let session: SessionInfo = client.get("/api/session").await?;
            match format {
                OutputFormat::Table => print_session(&session),
                _ => output::print_item(&session, format),
            }
        }
    }

    Ok(())
}

fn print_session(session: &SessionInfo) {
    output::print_header("Session");
    output::print_detail("Status", &session.status);
    if session.loading {
        output::print_info("Session is still resolving");
        return;
    }
    if let Some(email) = &session.email {
        output::print_detail("Email", email);
    }
    if let Some(user_id) = &session.user_id {
        output::print_detail("User ID", user_id);
    }
    output::print_detail("Role", session.role.as_deref().unwrap_or("-"));
    output::print_detail("Home", &session.default_route);

    let granted = session.granted();
    if !granted.is_empty() {
        output::print_header("Permissions");
        for name in granted {
            println!("  {}", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granted_lists_only_true_entries() {
        let session: SessionInfo = serde_json::from_value(serde_json::json!({
            "status": "authenticated",
            "loading": false,
            "user_id": "user-3",
            "email": "investor@zigma.io",
            "role": "investor",
            "permissions": {
                "viewInvestorPortal": true,
                "downloadStatements": true,
                "manageUsers": false
            },
            "default_route": "/investor/dashboard"
        }))
        .unwrap();

        assert_eq!(
            session.granted(),
            vec!["downloadStatements", "viewInvestorPortal"]
        );
    }
}
