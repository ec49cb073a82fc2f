//! CLI commands

use anyhow::{Context, Result, bail};
use campus_client::{ApiRequest, CampusClient};
use clap::Subcommand;
use serde_json::Value;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the credential pair
    Login {
        /// Account e-mail
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long, env = "CAMPUS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Revoke the session and forget stored credentials
    Logout,

    /// Show whether credentials are stored
    Status,

    /// Exchange the stored refresh token for a new access token
    Refresh,

    /// Show the current user's profile
    Profile,

    /// List institutions accepted at registration
    Institutions,

    /// Send an arbitrary request to the API
    Request {
        /// HTTP method
        #[arg(default_value = "GET")]
        method: String,

        /// Endpoint relative to the base URL, e.g. `community/events/`
        endpoint: String,

        /// JSON request body
        #[arg(long)]
        json: Option<String>,

        /// Fail on 401 instead of refreshing the access token
        #[arg(long)]
        no_refresh: bool,
    },
}

impl Commands {
    pub async fn execute(self, client: &CampusClient) -> Result<()> {
        match self {
            Self::Login { email, password } => {
                let response = client.login(email, password).await?;
                info!("Login successful");
                if let Some(user) = response.user {
                    print_json(&user)?;
                }
                Ok(())
            }
            Self::Logout => {
                client.logout().await?;
                println!("Logged out");
                Ok(())
            }
            Self::Status => {
                let session = client.session();
                let access = session.access_token().await?.is_some();
                let refresh = session.refresh_token().await?.is_some();
                println!("API:           {}", client.base_url());
                println!("Access token:  {}", if access { "stored" } else { "none" });
                println!("Refresh token: {}", if refresh { "stored" } else { "none" });
                Ok(())
            }
            Self::Refresh => {
                client.refresh_access_token().await?;
                println!("Access token refreshed");
                Ok(())
            }
            Self::Profile => print_json(&client.profile().await?),
            Self::Institutions => {
                for institution in client.institutions().await? {
                    println!(
                        "{:>5}  {}  ({})",
                        institution.id, institution.name, institution.domain
                    );
                }
                Ok(())
            }
            Self::Request {
                method,
                endpoint,
                json,
                no_refresh,
            } => {
                let request = build_request(&method, endpoint, json.as_deref(), no_refresh)?;
                let response: Value = client.send(request).await?;
                print_json(&response)
            }
        }
    }
}

fn build_request(
    method: &str,
    endpoint: String,
    json: Option<&str>,
    no_refresh: bool,
) -> Result<ApiRequest> {
    let method = method
        .to_uppercase()
        .parse()
        .with_context(|| format!("Invalid HTTP method: {method}"))?;

    if endpoint.starts_with('/') {
        bail!("Endpoint must be relative to the base URL: {endpoint}");
    }

    let mut request = ApiRequest::new(method, endpoint);
    if let Some(body) = json {
        let body: Value = serde_json::from_str(body).context("Invalid JSON body")?;
        request = request.json(&body)?;
    }
    if no_refresh {
        request = request.without_refresh();
    }
    Ok(request)
}

fn print_json(value: &Value) -> Result<()> {
    if !value.is_null() {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}
