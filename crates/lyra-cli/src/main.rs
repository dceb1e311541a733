//! Lyra CLI: account commands and document upload.
//!
//! Reads LYRA_API_URL and the other settings from the environment (or
//! `.env`). Uploads authenticate with --token / LYRA_ID_TOKEN or by signing in
//! with --email and --password; the account commands also need
//! COGNITO_CLIENT_ID.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lyra_api_client::ApiClient;
use lyra_auth::{CognitoSessionProvider, SessionProvider, SignUpOutcome, StaticSessionProvider};
use lyra_cli::{init_tracing, render_progress, ConsoleNotifier};
use lyra_core::{ClientConfig, Department, SelectedFile, Visibility};
use lyra_upload::{FormField, UploadController};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "lyra", about = "Lyra document upload client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Confirm a registration with the emailed code
    Confirm {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },
    /// Send the confirmation code again
    ResendCode {
        #[arg(long)]
        email: String,
    },
    /// Check credentials by signing in
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in, then revoke every session of the account
    SignOut {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Upload a document
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Document title (defaults to the file name without extension)
        #[arg(long)]
        title: Option<String>,
        /// engineering, finance, marketing, sales, hr, legal or operations
        #[arg(long)]
        department: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// public, team-only or private
        #[arg(long)]
        visibility: Option<String>,
        /// Pre-issued identity token (falls back to LYRA_ID_TOKEN)
        #[arg(long, conflicts_with_all = ["email", "password"])]
        token: Option<String>,
        #[arg(long, requires = "password")]
        email: Option<String>,
        #[arg(long, requires = "email")]
        password: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn signed_in(
    config: &ClientConfig,
    email: &str,
    password: &str,
) -> anyhow::Result<CognitoSessionProvider> {
    let provider = CognitoSessionProvider::from_config(config).await?;
    provider
        .sign_in(email, password)
        .await
        .with_context(|| format!("Sign in failed for {}", email))?;
    Ok(provider)
}

async fn session_for_upload(
    config: &ClientConfig,
    token: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<Arc<dyn SessionProvider>> {
    if let (Some(email), Some(password)) = (email, password) {
        return Ok(Arc::new(signed_in(config, &email, &password).await?));
    }
    let token = token
        .or_else(|| std::env::var("LYRA_ID_TOKEN").ok())
        .context("Not signed in. Pass --token, set LYRA_ID_TOKEN, or use --email and --password")?;
    Ok(Arc::new(StaticSessionProvider::new(token)))
}

async fn upload(
    config: &ClientConfig,
    file: PathBuf,
    title: Option<String>,
    department: Option<String>,
    tags: Option<String>,
    visibility: Option<String>,
    session: Arc<dyn SessionProvider>,
) -> anyhow::Result<()> {
    let department = department
        .map(|d| d.parse::<Department>())
        .transpose()?;
    let visibility = visibility
        .map(|v| v.parse::<Visibility>())
        .transpose()?;
    let selected = SelectedFile::from_path(&file).await?;

    let api = ApiClient::from_config(config)?;
    let controller = UploadController::new(session, api, Arc::new(ConsoleNotifier));

    controller.open();
    controller.select_file(selected).await;
    if let Some(title) = title {
        controller.update_field(FormField::Title(title)).await;
    }
    controller
        .update_field(FormField::Department(department))
        .await;
    if let Some(tags) = tags {
        controller.update_field(FormField::Tags(tags)).await;
    }
    if let Some(visibility) = visibility {
        controller
            .update_field(FormField::Visibility(visibility))
            .await;
    }

    let mut updates = controller.subscribe();
    let renderer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let line = render_progress(&updates.borrow_and_update());
            eprint!("\r{}", line);
        }
    });

    let result = controller.submit().await;
    renderer.abort();
    eprintln!();

    let stored = result?;
    print_json(&stored)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env().context(
        "Failed to load configuration. Set LYRA_API_URL",
    )?;

    let cli = Cli::parse();

    match cli.command {
        Commands::SignUp { email, password } => {
            let provider = CognitoSessionProvider::from_config(&config).await?;
            match provider.sign_up(&email, &password).await? {
                SignUpOutcome::Complete => {
                    print_json(&serde_json::json!({ "registered": email, "confirmed": true }))?
                }
                SignUpOutcome::ConfirmationRequired { destination } => print_json(
                    &serde_json::json!({
                        "registered": email,
                        "confirmed": false,
                        "code_sent_to": destination,
                    }),
                )?,
            }
        }
        Commands::Confirm { email, code } => {
            let provider = CognitoSessionProvider::from_config(&config).await?;
            provider.confirm_sign_up(&email, &code).await?;
            print_json(&serde_json::json!({ "confirmed": email }))?;
        }
        Commands::ResendCode { email } => {
            let provider = CognitoSessionProvider::from_config(&config).await?;
            provider.resend_sign_up_code(&email).await?;
            print_json(&serde_json::json!({ "code_resent": email }))?;
        }
        Commands::SignIn { email, password } => {
            let provider = signed_in(&config, &email, &password).await?;
            // Printed so the token can be reused via LYRA_ID_TOKEN.
            let token = provider.get_credential().await?;
            print_json(&serde_json::json!({ "signed_in": email, "id_token": token }))?;
        }
        Commands::SignOut { email, password } => {
            let provider = signed_in(&config, &email, &password).await?;
            provider.sign_out().await?;
            print_json(&serde_json::json!({ "signed_out": email }))?;
        }
        Commands::Upload {
            file,
            title,
            department,
            tags,
            visibility,
            token,
            email,
            password,
        } => {
            let session = session_for_upload(&config, token, email, password).await?;
            upload(&config, file, title, department, tags, visibility, session).await?;
        }
    }

    Ok(())
}
