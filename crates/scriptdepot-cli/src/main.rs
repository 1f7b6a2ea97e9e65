//! scriptdepot CLI
//!
//! Command-line access to a running scriptdepot server.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use scriptdepot_auth::Signer;
use scriptdepot_cli::DepotClient;
use scriptdepot_core::tracing_init::init_stderr_tracing;
use scriptdepot_server::model::ScriptKind;
use scriptdepot_server::service::{
    CreateScriptRequest, DeleteScriptRequest, ProjectRequest, RestoreProjectRequest,
    UpdateScriptRequest, ValidateScriptRequest,
};

#[derive(Parser, Debug)]
#[command(name = "scriptdepot")]
#[command(version, about = "scriptdepot CLI - signed access to a script depot", long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "SCRIPTDEPOT_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Shared HMAC secret used to sign requests
    #[arg(long, env = "SCRIPTDEPOT_HMAC_SECRET", hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Script source: inline text or a file.
#[derive(clap::Args, Debug)]
struct Source {
    /// Script content
    #[arg(long, conflicts_with = "file")]
    content: Option<String>,

    /// Read script content from a file
    #[arg(long)]
    file: Option<PathBuf>,
}

impl Source {
    async fn read(self) -> anyhow::Result<String> {
        match (self.content, self.file) {
            (Some(content), _) => Ok(content),
            (None, Some(path)) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display())),
            (None, None) => anyhow::bail!("Provide --content or --file"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a timestamp and signature for a request body, for use with curl
    Sign {
        /// Exact body bytes to sign (empty for body-less requests)
        #[arg(long, default_value = "")]
        body: String,
    },
    #[command(flatten)]
    Remote(RemoteCommand),
}

/// Commands that talk to the server.
#[derive(Subcommand, Debug)]
enum RemoteCommand {
    /// Create a script
    Create {
        name: String,
        #[command(flatten)]
        source: Source,
        /// lua or luau
        #[arg(long, default_value = "lua")]
        script_type: ScriptKind,
        #[arg(short, long)]
        project: Option<String>,
    },
    /// List scripts in a project, most recently updated first
    List {
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Replace a script's content
    Update {
        name: String,
        #[command(flatten)]
        source: Source,
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Delete a script
    Delete {
        name: String,
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Show project metadata and statistics
    Status {
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Lint a script without storing it
    Validate {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value = "lua")]
        script_type: ScriptKind,
    },
    /// Snapshot a project
    Backup {
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Restore missing scripts from a snapshot
    Restore {
        #[arg(short, long)]
        project: String,
        /// Snapshot location relative to the server's backup directory (default: latest)
        #[arg(long)]
        backup_path: Option<String>,
    },
    /// Check server health
    Health,
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_stderr_tracing("scriptdepot_cli=warn");

    match cli.command {
        Command::Sign { body } => {
            let secret = cli
                .secret
                .as_deref()
                .context("--secret or SCRIPTDEPOT_HMAC_SECRET is required to sign")?;
            let (timestamp, signature) = Signer::new(secret.as_bytes()).sign_now(body.as_bytes());
            print_json(&json!({ "timestamp": timestamp, "signature": signature }))
        }
        Command::Remote(command) => {
            let client = DepotClient::new(&cli.url, cli.secret.as_deref())?;
            run(&client, command).await
        }
    }
}

async fn run(client: &DepotClient, command: RemoteCommand) -> anyhow::Result<()> {
    match command {
        RemoteCommand::Create {
            name,
            source,
            script_type,
            project,
        } => {
            let req = CreateScriptRequest {
                name,
                content: source.read().await?,
                script_type: Some(script_type),
                project_id: project,
            };
            print_json(&client.create_script(&req).await?)
        }
        RemoteCommand::List { project } => {
            print_json(&client.list_scripts(project.as_deref()).await?)
        }
        RemoteCommand::Update {
            name,
            source,
            project,
        } => {
            let req = UpdateScriptRequest {
                name,
                content: source.read().await?,
                project_id: project,
            };
            print_json(&client.update_script(&req).await?)
        }
        RemoteCommand::Delete { name, project } => {
            let req = DeleteScriptRequest {
                name,
                project_id: project,
            };
            print_json(&client.delete_script(&req).await?)
        }
        RemoteCommand::Status { project } => {
            print_json(&client.project_status(project.as_deref()).await?)
        }
        RemoteCommand::Validate {
            source,
            script_type,
        } => {
            let req = ValidateScriptRequest {
                content: Some(source.read().await?),
                script_type: Some(script_type),
            };
            print_json(&client.validate_script(&req).await?)
        }
        RemoteCommand::Backup { project } => {
            let req = ProjectRequest {
                project_id: project,
            };
            print_json(&client.backup_project(&req).await?)
        }
        RemoteCommand::Restore {
            project,
            backup_path,
        } => {
            let req = RestoreProjectRequest {
                project_id: Some(project),
                backup_path,
            };
            print_json(&client.restore_project(&req).await?)
        }
        RemoteCommand::Health => print_json(&client.health().await?),
    }
}
