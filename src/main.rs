use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use futures::StreamExt;
use futures::stream::BoxStream;
use iocraft::prelude::*;
use pshare::{
    ChunkedTransport, DEFAULT_CHUNK_SIZE, ShareClient, SingleShotTransport, UploadError,
    UploadEvent, UploadFile, UploadTransport,
};
use serde_json::Value;
use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::ui::{
    ConfigHeader, EntryDetails, ErrorMessage, InputPrompt, ProgressBar, SuccessMessage,
};

mod config;
mod expiration;
mod ui;

const DEFAULT_BASE_URL: &str = "http://localhost:4001";

#[derive(Parser)]
#[command(name = "pshare")]
#[command(version)]
#[command(about = "Upload and manage files on a self-hosted share server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FileArgs {
    /// File to upload
    #[arg(value_hint = ValueHint::FilePath)]
    file: PathBuf,
    /// Name to store the file under (defaults to the file's own name)
    #[arg(long)]
    name: Option<String>,
    /// MIME type to declare (guessed from the extension by default)
    #[arg(long)]
    content_type: Option<String>,
}

#[derive(Args)]
struct ExpirationArgs {
    /// How long the file stays available, e.g. 7d, 12h or never
    #[arg(long, conflicts_with = "expires_at")]
    expires_in: Option<String>,
    /// Exact expiration time in RFC 3339, e.g. 2030-01-02T03:04:25Z
    #[arg(long)]
    expires_at: Option<String>,
}

impl ExpirationArgs {
    fn is_empty(&self) -> bool {
        self.expires_in.is_none() && self.expires_at.is_none()
    }

    fn resolve(&self, default: Option<&str>) -> Result<String> {
        expiration::resolve(
            self.expires_at.as_deref(),
            self.expires_in.as_deref(),
            default,
        )
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TransportKind {
    /// Bounded chunks, one request each
    Chunked,
    /// One request with byte-level progress
    SingleShot,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file
    Upload {
        #[command(flatten)]
        file: FileArgs,
        /// Note shown alongside the file
        #[arg(short, long)]
        note: Option<String>,
        #[command(flatten)]
        expiration: ExpirationArgs,
        /// How to send the file
        #[arg(short, long, value_enum, default_value_t = TransportKind::Chunked)]
        transport: TransportKind,
        /// Chunk size in bytes for chunked uploads
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
    },
    /// Upload a file through a guest link
    GuestUpload {
        /// Guest link ID
        guest_link_id: String,
        #[command(flatten)]
        file: FileArgs,
        #[command(flatten)]
        expiration: ExpirationArgs,
    },
    /// Edit an uploaded file's name, note or expiration
    Edit {
        id: String,
        /// New file name
        #[arg(short, long)]
        filename: String,
        /// New note (an empty note clears it)
        #[arg(short, long, default_value = "")]
        note: String,
        #[command(flatten)]
        expiration: ExpirationArgs,
    },
    /// Delete an uploaded file
    Delete { id: String },
    /// Configure pshare interactively
    Config,
    /// Store your session cookie (name=value) in the OS keyring
    SetSession { cookie: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            element!(ErrorMessage(message: format!("{e:#}"))).print();
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let _rt_guard = rt.enter();
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();
    let cli = Cli::parse();

    rt.block_on(async {
        match cli.command {
            Commands::Config => interactive_config(),
            Commands::SetSession { cookie } => config::set_session_keyring(cookie),
            requires_server => {
                let config = config::read_config()?;
                let client =
                    ShareClient::new(config.base_url.clone(), config.session_cookie.as_deref())?;
                let default_expiration = config.default_expiration.as_deref();

                match requires_server {
                    Commands::Upload {
                        file,
                        note,
                        expiration,
                        transport,
                        chunk_size,
                    } => {
                        let expiration = expiration.resolve(default_expiration)?;
                        let transport: Box<dyn UploadTransport> = match transport {
                            TransportKind::Chunked => Box::new(ChunkedTransport::new(chunk_size)?),
                            TransportKind::SingleShot => Box::new(SingleShotTransport),
                        };
                        upload(&client, file, note, &expiration, transport.as_ref()).await
                    }
                    Commands::GuestUpload {
                        guest_link_id,
                        file,
                        expiration,
                    } => {
                        let expiration = expiration.resolve(default_expiration)?;
                        guest_upload(&client, &guest_link_id, file, &expiration).await
                    }
                    Commands::Edit {
                        id,
                        filename,
                        note,
                        expiration,
                    } => {
                        let expiration = if expiration.is_empty() {
                            None
                        } else {
                            Some(expiration.resolve(None)?)
                        };
                        client
                            .edit_file(&id, &filename, expiration.as_deref(), &note)
                            .await?;
                        element!(SuccessMessage(message: format!("Updated {}", id))).print();
                        Ok(())
                    }
                    Commands::Delete { id } => {
                        client.delete_file(&id).await?;
                        element!(SuccessMessage(message: format!("Deleted {}", id))).print();
                        Ok(())
                    }
                    Commands::Config => unreachable!("handled above"),
                    Commands::SetSession { .. } => unreachable!("handled above"),
                }
            }
        }
    })
}

async fn open_file(args: FileArgs) -> Result<UploadFile> {
    let mut file = UploadFile::open(&args.file)
        .await
        .with_context(|| format!("Unable to open {}", args.file.display()))?;
    if let Some(name) = args.name {
        file = file.with_name(name);
    }
    if let Some(content_type) = args.content_type {
        file = file.with_content_type(content_type);
    }
    Ok(file)
}

async fn upload(
    client: &ShareClient,
    file: FileArgs,
    note: Option<String>,
    expiration: &str,
    transport: &dyn UploadTransport,
) -> Result<()> {
    let file = open_file(file).await?;
    let stream = client.upload_file_events(&file, expiration, note.as_deref(), transport);

    match track_upload("Uploading", stream).await? {
        Some(record) => print_entry(&record, &file, expiration),
        // Chunked uploads of empty files never reach the server.
        None => bail!("{} is empty; nothing was uploaded", file.name()),
    }
    Ok(())
}

async fn guest_upload(
    client: &ShareClient,
    guest_link_id: &str,
    file: FileArgs,
    expiration: &str,
) -> Result<()> {
    let file = open_file(file).await?;
    let stream = client.guest_upload_file_events(&file, guest_link_id, expiration);

    let record = track_upload("Uploading as guest", stream)
        .await?
        .context("Upload finished without a response from the server")?;
    print_entry(&record, &file, expiration);
    Ok(())
}

async fn track_upload(
    title: &str,
    mut stream: BoxStream<'_, Result<UploadEvent, UploadError>>,
) -> Result<Option<Value>> {
    let (tx, rx) = watch::channel(0.0);

    let process_stream = async {
        let mut response = None;
        while let Some(event) = stream.next().await {
            match event? {
                UploadEvent::Progress(p) => {
                    let _ = tx.send(p.percent());
                }
                UploadEvent::Complete(r) => {
                    response = Some(r);
                    break;
                }
            }
        }
        Ok::<_, anyhow::Error>(response)
    };

    let mut progress_bar =
        element!(ProgressBar(title: title.to_string(), progress: Some(rx)));

    tokio::select! {
        result = process_stream => result,
        result = progress_bar.render_loop() => {
            result?;
            bail!("Progress display exited before the upload finished")
        }
    }
}

fn print_entry(record: &Value, file: &UploadFile, expiration: &str) {
    let id = match record.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => "<none>".to_string(),
    };
    let filename = record
        .get("filename")
        .and_then(Value::as_str)
        .unwrap_or(file.name())
        .to_string();
    element!(EntryDetails(id: id, filename: filename, expiration: expiration.to_string()))
        .print();
}

fn read_input(prompt: &str, default: Option<&str>, description: Option<&str>) -> Result<String> {
    element! {
        InputPrompt(
            prompt: prompt.to_string(),
            default: default.map(|s| s.to_string()),
            description: description.map(|s| s.to_string())
        )
    }
    .print();

    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();

    if input.is_empty() {
        Ok(default.map(str::to_string).unwrap_or(input))
    } else {
        Ok(input)
    }
}

fn interactive_config() -> Result<()> {
    element!(ConfigHeader()).print();

    let base_url = loop {
        let base_url_str = read_input(
            "Server URL",
            Some(DEFAULT_BASE_URL),
            Some("The base URL of your share server"),
        )?;

        match Url::parse(&base_url_str) {
            Ok(url) => break url,
            Err(e) => {
                element!(ErrorMessage(message: format!("Invalid URL: {}", e))).print();
                println!();
            }
        }
    };

    let default_expiration = loop {
        let lifetime = read_input(
            "Default Expiration",
            Some(expiration::DEFAULT_LIFETIME),
            Some("How long uploads stay available unless overridden, e.g. 7d or never"),
        )?;

        match expiration::resolve(None, Some(&lifetime), None) {
            Ok(_) => break lifetime,
            Err(e) => {
                element!(ErrorMessage(message: e.to_string())).print();
                println!();
            }
        }
    };

    let session_cookie = read_input(
        "Session Cookie",
        None,
        Some("Optional: name=value of a logged-in session, stored in the OS keyring"),
    )?;
    if !session_cookie.is_empty() {
        config::set_session_keyring(session_cookie)?;
    }

    config::write_config(config::ConfigFile {
        base_url: Some(base_url),
        default_expiration: Some(default_expiration),
    })?;

    element!(SuccessMessage(message: "Configuration complete!".to_string())).print();

    Ok(())
}
