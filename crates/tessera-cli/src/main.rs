//! tessera: drive the file tools against a local directory.
//!
//! The directory is mounted as a sandbox session, so every call goes through
//! the same dispatch, repair and transform path an agent turn uses.
//!
//! Usage:
//!   tessera --root ./site tools --mode ask
//!   tessera --root ./site list /app
//!   tessera --root ./site read /app/page.tsx /public/logo.png
//!   tessera --root ./site create /app/about/page.tsx --from about.tsx
//!   tessera --root ./site call list_files '{"path": "/"}'
//!   tessera transform app/layout.tsx --entry

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tessera_kernel::{
    ApplyDiffRequest, ApplyDiffResponse, ChatMode, ContentTransformer, DiffApplier, Identity,
    LlmError, LlmResult, LocalBackend, MemoryQuotaGate, ProviderContext, SessionRegistry,
    StructuredGenerator, TesseraConfig, ToolInvocation, ToolRuntime, Turn, TurnRequest,
};

const SESSION_ID: &str = "local";

#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(about = "Agent file tools over a local directory")]
struct Args {
    /// Config file (TOML)
    #[arg(long, env = "TESSERA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory mounted as the session root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Refuse writes
    #[arg(long)]
    read_only: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tool definitions offered in a mode
    Tools {
        #[arg(long, value_enum, default_value_t = Mode::Edit)]
        mode: Mode,
    },
    /// List a directory
    List {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Read one or more files
    Read {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Create a file
    Create {
        path: String,
        /// Literal content
        #[arg(long, conflicts_with = "from")]
        content: Option<String>,
        /// Take content from a local file
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Invoke a tool by name with raw JSON arguments
    Call {
        name: String,
        #[arg(default_value = "{}")]
        arguments: String,
    },
    /// Run the transformer over a local file and print the result
    Transform {
        file: PathBuf,
        /// Treat the file as the root layout regardless of its path
        #[arg(long)]
        entry: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Ask,
    Create,
    Edit,
}

impl From<Mode> for ChatMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Ask => ChatMode::Ask,
            Mode::Create => ChatMode::Create,
            Mode::Edit => ChatMode::Edit,
        }
    }
}

/// Edits need the remote diff service, which the CLI does not have.
struct NoDiffService;

#[async_trait]
impl DiffApplier for NoDiffService {
    async fn apply_diff(&self, _request: ApplyDiffRequest) -> Result<ApplyDiffResponse> {
        bail!("no diff service configured")
    }
}

/// Malformed arguments are reported, not repaired.
struct NoGenerator;

#[async_trait]
impl StructuredGenerator for NoGenerator {
    async fn generate_structured(&self, _schema: &Value, _prompt: &str) -> LlmResult<Value> {
        Err(LlmError::Unavailable("no model configured".into()))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = TesseraConfig::load_or_default(args.config.as_deref())
        .context("failed to load config")?;

    if let Command::Transform { file, entry } = &args.command {
        return transform(config, file, *entry).await;
    }

    let mut backend = LocalBackend::new(&args.root);
    backend.set_read_only(args.read_only);
    tracing::info!(root = %backend.root().display(), read_only = args.read_only, "mounting session");

    let registry = Arc::new(SessionRegistry::new());
    registry.mount(SESSION_ID, Arc::new(backend));

    let runtime = ToolRuntime::new(
        config,
        registry,
        Arc::new(NoDiffService),
        Arc::new(NoGenerator),
        Arc::new(MemoryQuotaGate::unlimited()),
    );

    let mode = match &args.command {
        Command::Tools { mode } => (*mode).into(),
        Command::List { .. } | Command::Read { .. } => ChatMode::Ask,
        _ => ChatMode::Create,
    };
    let turn = runtime
        .begin_turn(TurnRequest {
            identity: Some(Identity::new(whoami())),
            mode,
            provider: ProviderContext::for_session(Some(SESSION_ID)),
        })
        .await?;

    let output = match args.command {
        Command::Tools { .. } => serde_json::to_value(turn.definitions())?,
        Command::List { path } => invoke(&turn, "list_files", json!({ "path": path })).await?,
        Command::Read { paths } => invoke(&turn, "read_files", json!({ "paths": paths })).await?,
        Command::Create {
            path,
            content,
            from,
        } => {
            let content = match (content, from) {
                (Some(content), _) => content,
                (None, Some(from)) => tokio::fs::read_to_string(&from)
                    .await
                    .with_context(|| format!("failed to read {}", from.display()))?,
                (None, None) => bail!("create needs --content or --from"),
            };
            invoke(&turn, "create_file", json!({ "path": path, "content": content })).await?
        }
        Command::Call { name, arguments } => {
            let output = turn
                .call(ToolInvocation::new("cli-0", name, arguments))
                .await?;
            output.to_json()
        }
        Command::Transform { .. } => bail!("transform does not run inside a turn"),
    };

    turn.finish().await;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn invoke(turn: &Turn, name: &str, arguments: Value) -> Result<Value> {
    let output = turn
        .call(ToolInvocation::new("cli-0", name, arguments.to_string()))
        .await?;
    Ok(output.to_json())
}

async fn transform(config: TesseraConfig, file: &Path, entry: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let transformer = ContentTransformer::from_config(config.transform);
    let path = file.to_string_lossy();
    let is_entry = entry || transformer.is_entry_file(&path);

    let result = transformer.transform(&path, &content, is_entry).await?;
    if !result.modified {
        tracing::info!(file = %path, "no ids inserted");
    }
    print!("{}", result.new_content);
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER").unwrap_or_else(|_| "local".to_string())
}
