//! ddddocr MCP Server: entry point.

use std::sync::Arc;
use tokio::sync::Mutex;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use ddddocr_mcp::backends::BackendRegistry;
use ddddocr_mcp::config::resolve_model_dir;
use ddddocr_mcp::protocol::ProtocolHandler;
use ddddocr_mcp::tools::ToolRegistry;
use ddddocr_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "ddddocr-mcp",
    about = "MCP server for ddddocr captcha recognition: text OCR, object detection and slider matching",
    version
)]
struct Cli {
    /// Directory with the ONNX models and charset.
    /// Also reads from DDDDOCR_MODEL_DIR.
    #[arg(short, long)]
    model_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve {
        /// Directory with the ONNX models and charset.
        #[arg(short, long)]
        model_dir: Option<String>,

        /// Log level (trace, debug, info, warn, error).
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   ddddocr-mcp completions bash > ~/.local/share/bash-completion/completions/ddddocr-mcp
    ///   ddddocr-mcp completions zsh > ~/.zfunc/_ddddocr-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Serve {
        model_dir: None,
        log_level: None,
    });

    let log_level = match &command {
        Commands::Serve {
            log_level: Some(level),
            ..
        } => level.clone(),
        _ => cli.log_level.clone(),
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Serve { model_dir, .. } => {
            let model_dir = resolve_model_dir(model_dir.or(cli.model_dir).as_deref());
            tracing::info!("ddddocr MCP server starting");
            let backends = Arc::new(Mutex::new(BackendRegistry::with_model_dir(&model_dir)));
            let handler = ProtocolHandler::new(backends);
            let transport = StdioTransport::new(handler);
            transport.run().await?;
        }

        Commands::Info => {
            let capabilities = ddddocr_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "model_dir": resolve_model_dir(cli.model_dir.as_deref()),
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "ddddocr-mcp", &mut std::io::stdout());
        }

        Commands::Repl => {
            let model_dir = resolve_model_dir(cli.model_dir.as_deref());
            ddddocr_mcp::repl::run(&model_dir).await?;
        }
    }

    Ok(())
}
