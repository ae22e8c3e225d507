//! LLoms — a terminal chat client for Ollama with MCP tool support.

mod input;
mod style;

use anyhow::{Context, Result};
use input::{InputAction, classify};
use lloms_api::OllamaClient;
use lloms_config::{Config, DEFAULT_CONFIG_PATH};
use lloms_core::{ChatSession, SessionConfig, TurnEvent};
use lloms_mcp::McpClient;
use lloms_types::ToolDispatcher;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ASSISTANT_NAME: &str = "LLoms";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config_path = std::env::var("LLOMS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let backend =
        Arc::new(OllamaClient::new(&config.ollama_url).context("Failed to create chat client")?);

    let mut session = ChatSession::new(
        SessionConfig {
            chat_model: config.chat_model.clone(),
            tools_model: config.tools_model.clone(),
            system_prompt: config.system_prompt.clone(),
            history_window: config.history_window,
            chat_options: config.chat_options(),
            tools_options: config.tools_options(),
        },
        backend,
    )
    .context("Failed to seed the conversation log")?;

    let mcp_client = start_mcp(&config, &mut session).await;

    banner(&config);

    let result = repl(&mut session).await;

    // Release the tool subprocess before reporting the outcome. The session
    // holds the only other handle, so drop it first.
    drop(session);
    if let Some(client) = mcp_client {
        if let Ok(client) = Arc::try_unwrap(client) {
            client.shutdown().await;
        }
    }

    result
}

/// Start the first configured MCP server, if tool integration is enabled.
/// Any failure here degrades to "no tools available"; it never aborts the
/// session.
async fn start_mcp(config: &Config, session: &mut ChatSession) -> Option<Arc<McpClient>> {
    if !config.enable_mcp {
        return None;
    }
    let Some(server) = config.mcp_servers.first() else {
        eprintln!(
            "{}",
            style::notice(
                "MCP enabled but no servers specified in config. Continuing without MCP tools support."
            )
        );
        return None;
    };
    if config.mcp_servers.len() > 1 {
        tracing::warn!(
            "Only the first MCP server ('{}') is launched; ignoring {} more",
            server.name,
            config.mcp_servers.len() - 1
        );
    }

    eprintln!("{}", style::notice("Initializing MCP client..."));
    eprintln!(
        "{}",
        style::notice(&format!("Using MCP server: {}", server.name))
    );

    let client = match McpClient::connect(server).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!(
                "{}",
                style::notice(&format!("Warning: Failed to initialize MCP client: {e}"))
            );
            eprintln!(
                "{}",
                style::notice("Continuing without MCP tools support.")
            );
            return None;
        }
    };

    let definitions = client.tool_definitions();
    if definitions.is_empty() {
        eprintln!(
            "{}",
            style::notice(&format!(
                "[{}] exposes no tools. Continuing without MCP tools support.",
                server.name
            ))
        );
    } else {
        eprintln!(
            "{}",
            style::tool_line(&format!("[{}] tools loaded successfully:", server.name))
        );
        for (i, definition) in definitions.iter().enumerate() {
            eprintln!(
                "{}",
                style::tool_line(&format!("  {}. {}", i + 1, definition.name()))
            );
        }
    }

    let client = Arc::new(client);
    session.enable_tools(Arc::clone(&client) as Arc<dyn ToolDispatcher>, definitions);
    Some(client)
}

fn banner(config: &Config) {
    eprintln!(
        "{}",
        style::notice(&format!("Using model: {}", config.chat_model))
    );
    eprintln!(
        "{}",
        style::notice("Type your message and press Enter to chat.")
    );
    eprintln!(
        "{}",
        style::notice("Type 'exit' or 'quit' to end the conversation.")
    );
    eprintln!("{}", style::notice("-----------------------------------------------"));
    eprintln!("{}", style::notice("🤖 LLoms chat"));
    eprintln!("{}", style::notice("-----------------------------------------------"));
}

/// The session loop: one line of input per iteration until `exit`/`quit` or
/// end of input.
async fn repl(session: &mut ChatSession) -> Result<()> {
    let stdin = io::stdin();

    loop {
        eprint!("{}", style::user_prompt());
        io::stderr().flush()?;

        let mut line = String::new();
        let bytes_read = stdin.lock().read_line(&mut line)?;
        if bytes_read == 0 {
            eprintln!();
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);

        match classify(line) {
            InputAction::Quit => break,
            InputAction::Skip => continue,
            InputAction::Chat => run_turn(session, line).await?,
        }
    }

    eprintln!("{}", style::notice("Goodbye!"));
    Ok(())
}

/// Run one chat turn, streaming the response to stdout. Ctrl+C interrupts
/// the in-flight stream and abandons the turn; only conversation-store
/// failures propagate as fatal.
async fn run_turn(session: &mut ChatSession, line: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut labeled = false;

    let result = session
        .process_turn(line, &cancel, |event| match event {
            TurnEvent::TextDelta(text) => {
                if !labeled {
                    let _ = write!(out, "{}", style::assistant_label(ASSISTANT_NAME));
                    labeled = true;
                }
                let _ = write!(out, "{text}");
                let _ = out.flush();
            }
            TurnEvent::ToolCallStarted { name, arguments } => {
                eprintln!(
                    "{}",
                    style::tool_line(&format!("🛠️ Calling tool: {name} with args: {arguments}"))
                );
            }
            TurnEvent::ToolCallCompleted { name, text } => {
                eprintln!(
                    "{}",
                    style::tool_line(&format!("🛠️ Tool {name} result: {text}"))
                );
            }
            TurnEvent::Warning(message) => {
                eprintln!("{}", style::notice(&message));
            }
            TurnEvent::Done => {}
        })
        .await;

    ctrl_c.abort();
    if labeled {
        let _ = writeln!(out);
        let _ = out.flush();
    }

    result.context("Conversation store failure")?;
    Ok(())
}
