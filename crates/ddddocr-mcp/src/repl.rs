//! Interactive REPL for the ddddocr MCP server.
//!
//! Launch with `ddddocr-mcp repl` to try the tools on local images.
//! Type `/help` for available commands, Tab for completion.

use std::path::Path;
use std::sync::Arc;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::backends::BackendRegistry;
use crate::tools::{detect_objects, health_check, match_slider, ocr_recognize, ToolRegistry};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/ocr", "Recognize the text of a captcha image"),
    ("/detect", "Detect targets in a click captcha image"),
    ("/slide", "Match a slider piece: /slide <target> <background>"),
    ("/health", "Show which engines are loaded"),
    ("/info", "Show server capabilities and tools"),
    ("/tools", "List available MCP tools"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// REPL helper for tab completion.
#[derive(Default)]
struct CaptchaHelper;

impl Completer for CaptchaHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // image file completion for the last word
        let cmd = input.split(' ').next().unwrap_or("");
        if matches!(cmd, "/ocr" | "/detect" | "/slide") {
            let word_start = input.rfind(' ').map(|i| i + 1).unwrap_or(0);
            let prefix = &input[word_start..];
            let matches: Vec<Pair> = image_files_in_cwd()
                .into_iter()
                .filter(|f| f.starts_with(prefix))
                .map(|f| Pair {
                    display: f.clone(),
                    replacement: format!("{f} "),
                })
                .collect();
            return Ok((word_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

fn image_files_in_cwd() -> Vec<String> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(".") {
        for entry in entries.flatten() {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_image {
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    files.push(name.to_string());
                }
            }
        }
    }
    files.sort();
    files
}

impl Hinter for CaptchaHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for CaptchaHelper {}
impl Validator for CaptchaHelper {}
impl Helper for CaptchaHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the interactive REPL. Engines load lazily on first use, as in the server.
pub async fn run(model_dir: &Path) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mddddocr-mcp v{}\x1b[0m \x1b[90mcaptcha recognition\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("    Models: \x1b[90m{}\x1b[0m", model_dir.display());
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<CaptchaHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(CaptchaHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".ddddocr_mcp_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let backends = Arc::new(Mutex::new(BackendRegistry::with_model_dir(model_dir)));
    let prompt = " \x1b[36mddddocr>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args: Vec<&str> = parts.next().unwrap_or("").split_whitespace().collect();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => cmd_info(),
                    "tools" => cmd_tools(),
                    "health" => call_tool(health_check::NAME, json!({}), &backends).await,
                    "ocr" | "detect" => match args.as_slice() {
                        [path] => {
                            let tool = if cmd == "ocr" {
                                ocr_recognize::NAME
                            } else {
                                detect_objects::NAME
                            };
                            call_tool(tool, json!({ "image_path": path }), &backends).await;
                        }
                        _ => eprintln!("  Usage: /{cmd} <image>"),
                    },
                    "slide" => match args.as_slice() {
                        [target, background] => {
                            let args = json!({
                                "target_path": target,
                                "background_path": background,
                            });
                            call_tool(match_slider::NAME, args, &backends).await;
                        }
                        _ => eprintln!("  Usage: /slide <target> <background>"),
                    },
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or(Path::new(".")));
    let _ = rl.save_history(&hist_path);

    Ok(())
}

async fn call_tool(name: &str, args: Value, backends: &Arc<Mutex<BackendRegistry>>) {
    let result = ToolRegistry::call(name, Some(args), backends).await;
    eprintln!();
    for line in result.first_text().unwrap_or("").lines() {
        eprintln!("  {line}");
    }
    eprintln!();
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completion works for commands and image files.");
    eprintln!();
}

fn cmd_info() {
    let capabilities = crate::types::InitializeResult::default_result();
    let tools = ToolRegistry::list_tools();
    eprintln!();
    eprintln!(
        "  Server:   {} v{}",
        capabilities.server_info.name, capabilities.server_info.version
    );
    eprintln!("  Protocol: {}", capabilities.protocol_version);
    eprintln!("  Tools:    {}", tools.len());
    eprintln!();
}

fn cmd_tools() {
    let tools = ToolRegistry::list_tools();
    eprintln!();
    eprintln!("  {} MCP tools available:", tools.len());
    eprintln!();
    for tool in &tools {
        eprintln!(
            "    {:<28} {}",
            tool.name,
            tool.description.as_deref().unwrap_or("")
        );
    }
    eprintln!();
}
