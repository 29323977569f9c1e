mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runtime::{Dispatcher, ModelError, OllamaBackend, Registry, Renderer, TurnReport, TurnRunner};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;

#[derive(Parser)]
#[command(name = "toolbelt")]
#[command(about = "Let a local language model call tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./toolbelt.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ollama server URL
    #[arg(long, global = true)]
    host: Option<String>,

    /// Model name
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read prompts from stdin, one turn per line
    Chat,
    /// Run a single turn and exit
    Ask {
        /// Prompt text; multiple words are joined with spaces
        #[arg(required = true)]
        prompt: Vec<String>,
        /// Print the turn report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the declarations sent to the model
    Tools,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(host) = cli.host {
        config.backend.host = host;
    }
    if let Some(model) = cli.model {
        config.backend.model = model;
    }
    config.validate()?;

    init_tracing(if cli.verbose { "debug" } else { &config.log.level });

    let registry = builtins::registry(&config.tools.enable, &config.tools.workspace)?;

    match cli.command {
        Some(Commands::Tools) => cmd_tools(&registry),
        Some(Commands::Ask { prompt, json }) => {
            let runner = build_runner(&config, registry)?;
            cmd_ask(&runner, &prompt.join(" "), json, config.backend.retries).await
        }
        Some(Commands::Chat) | None => {
            let runner = build_runner(&config, registry)?;
            cmd_chat(&runner, &config).await
        }
    }
}

/// Logs go to stderr so stdout carries only turn output.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_runner(config: &Config, registry: Registry) -> Result<TurnRunner<OllamaBackend>> {
    let mut builder = OllamaBackend::builder(&config.backend.model)
        .host(&config.backend.host)
        .timeout(config.request_timeout());
    if let Some(system) = &config.backend.system {
        builder = builder.system(system);
    }
    let backend = builder.build()?;

    let mut dispatcher = Dispatcher::new();
    if let Some(timeout) = config.tool_timeout() {
        dispatcher = dispatcher.with_timeout(timeout);
    }

    Ok(TurnRunner::new(backend, registry).with_dispatcher(dispatcher))
}

/// Run one turn, retrying only while the engine is unreachable.
async fn run_turn(
    runner: &TurnRunner<OllamaBackend>,
    input: &str,
    retries: u32,
) -> std::result::Result<TurnReport, ModelError> {
    let mut attempt = 0;
    loop {
        match runner.run(input).await {
            Err(e) if e.is_unavailable() && attempt < retries => {
                attempt += 1;
                warn!(attempt, retries, error = %e, "engine unavailable, retrying");
            }
            result => return result,
        }
    }
}

fn print_report(report: &TurnReport, renderer: &Renderer) {
    let text = report.text.trim();
    if !text.is_empty() {
        println!("{text}");
    }
    for outcome in &report.outcomes {
        println!("{}", renderer.render(outcome));
    }
    if report.outcomes.is_empty() && text.is_empty() {
        println!("(no tool calls)");
    }
}

fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}

/// Strip the line terminator and nothing else.
fn strip_newline(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

async fn cmd_chat(runner: &TurnRunner<OllamaBackend>, config: &Config) -> Result<()> {
    println!("toolbelt v{}", env!("CARGO_PKG_VERSION"));
    println!("Model: {} at {}", config.backend.model, config.backend.host);
    let names: Vec<_> = runner.registry().names().collect();
    println!("Tools: {}", names.join(", "));
    println!("Enter 'q' or Ctrl+D to quit. Ctrl+C cancels a running turn.");

    let renderer = builtins::renderer();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("\n> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = strip_newline(&line);
        if is_quit(input) {
            break;
        }

        tokio::select! {
            result = run_turn(runner, input, config.backend.retries) => match result {
                Ok(report) => print_report(&report, &renderer),
                Err(e) => eprintln!("Error: {e}"),
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nTurn cancelled.");
            }
        }
    }

    println!("\nGoodbye.");
    Ok(())
}

async fn cmd_ask(
    runner: &TurnRunner<OllamaBackend>,
    prompt: &str,
    json: bool,
    retries: u32,
) -> Result<()> {
    let report = run_turn(runner, prompt, retries).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &builtins::renderer());
    }
    Ok(())
}

fn cmd_tools(registry: &Registry) -> Result<()> {
    let declarations = runtime::export(registry);
    println!("{}", serde_json::to_string_pretty(&declarations)?);
    Ok(())
}
