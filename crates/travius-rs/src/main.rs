//! Run the relay against an OpenAI-compatible API from the command line.
//!
//! Reads the API key from the `OPENAI_API_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Plain relay
//! travius chat --prompt "hello"
//!
//! # Follow-up question in the structural mode
//! travius analyze --dialog-file log.txt --reply "A flywheel stores energy..." --mode 3
//!
//! # Summarize a "Speaker: text" transcript
//! cat transcript.txt | travius summarize
//!
//! # Restyle a draft prompt
//! travius suggest --prompt "tell me more" --talce "casual"
//! ```

use std::io::{self, Read};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use travius::prelude::*;

/// Ask an OpenAI-compatible model for follow-up questions, summaries, and
/// plain replies.
///
/// Reads the API key from the OPENAI_API_KEY environment variable.
#[derive(Parser)]
#[command(name = "travius")]
struct Cli {
    /// Model used for every upstream call
    #[arg(long, global = true, default_value = DEFAULT_MODEL)]
    model: String,

    /// Upstream base URL; `/chat/completions` is appended
    #[arg(long, global = true, default_value = OPENAI_BASE_URL)]
    base_url: String,

    /// Log every raw upstream response body
    #[arg(long, global = true)]
    debug_upstream: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one prompt and print the trimmed reply
    Chat {
        #[arg(long)]
        prompt: String,
    },

    /// Generate a deeper follow-up question and print it as JSON
    Analyze {
        /// The assistant's most recent reply
        #[arg(long)]
        reply: String,

        /// File with one conversation line per line (stdin when omitted)
        #[arg(long)]
        dialog_file: Option<String>,

        /// Thinking mode 1-4; anything else uses the generic framing
        #[arg(long)]
        mode: Option<String>,

        /// A question produced earlier that should be reworked
        #[arg(long)]
        previous_prompt: Option<String>,

        /// Extra guidance for the rework (with --previous-prompt)
        #[arg(long)]
        supplement: Option<String>,

        /// Replace the reported level with a classifying second call
        #[arg(long)]
        classify: bool,
    },

    /// Restyle a draft prompt in a talking style
    Suggest {
        #[arg(long)]
        prompt: String,

        /// Talking-style descriptor, e.g. "casual" or "polite"
        #[arg(long)]
        talce: String,

        /// The assistant reply the prompt should follow on from
        #[arg(long)]
        gpt_reply: Option<String>,
    },

    /// Summarize a `Speaker: text` transcript
    Summarize {
        /// Transcript file (stdin when omitted)
        #[arg(long)]
        file: Option<String>,
    },
}

// ── Helpers ────────────────────────────────────────────────────────

fn read_input(path: Option<&str>) -> Result<String, String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read '{path}': {e}")),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

fn dialog_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<String, String> {
    let credential = Credential::new(
        std::env::var("OPENAI_API_KEY")
            .map_err(|_| "OPENAI_API_KEY environment variable is not set".to_string())?,
    )
    .validated()
    .map_err(|e| e.to_string())?;

    let client = OpenAiClient::new(&cli.base_url)?.with_debug_upstream(cli.debug_upstream);
    let classify_level = matches!(cli.command, Command::Analyze { classify: true, .. });
    let relay = Relay::new(
        Arc::new(client),
        RelaySettings {
            model: cli.model,
            classify_level,
        },
    );

    match cli.command {
        Command::Chat { prompt } => relay
            .chat(&credential, &prompt)
            .await
            .map_err(|e| e.to_string()),

        Command::Analyze {
            reply,
            dialog_file,
            mode,
            previous_prompt,
            supplement,
            ..
        } => {
            let dialog = dialog_lines(&read_input(dialog_file.as_deref())?);
            let mode = mode
                .map(serde_json::Value::String)
                .and_then(|v| ThinkingMode::from_selector(Some(&v)));
            let refinement = previous_prompt.map(|previous_prompt| Refinement {
                previous_prompt,
                supplement,
            });

            let result = relay
                .analyze(
                    &credential,
                    AnalyzeInput {
                        dialog,
                        last_reply: reply,
                        mode,
                        refinement,
                    },
                )
                .await
                .map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&result)
                .map_err(|e| format!("failed to format result: {e}"))
        }

        Command::Suggest {
            prompt,
            talce,
            gpt_reply,
        } => relay
            .suggest(&credential, &prompt, &talce, gpt_reply.as_deref())
            .await
            .map_err(|e| e.to_string()),

        Command::Summarize { file } => {
            let turns = parse_transcript(&read_input(file.as_deref())?);
            eprintln!("  Parsed {} turn(s)", turns.len());
            relay
                .summarize(&credential, &turns)
                .await
                .map_err(|e| e.to_string())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
