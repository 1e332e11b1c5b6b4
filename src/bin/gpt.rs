//! Send a transcript on stdin to a chat model and stream the reply.
//!
//! ```bash
//! # One-shot question
//! echo "What is a monad?" | gpt --gpt4
//!
//! # Continue a logged conversation with a cooler temperature
//! cat /tmp/2024-01-02T15-04-05.gpt.txt | gpt --gpt4 0.2
//!
//! # Save the API key once
//! gpt --keyring sk-...
//! ```
//!
//! Diagnostics go to stderr and are controlled by `GPT_LOG` (default `warn`).

use std::io::Read;
use std::process::ExitCode;

use arrrg::CommandLine;
use tracing_subscriber::{EnvFilter, fmt};

use gpt_pipe::config::{Args, Environment, Invocation, USAGE};
use gpt_pipe::credentials::{CredentialStore, Keyring, resolve_api_key};
use gpt_pipe::{Error, OpenAi, Session, TranscriptLog, build_request, prepare};

const LOG_FILTER_ENV: &str = "GPT_LOG";

fn init_tracing() {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("gpt: failed to install log subscriber: {e}");
    }
}

async fn run(args: Args, positional: Vec<String>) -> Result<(), Error> {
    let env = Environment::from_env();
    let config = match Invocation::resolve(args, &positional, &env)? {
        Invocation::StoreKey(key) => {
            Keyring::default_entry()?.store(&key)?;
            tracing::info!("stored API key in the keyring");
            println!("{key}");
            return Ok(());
        }
        Invocation::Chat(config) => config,
    };

    let api_key = resolve_api_key(env.api_key.clone(), &Keyring::default_entry()?)?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| Error::io(format!("failed to read stdin: {e}"), e))?;
    let Some(messages) = prepare(&input) else {
        tracing::debug!("empty input, nothing to send");
        return Ok(());
    };

    let client = OpenAi::with_options(api_key, config.base_url.as_deref(), None)?;
    let request = build_request(&config, messages);
    let mut terminal = std::io::stdout().lock();
    let stats = Session::new(&client, config.vim)
        .run(request, &mut terminal, || {
            TranscriptLog::create(&config.log_dir)
        })
        .await?;
    tracing::info!(
        fragments = stats.fragments,
        bytes = stats.bytes,
        "relayed response"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let (args, positional) = Args::from_command_line_relaxed(USAGE);
    match run(args, positional).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gpt: {err}");
            if err.is_usage() {
                eprintln!("usage: {USAGE}");
            }
            ExitCode::FAILURE
        }
    }
}
