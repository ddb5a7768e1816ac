use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use chrono::NaiveDate;
use clap::Parser;
use clap::Subcommand;
use fimpad_engine::CompletionClient;
use fimpad_engine::CompletionLog;
use fimpad_engine::ConfigStore;
use fimpad_protocol::fim::FimPrompt;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Probe fill-in-the-middle completion backends and manage the completion log"
)]
struct Cli {
    /// Path to the config file (defaults to `~/.fimpad/config.toml`).
    #[arg(long, env = "FIMPAD_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run one completion request against the configured backend and print
    /// the candidates.
    Complete {
        /// File whose contents become the completion context.
        file: PathBuf,

        /// Byte offset of the cursor inside the file (defaults to end of
        /// file; clamped to the nearest character boundary).
        #[arg(long)]
        offset: Option<usize>,

        /// Model key from the config `[models]` table (defaults to the
        /// configured default model).
        #[arg(long)]
        model: Option<String>,

        /// Also print the request/response trace entry as JSON.
        #[arg(long)]
        trace: bool,
    },

    /// Inspect and maintain the day-partitioned completion log.
    Log {
        #[command(subcommand)]
        command: LogCommand,
    },

    /// Show where configuration is read from.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum LogCommand {
    /// Print the entries of one day's partition as JSON.
    Show {
        /// Partition date (defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Export every saved completion as newline-delimited JSON.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete one day's partition.
    Clear {
        /// Partition date (defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = match cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::new_default()?,
    };
    let config = store.load();

    match cli.command {
        CliCommand::Complete {
            file,
            offset,
            model,
            trace,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let offset = offset.unwrap_or(text.len());
            let model = match &model {
                Some(key) => config.model(key)?,
                None => config.active_model()?,
            };

            let client =
                CompletionClient::new(std::time::Duration::from_millis(config.request_timeout_ms))?;
            let prompt = FimPrompt::frame(&text, offset);
            let (result, debug) = client.request(&prompt, model).await;

            if trace {
                eprintln!("{}", serde_json::to_string_pretty(&debug)?);
            }
            let candidates = result?;
            if candidates.is_empty() {
                println!("(no candidates)");
            }
            for (index, candidate) in candidates.iter().enumerate() {
                println!("--- candidate {} ---", index + 1);
                println!("{candidate}");
            }
        }
        CliCommand::Log { command } => {
            let log = CompletionLog::open(
                config.data_dir()?,
                config.key_prefix.clone(),
                config.file_prefix.clone(),
            );
            run_log_command(log, command)?;
        }
        CliCommand::Config {
            command: ConfigCommand::Path,
        } => {
            println!("{}", store.path().display());
        }
    }

    Ok(())
}

fn run_log_command(mut log: CompletionLog, command: LogCommand) -> anyhow::Result<()> {
    match command {
        LogCommand::Show { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let entries = log.load(date);
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        LogCommand::Export { out } => {
            let Some(blob) = log.export_all()? else {
                eprintln!("no completions saved today");
                return Ok(());
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, &blob.jsonl)
                        .with_context(|| format!("write {}", path.display()))?;
                    eprintln!("exported to {}", path.display());
                }
                None => {
                    print!("{}", blob.jsonl);
                }
            }
        }
        LogCommand::Clear { date, yes } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let key = log.partition_key(date);
            if !yes && !confirm(&format!("Delete partition {key}? [y/N] "))? {
                eprintln!("aborted");
                return Ok(());
            }
            log.clear(date)?;
            eprintln!("cleared {key}");
        }
    }
    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
