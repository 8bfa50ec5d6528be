use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use markbook_core::commands::{ensure_initialized_at, markbook_root, Commands};
use markbook_core::Identity;

mod telegram;

use telegram::{run_polling, TelegramClient};

#[derive(Parser, Debug)]
#[command(name = "markbook", about = "Track subject marks and credit-weighted averages over chat")]
struct Cli {
    /// Data root; defaults to $MARKBOOK_ROOT or `.markbook`.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create the data root and a default config.toml
    Init,
    /// Run the Telegram bot (long polling)
    Run,
    /// Print the results table for a chat
    Show {
        #[arg(long, allow_hyphen_values = true)]
        chat: String,
    },
    /// Add a subject: `add --chat 42 Math 4`
    Add {
        #[arg(long, allow_hyphen_values = true)]
        chat: String,
        name: String,
        credits: String,
    },
    /// Add marks to a subject: `update --chat 42 Math 7/10`
    Update {
        #[arg(long, allow_hyphen_values = true)]
        chat: String,
        name: String,
        marks: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("markbook=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli.root.unwrap_or_else(markbook_root);
    let report = ensure_initialized_at(&root)
        .with_context(|| format!("initialize markbook root {}", root.display()))?;

    match cli.cmd {
        Cmd::Init => {
            println!("Markbook root: {}", report.root.display());
            for c in &report.created {
                println!("  created {c}");
            }
            for e in &report.existed {
                println!("  exists  {e}");
            }
        }
        Cmd::Run => {
            let bot = &report.config.bot;
            // Fail before touching the network if the token is missing.
            let token = std::env::var(&bot.token_env)
                .map_err(|_| anyhow!("environment variable {} is not set", bot.token_env))?;
            let commands = Commands::new(&report.config)?;
            let client = TelegramClient::new(bot, &token)?;
            tracing::info!(
                root = %report.root.display(),
                scope = ?report.config.store.scope,
                "markbook bot starting"
            );
            run_polling(&client, &commands)?;
        }
        Cmd::Show { chat } => {
            let commands = Commands::new(&report.config)?;
            println!("{}", commands.on_show_requested(&Identity::new(chat)));
        }
        Cmd::Add { chat, name, credits } => {
            let commands = Commands::new(&report.config)?;
            let raw = format!("{name} {credits}");
            println!("{}", commands.on_add_requested(&Identity::new(chat), &raw));
        }
        Cmd::Update { chat, name, marks } => {
            let commands = Commands::new(&report.config)?;
            let raw = format!("{name} {marks}");
            println!("{}", commands.on_update_requested(&Identity::new(chat), &raw));
        }
    }
    Ok(())
}
