use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fynmate_core::UserContext;
use fynmate_core::reply::format_rupiah;
use fynmate_ledger::{AppState, SqliteStore, summarize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod chat;
mod config;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "fynmate",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("FYNMATE_BUILD_SHA"), ")"),
    about = "Expense tracking from chat messages"
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract one message and print the outcome as JSON (nothing is stored)
    Parse {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        #[arg(long, default_value_t = 0)]
        user_id: i64,
    },

    /// Read messages from stdin, reply and record accepted expenses
    Chat {
        #[arg(long, default_value_t = 0)]
        user_id: i64,

        #[arg(long)]
        username: Option<String>,
    },

    /// Run the HTTP query API
    Serve {
        /// Overrides server.bind
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Print spending totals from the local ledger
    Summary {
        /// Only this user's records
        #[arg(long)]
        uid: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Manage ~/.fynmate/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Parse { text, user_id } => {
            let cfg = config::load_config()?;
            let pipeline = cfg.pipeline()?;
            let outcome = pipeline
                .process(&text.join(" "), &UserContext::new(user_id, None))
                .await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::Chat { user_id, username } => {
            let cfg = config::load_config()?;
            chat::run_chat(&cfg, UserContext::new(user_id, username)).await?;
        }

        Command::Serve { bind } => {
            let cfg = config::load_config()?;
            let bind = match bind {
                Some(b) => b,
                None => cfg.bind_addr()?,
            };
            let path = cfg.db_path()?;
            let store =
                SqliteStore::open(&path).with_context(|| format!("open {}", path.display()))?;
            let state = Arc::new(AppState {
                store,
                pipeline: Arc::new(cfg.pipeline()?),
            });
            fynmate_ledger::serve(bind, state)
                .await
                .with_context(|| format!("serve on {bind}"))?;
        }

        Command::Summary { uid, json } => {
            let cfg = config::load_config()?;
            print_summary(&cfg, uid, json).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg)?);
            }
        },
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stdout carries replies and JSON; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn print_summary(cfg: &config::Config, uid: Option<i64>, json: bool) -> Result<()> {
    let path = cfg.db_path()?;
    let store = SqliteStore::open(&path).with_context(|| format!("open {}", path.display()))?;
    let rows = store.list(uid).await?;
    let today = cfg.time_policy()?.today();
    let summary = summarize(rows.iter().map(|t| &t.record), today);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("# Spending summary\n");
    println!("Ledger: {}", path.display());
    println!(
        "Total: {} across {} transactions",
        format_rupiah(summary.total),
        summary.count
    );
    println!(
        "Today ({}): {} across {} transactions\n",
        summary.today,
        format_rupiah(summary.today_total),
        summary.today_count
    );

    if summary.by_category.is_empty() {
        println!("(no transactions yet)");
        return Ok(());
    }

    println!("## By category\n");
    for c in &summary.by_category {
        println!("- {:<14} {:>16} | count={}", c.category, format_rupiah(c.total), c.count);
    }

    println!("\n## By payment method\n");
    for p in &summary.by_payment {
        println!(
            "- {:<14} {:>16} | count={}",
            p.payment_method,
            format_rupiah(p.total),
            p.count
        );
    }

    Ok(())
}
