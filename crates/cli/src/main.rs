mod args;
mod reclaim;

use args::GlobalArgs;
use clap::{Args, Parser, Subcommand};
use reclaim_lib::{error::ReclaimError, log::LoggingFormat};
use solana_sdk::pubkey::Pubkey;

use reclaim::{logic, types::CloseTarget, ReclaimContext};

#[derive(Subcommand)]
enum Commands {
    /// List the wallet's empty token accounts and the rent they hold
    Scan,
    /// Close empty token accounts and return their rent to the wallet
    #[command(
        about = "Close empty token accounts and return their rent to the wallet",
        long_about = "Close empty SPL Token and Token-2022 accounts owned by the wallet.\n\nWithout --execute the command only prints the transactions it would send. Every transaction is confirmed on the terminal before signing unless --yes is given."
    )]
    Close {
        #[command(flatten)]
        target: TargetArgs,

        /// Sign and submit the transactions (default is dry-run)
        #[arg(long, default_value_t = false)]
        execute: bool,

        /// Approve every transaction without asking
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
    },
    /// Interactive terminal UI: select accounts and close them
    Tui,
    /// Rent locked in closable accounts and rent reclaimed so far
    Stats,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    /// Close every closable account
    #[arg(long)]
    all: bool,

    /// Close the accounts with these addresses
    #[arg(long, num_args = 1..)]
    select: Vec<Pubkey>,

    /// Close the accounts at these positions of the `scan` listing (1-based)
    #[arg(long, num_args = 1..)]
    pick: Vec<usize>,
}

impl From<TargetArgs> for CloseTarget {
    fn from(args: TargetArgs) -> Self {
        if args.all {
            CloseTarget::All
        } else if !args.select.is_empty() {
            CloseTarget::Addresses(args.select)
        } else {
            CloseTarget::Positions(args.pick)
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Reclaim rent from empty Solana token accounts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[tokio::main]
async fn main() -> Result<(), ReclaimError> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("No command specified. Use --help for usage information.");
        println!("Available commands:");
        println!("  scan                        - List closable token accounts");
        println!("  close --all|--select|--pick - Close token accounts (dry-run unless --execute)");
        println!("  tui                         - Interactive terminal UI");
        println!("  stats                       - Rent locked and reclaimed");
        return Ok(());
    };

    // The terminal UI owns the screen, log lines would tear it
    if !matches!(command, Commands::Tui) {
        setup_logging(&cli.global_args.logging_format);
    }

    let ctx = ReclaimContext::from_args(&cli.global_args).unwrap_or_else(|e| {
        print_error(&format!("Failed to initialize: {e}"));
        std::process::exit(1);
    });
    tracing::info!("Using wallet {} on {}", ctx.owner, ctx.config.network);

    let result = match command {
        Commands::Scan => logic::run_scan(&ctx).await,
        Commands::Close { target, execute, yes } => {
            logic::run_close(&ctx, target.into(), execute, yes).await
        }
        Commands::Tui => logic::run_tui_task(ctx).await,
        Commands::Stats => logic::show_stats(&ctx).await,
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}

fn print_error(message: &str) {
    eprintln!("Error: {message}");
}

fn setup_logging(format: &LoggingFormat) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,reqwest=warn".into());

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);
    match format {
        LoggingFormat::Standard => subscriber.init(),
        LoggingFormat::Json => subscriber.json().init(),
    }
}
