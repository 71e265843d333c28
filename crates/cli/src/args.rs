use clap::Parser;
use reclaim_lib::{
    constant::{DEFAULT_AUDIT_FILE, DEFAULT_CONFIG_FILE},
    log::LoggingFormat,
    Network,
};
use solana_sdk::pubkey::Pubkey;

/// Global arguments used by all subcommands
#[derive(Debug, Parser)]
#[command(name = "reclaim")]
pub struct GlobalArgs {
    /// Solana RPC endpoint URL (defaults to the public endpoint of the selected network)
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Cluster to operate on, overrides the config file
    #[arg(long, value_enum)]
    pub network: Option<Network>,

    /// Path to the configuration file (TOML format)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Wallet keypair: JSON keypair file path, `[u8; 64]` array or base58 secret key
    #[arg(long, env = "RECLAIM_KEYPAIR", hide_env_values = true)]
    pub keypair: Option<String>,

    /// Wallet to inspect without signing, defaults to the keypair's public key
    #[arg(long)]
    pub owner: Option<Pubkey>,

    /// CSV file every closing run is appended to
    #[arg(long, default_value = DEFAULT_AUDIT_FILE)]
    pub audit_file: String,

    #[arg(long, value_enum, default_value_t = LoggingFormat::Standard)]
    pub logging_format: LoggingFormat,
}
