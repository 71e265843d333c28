pub mod config;
pub mod logic;
pub mod state;
pub mod tui;
pub mod types;
pub mod utils;

use reclaim_lib::{
    audit::AuditLog,
    error::ReclaimError,
    fetch::RpcAccountSource,
    metadata::metadata_provider_from_config,
    notify::Notifier,
    rpc::get_rpc_client,
    wallet::{parse_keypair, KeypairWallet, SignatureStatusProvider, TransactionSubmitter},
    Collaborators, Config, Network, ReclaimSession,
};
use solana_sdk::{pubkey::Pubkey, signer::Signer};
use std::sync::Arc;

use self::utils::{Approver, ApprovingSubmitter, ReadOnlyWallet};
use crate::args::GlobalArgs;

/// Everything the commands need that comes from flags, environment and config file
pub struct ReclaimContext {
    pub config: Config,
    pub owner: Pubkey,
    pub audit: AuditLog,
    rpc_url: Option<String>,
    keypair: Option<String>,
}

impl ReclaimContext {
    pub fn from_args(args: &GlobalArgs) -> Result<Self, ReclaimError> {
        let mut config = Config::load_or_default(&args.config)?;
        if let Some(network) = args.network {
            config.network = network;
        }
        config.validate()?;

        let signer = args.keypair.as_deref().map(parse_keypair).transpose()?;
        let owner = match (args.owner, &signer) {
            (Some(owner), Some(keypair)) if owner != keypair.pubkey() => {
                return Err(ReclaimError::ValidationError(format!(
                    "--owner {owner} does not match the keypair's public key {}",
                    keypair.pubkey()
                )));
            }
            (Some(owner), _) => owner,
            (None, Some(keypair)) => keypair.pubkey(),
            (None, None) => {
                return Err(ReclaimError::ConfigError(
                    "No wallet given, pass --keypair (or RECLAIM_KEYPAIR) or --owner".to_string(),
                ));
            }
        };

        Ok(Self {
            config,
            owner,
            audit: AuditLog::new(&args.audit_file),
            rpc_url: args.rpc_url.clone(),
            keypair: args.keypair.clone(),
        })
    }

    pub fn can_sign(&self) -> bool {
        self.keypair.is_some()
    }

    /// An explicit `--rpc-url` applies to the network the session starts on
    pub fn rpc_url_for(&self, network: Network) -> String {
        match &self.rpc_url {
            Some(url) if network == self.config.network => url.clone(),
            _ => network.default_rpc_url().to_string(),
        }
    }

    pub fn collaborators(
        &self,
        network: Network,
        notifier: Arc<dyn Notifier>,
        approver: Approver,
    ) -> Result<Collaborators, ReclaimError> {
        let rpc_client = get_rpc_client(&self.rpc_url_for(network));

        let (submitter, status_provider): (
            Arc<dyn TransactionSubmitter>,
            Arc<dyn SignatureStatusProvider>,
        ) = match &self.keypair {
            Some(key) => {
                let wallet = Arc::new(KeypairWallet::from_private_key_string(key, rpc_client.clone())?);
                (Arc::new(ApprovingSubmitter::new(wallet.clone(), approver)), wallet)
            }
            None => (Arc::new(ReadOnlyWallet), Arc::new(ReadOnlyWallet)),
        };

        Ok(Collaborators {
            source: Arc::new(RpcAccountSource::new(rpc_client)),
            metadata: metadata_provider_from_config(&self.config.metadata)?,
            submitter,
            status_provider,
            notifier,
        })
    }

    pub fn session(
        &self,
        notifier: Arc<dyn Notifier>,
        approver: Approver,
    ) -> Result<ReclaimSession, ReclaimError> {
        let collaborators = self.collaborators(self.config.network, notifier, approver)?;
        ReclaimSession::new(self.config.clone(), self.owner, collaborators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use reclaim_lib::notify::TracingNotifier;
    use serial_test::serial;
    use solana_sdk::signature::Keypair;

    fn args(extra: &[&str]) -> GlobalArgs {
        let mut argv = vec!["reclaim", "--config", "missing-reclaim.toml"];
        argv.extend_from_slice(extra);
        GlobalArgs::parse_from(argv)
    }

    #[test]
    #[serial]
    fn test_owner_from_keypair() {
        let keypair = Keypair::new();
        let encoded = keypair.to_base58_string();
        let ctx = ReclaimContext::from_args(&args(&["--keypair", &encoded])).unwrap();

        assert_eq!(ctx.owner, keypair.pubkey());
        assert!(ctx.can_sign());
    }

    #[test]
    #[serial]
    fn test_owner_only_is_read_only() {
        let owner = Pubkey::new_unique().to_string();
        let ctx = ReclaimContext::from_args(&args(&["--owner", &owner, "--network", "devnet"])).unwrap();

        assert!(!ctx.can_sign());
        assert_eq!(ctx.config.network, Network::Devnet);
        assert_eq!(ctx.rpc_url_for(Network::Devnet), Network::Devnet.default_rpc_url());
    }

    #[test]
    #[serial]
    fn test_keypair_from_environment() {
        let keypair = Keypair::new();
        std::env::set_var("RECLAIM_KEYPAIR", keypair.to_base58_string());
        let result = ReclaimContext::from_args(&args(&[]));
        std::env::remove_var("RECLAIM_KEYPAIR");

        assert_eq!(result.unwrap().owner, keypair.pubkey());
    }

    #[test]
    #[serial]
    fn test_mismatched_owner_is_rejected() {
        let encoded = Keypair::new().to_base58_string();
        let owner = Pubkey::new_unique().to_string();
        let result = ReclaimContext::from_args(&args(&["--keypair", &encoded, "--owner", &owner]));
        assert!(matches!(result, Err(ReclaimError::ValidationError(_))));
    }

    #[test]
    #[serial]
    fn test_missing_wallet_is_config_error() {
        let result = ReclaimContext::from_args(&args(&[]));
        assert!(matches!(result, Err(ReclaimError::ConfigError(_))));
    }

    #[test]
    #[serial]
    fn test_explicit_rpc_url_only_for_start_network() {
        let owner = Pubkey::new_unique().to_string();
        let ctx = ReclaimContext::from_args(&args(&[
            "--owner",
            &owner,
            "--rpc-url",
            "http://localhost:9999",
        ]))
        .unwrap();

        assert_eq!(ctx.rpc_url_for(Network::MainnetBeta), "http://localhost:9999");
        assert_eq!(ctx.rpc_url_for(Network::Testnet), Network::Testnet.default_rpc_url());
    }

    #[tokio::test]
    #[serial]
    async fn test_session_starts_on_configured_network() {
        let owner = Pubkey::new_unique().to_string();
        let ctx = ReclaimContext::from_args(&args(&["--owner", &owner, "--network", "testnet"])).unwrap();
        let session = ctx.session(Arc::new(TracingNotifier), Approver::Auto).unwrap();

        assert_eq!(session.network(), Network::Testnet);
        assert_eq!(session.owner(), &ctx.owner);
        assert!(!session.is_fetched());
    }
}
