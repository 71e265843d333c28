use std::{sync::Arc, time::Duration};

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;

const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// RPC client shared by the account source and the wallet. Reads use `confirmed`, the same
/// commitment the close engine waits for.
pub fn get_rpc_client(rpc_url: &str) -> Arc<RpcClient> {
    Arc::new(RpcClient::new_with_timeout_and_commitment(
        rpc_url.to_string(),
        RPC_REQUEST_TIMEOUT,
        CommitmentConfig::confirmed(),
    ))
}
