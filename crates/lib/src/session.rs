use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    account::{total_lamports, RecordRef},
    config::{Config, Network},
    engine::{CloseEngine, RunReport},
    error::ReclaimError,
    fetch::AccountSource,
    metadata::MetadataProvider,
    notify::{Notifier, Severity},
    selection::SelectionStore,
    token::TokenProgram,
    wallet::{SignatureStatusProvider, TransactionSubmitter},
};

/// Everything a session talks to outside the process. Replaced as a whole on network switch.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn AccountSource>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub submitter: Arc<dyn TransactionSubmitter>,
    pub status_provider: Arc<dyn SignatureStatusProvider>,
    pub notifier: Arc<dyn Notifier>,
}

/// Snapshot published to observers after every state change
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub owner: Pubkey,
    pub network: Network,
    pub is_closing: bool,
    pub is_fetched: bool,
    pub total_lamports: u64,
    pub accounts: Vec<RecordRef>,
    pub selection: Vec<RecordRef>,
}

impl SessionView {
    pub fn is_selected(&self, record: &RecordRef) -> bool {
        self.selection.iter().any(|r| Arc::ptr_eq(r, record))
    }

    pub fn selected_lamports(&self) -> u64 {
        total_lamports(&self.selection)
    }
}

/// Closable accounts of one wallet on one network, the user's selection over them, and the
/// closing runs that consume it. After every run the selection is empty, `is_closing` is
/// false and the account list has been refetched.
pub struct ReclaimSession {
    config: Config,
    owner: Pubkey,
    network: Network,
    accounts: Vec<RecordRef>,
    selection: SelectionStore,
    is_closing: bool,
    is_fetched: bool,
    total_lamports: u64,
    source: Arc<dyn AccountSource>,
    metadata: Arc<dyn MetadataProvider>,
    notifier: Arc<dyn Notifier>,
    engine: CloseEngine,
    view_tx: watch::Sender<SessionView>,
}

impl ReclaimSession {
    pub fn new(
        config: Config,
        owner: Pubkey,
        collaborators: Collaborators,
    ) -> Result<Self, ReclaimError> {
        config.validate()?;
        let engine = Self::build_engine(&config, &collaborators)?;
        let network = config.network;
        let (view_tx, _) = watch::channel(SessionView { owner, network, ..Default::default() });

        Ok(Self {
            config,
            owner,
            network,
            accounts: Vec::new(),
            selection: SelectionStore::new(),
            is_closing: false,
            is_fetched: false,
            total_lamports: 0,
            source: collaborators.source,
            metadata: collaborators.metadata,
            notifier: collaborators.notifier,
            engine,
            view_tx,
        })
    }

    fn build_engine(
        config: &Config,
        collaborators: &Collaborators,
    ) -> Result<CloseEngine, ReclaimError> {
        CloseEngine::from_config(
            config,
            collaborators.submitter.clone(),
            collaborators.status_provider.clone(),
            collaborators.notifier.clone(),
        )
    }

    pub fn owner(&self) -> &Pubkey {
        &self.owner
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn accounts(&self) -> &[RecordRef] {
        &self.accounts
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn is_closing(&self) -> bool {
        self.is_closing
    }

    pub fn is_fetched(&self) -> bool {
        self.is_fetched
    }

    pub fn total_lamports(&self) -> u64 {
        self.total_lamports
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            owner: self.owner,
            network: self.network,
            is_closing: self.is_closing,
            is_fetched: self.is_fetched,
            total_lamports: self.total_lamports,
            accounts: self.accounts.clone(),
            selection: self.selection.records().to_vec(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }

    /// Refetches both token programs, SPL Token first, and replaces the list. The selection is
    /// cleared on success. On failure the previous list stays and `is_fetched` stays false.
    pub async fn refresh(&mut self) -> Result<(), ReclaimError> {
        self.is_fetched = false;
        self.publish();

        match self.fetch_records().await {
            Ok(records) => {
                self.total_lamports = total_lamports(&records);
                self.accounts = records;
                self.selection.clear();
                self.is_fetched = true;
                log::info!(
                    "Found {} closable accounts holding {} lamports for {} on {}",
                    self.accounts.len(),
                    self.total_lamports,
                    self.owner,
                    self.network
                );
                self.publish();
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Severity::Error, &e.to_string(), None);
                self.publish();
                Err(e)
            }
        }
    }

    async fn fetch_records(&self) -> Result<Vec<RecordRef>, ReclaimError> {
        let mut raw = Vec::new();
        for program in TokenProgram::ALL {
            let accounts =
                self.source.fetch_closable_accounts(&self.owner, program).await.map_err(|e| {
                    match e {
                        ReclaimError::FetchError(_) => e,
                        other => ReclaimError::FetchError(other.to_string()),
                    }
                })?;
            raw.extend(accounts);
        }

        let records = self.metadata.enrich(raw, self.network).await;
        Ok(records.into_iter().map(Arc::new).collect())
    }

    /// Closes every account of the current list
    pub async fn close_all(&mut self) -> Result<RunReport, ReclaimError> {
        let records = self.accounts.clone();
        self.close(records).await
    }

    /// Closes the selected accounts, in the order they were picked
    pub async fn close_selected(&mut self) -> Result<RunReport, ReclaimError> {
        let records = self.selection.records().to_vec();
        self.close(records).await
    }

    async fn close(&mut self, records: Vec<RecordRef>) -> Result<RunReport, ReclaimError> {
        if records.is_empty() {
            // Rejected before any state changes
            return self.engine.run(&self.owner, &records).await;
        }

        self.is_closing = true;
        self.publish();

        let result = self.engine.run(&self.owner, &records).await;

        self.is_closing = false;
        self.selection.clear();
        self.publish();

        let mut report = result?;
        if let Err(e) = self.refresh().await {
            report.refresh_error = Some(e);
        }
        Ok(report)
    }

    /// Flips the selection of `record`, which must belong to the current list
    pub fn toggle_selection(&mut self, record: &RecordRef) -> Result<bool, ReclaimError> {
        if !self.accounts.iter().any(|r| Arc::ptr_eq(r, record)) {
            return Err(ReclaimError::ValidationError(format!(
                "Account {} is not part of the current account list",
                record.account_address
            )));
        }
        let selected = self.selection.toggle(record);
        self.publish();
        Ok(selected)
    }

    pub fn toggle_selection_at(&mut self, index: usize) -> Result<bool, ReclaimError> {
        let record = self.accounts.get(index).cloned().ok_or_else(|| {
            ReclaimError::ValidationError(format!(
                "No account at index {index}, the list has {} entries",
                self.accounts.len()
            ))
        })?;
        self.toggle_selection(&record)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.publish();
    }

    /// Points the session at another wallet and refetches. The previous wallet's accounts are
    /// dropped first so they can never be closed under the new owner.
    pub async fn switch_owner(&mut self, owner: Pubkey) -> Result<(), ReclaimError> {
        self.owner = owner;
        self.reset_accounts();
        self.refresh().await
    }

    /// Moves the session to another network with collaborators bound to it, and refetches
    pub async fn switch_network(
        &mut self,
        network: Network,
        collaborators: Collaborators,
    ) -> Result<(), ReclaimError> {
        let mut config = self.config.clone();
        config.network = network;
        config.validate()?;

        self.engine = Self::build_engine(&config, &collaborators)?;
        self.config = config;
        self.network = network;
        self.source = collaborators.source;
        self.metadata = collaborators.metadata;
        self.notifier = collaborators.notifier;
        self.reset_accounts();
        self.refresh().await
    }

    fn reset_accounts(&mut self) {
        self.accounts.clear();
        self.selection.clear();
        self.total_lamports = 0;
        self.is_fetched = false;
    }
}
