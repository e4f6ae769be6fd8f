//! The Kernel: unified API for the Message Box system.
//!
//! Brings together the store, the resolver, and the attestation chain. All
//! mutating operations go through a single writer lock; reads go straight to
//! the store.

use std::sync::Arc;

use msgbox_kernel_authz::{select_first_present, AuthzError, GenesisDirectory, Resolver};
use msgbox_kernel_chain::{
    process_batch_tree, verify_message_attestation, AttestationVerifier, Attester,
    BatchAttestation, ChainBuilder, MessageAttestation, SignatureVerifier,
    SignedAttester,
};
use msgbox_kernel_core::{
    check_message, AgentId, AgentRecord, AuthorizationFault, Message, ValidationError, Watermark,
};
use msgbox_kernel_store::{AdminOutcome, CommitOutcome, Store};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};

/// The main Kernel struct.
///
/// Provides a unified API for:
/// - Bootstrapping the genesis directory and registering agents
/// - Submitting messages directly
/// - Building and committing batch attestations
/// - Applying private per-agent updates
pub struct Kernel<S: Store, A = SignedAttester, V = SignatureVerifier> {
    /// The storage backend.
    store: Arc<S>,
    /// Builds and verifies batch chains.
    builder: Arc<ChainBuilder<A, V>>,
    /// Verifies private message attestations.
    verifier: V,
    /// Configuration.
    config: KernelConfig,
    /// Serializes mutating operations.
    writer: Mutex<()>,
}

impl<S: Store> Kernel<S, SignedAttester, SignatureVerifier> {
    /// Create a kernel that attests with `attester` and trusts only its key.
    pub fn signed(store: S, attester: SignedAttester, config: KernelConfig) -> Result<Self> {
        let verifier = attester.verifier();
        Self::new(store, attester, verifier, config)
    }
}

impl<S, A, V> Kernel<S, A, V>
where
    S: Store,
    A: Attester + 'static,
    V: AttestationVerifier + Clone + 'static,
{
    /// Create a new kernel instance.
    pub fn new(store: S, attester: A, verifier: V, config: KernelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: Arc::new(store),
            builder: Arc::new(ChainBuilder::new(attester, verifier.clone())),
            verifier,
            config,
            writer: Mutex::new(()),
        })
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Get the chain builder.
    pub fn builder(&self) -> &ChainBuilder<A, V> {
        &self.builder
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Administration
    // ─────────────────────────────────────────────────────────────────────────

    /// Install the genesis directory.
    ///
    /// Permitted exactly once, and only before the first committed transition.
    pub async fn bootstrap(&self, genesis: GenesisDirectory) -> Result<()> {
        let _guard = self.writer.lock().await;

        match self.store.install_genesis(&genesis).await? {
            AdminOutcome::Applied => {
                info!(agents = genesis.len(), "genesis directory installed");
                Ok(())
            }
            AdminOutcome::AlreadyInstalled => Err(KernelError::AdministrativeOrdering(
                "genesis directory already installed".into(),
            )),
            AdminOutcome::PastGenesis { height } => Err(KernelError::AdministrativeOrdering(
                format!("bootstrap attempted at height {}", height),
            )),
        }
    }

    /// Install a genesis directory parsed from JSON.
    pub async fn bootstrap_json(&self, json: &str) -> Result<()> {
        self.bootstrap(GenesisDirectory::from_json(json)?).await
    }

    /// Write a directory entry before the first committed transition.
    pub async fn register_agent(&self, agent_id: AgentId, record: AgentRecord) -> Result<()> {
        if record.is_sentinel() {
            return Err(AuthzError::SentinelCredential(agent_id).into());
        }

        let _guard = self.writer.lock().await;

        match self.store.register_agent(agent_id, record).await? {
            AdminOutcome::Applied => {
                info!(agent = %agent_id, "agent registered");
                Ok(())
            }
            AdminOutcome::PastGenesis { height } => Err(KernelError::AdministrativeOrdering(
                format!("agent registration attempted at height {}", height),
            )),
            AdminOutcome::AlreadyInstalled => Err(KernelError::AdministrativeOrdering(
                "agent registration rejected".into(),
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Direct Path
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate and accept a single message.
    ///
    /// Any failure aborts the call with no state change. On success the
    /// agent's record advances to the message number.
    pub async fn submit_message(&self, message: &Message) -> Result<()> {
        let _guard = self.writer.lock().await;

        let agent_id = message.agent_id();
        let record = self.resolve(agent_id).await?;

        if let Err(e) = check_message(message, &record) {
            debug!(agent = %agent_id, number = message.message_number, error = %e, "message rejected");
            return Err(e.into());
        }

        let height = self
            .store
            .apply_agent_update(agent_id, record.advanced_to(message.message_number))
            .await?;

        info!(
            agent = %agent_id,
            number = message.message_number,
            height,
            "message accepted"
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Batch Path
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a batch attestation seeded from the stored watermark.
    pub async fn build_batch(&self, messages: &[Message]) -> Result<BatchAttestation> {
        let seed = self.store.watermark().await?;
        self.build_batch_from(seed, messages).await
    }

    /// Build a batch attestation from an explicit seed.
    ///
    /// Never fails on account of individual messages.
    pub async fn build_batch_from(
        &self,
        seed: Watermark,
        messages: &[Message],
    ) -> Result<BatchAttestation> {
        let resolver = self.snapshot().await?;

        let attestation = if self.config.parallel_tree {
            process_batch_tree(
                Arc::clone(&self.builder),
                Arc::new(resolver),
                seed,
                messages.to_vec(),
                self.config.chunk_size,
            )
            .await?
        } else {
            self.builder
                .process_batch(seed, messages, self.config.chunk_size, &resolver)?
        };

        debug!(
            seed = %seed,
            messages = messages.len(),
            watermark = attestation.output().highest_msg_number,
            "batch attestation built"
        );
        Ok(attestation)
    }

    /// Verify a batch attestation and commit its output as the watermark.
    ///
    /// The attestation's seed must equal the stored watermark at commit time.
    pub async fn commit_batch(&self, attestation: &BatchAttestation) -> Result<Watermark> {
        let _guard = self.writer.lock().await;

        let output = self.builder.verifier().verify(attestation).map_err(|e| {
            warn!(error = %e, "rejected batch attestation");
            KernelError::from(e)
        })?;

        let seed = attestation.seed();
        let new = output.watermark();

        match self.store.compare_and_swap_watermark(seed, new).await? {
            CommitOutcome::Committed { height } => {
                info!(from = %seed, to = %new, height, "watermark committed");
                Ok(new)
            }
            CommitOutcome::Stale { current } => {
                warn!(seed = %seed, current = %current, "rejected commit with stale seed");
                Err(KernelError::StaleSeed { seed, current })
            }
        }
    }

    /// Build a batch from the stored watermark and commit it.
    pub async fn process_batch(&self, messages: &[Message]) -> Result<Watermark> {
        let attestation = self.build_batch(messages).await?;
        self.commit_batch(&attestation).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private Path
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a private message attestation to the directory.
    ///
    /// The attestation must commit to the resolved record's credential and
    /// advance its message number. The credential is carried over; only the
    /// message number changes.
    pub async fn submit_private_update(&self, attestation: &MessageAttestation) -> Result<()> {
        let _guard = self.writer.lock().await;

        let output = verify_message_attestation(attestation, &self.verifier).map_err(|e| {
            warn!(error = %e, "rejected message attestation");
            KernelError::from(e)
        })?;

        let agent_id = output.agent_id;
        let record = self.resolve(agent_id).await?;
        if record.is_sentinel() {
            warn!(agent = %agent_id, "private update for unknown agent");
            return Err(KernelError::UnknownAgent(agent_id));
        }

        if output.credential != record.security_code.commitment(agent_id) {
            warn!(agent = %agent_id, "private update against a foreign credential");
            let fault = AuthorizationFault::CredentialMismatch(agent_id);
            return Err(ValidationError::from(fault).into());
        }

        if output.message_number <= record.last_message_number {
            return Err(ValidationError::Sequencing {
                last: record.last_message_number,
                got: output.message_number,
            }
            .into());
        }

        let updated = AgentRecord::new(output.message_number, record.security_code);
        let height = self.store.apply_agent_update(agent_id, updated).await?;

        info!(
            agent = %agent_id,
            number = output.message_number,
            height,
            "private update applied"
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The committed watermark.
    pub async fn watermark(&self) -> Result<Watermark> {
        Ok(self.store.watermark().await?)
    }

    /// Number of committed state transitions.
    pub async fn height(&self) -> Result<u64> {
        Ok(self.store.height().await?)
    }

    /// Resolve an agent: directory, then genesis, then the sentinel.
    pub async fn resolve(&self, agent_id: AgentId) -> Result<AgentRecord> {
        let from_directory = self.store.get_agent(agent_id).await?;
        let from_genesis = self.store.get_genesis_agent(agent_id).await?;
        Ok(select_first_present(
            &[from_directory, from_genesis],
            AgentRecord::SENTINEL,
        ))
    }

    /// Snapshot both directories into a resolver.
    pub async fn snapshot(&self) -> Result<Resolver> {
        let directory = self.store.load_directory().await?;
        let genesis = self.store.load_genesis().await?;
        Ok(Resolver::new(directory, genesis))
    }
}
