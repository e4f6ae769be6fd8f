//! Test fixtures and helpers.
//!
//! Common setup code for integration tests and benchmarks.

use msgbox_kernel::{Kernel, KernelConfig, Result};
use msgbox_kernel_authz::{Directory, GenesisDirectory, Resolver};
use msgbox_kernel_chain::{
    ChainBuilder, MessageProver, SignatureVerifier, SignedAttester,
};
use msgbox_kernel_core::{
    AgentId, AgentRecord, CredentialedDetails, Keypair, LocationReport, Message, MessageText,
    SecurityCode,
};
use msgbox_kernel_store::MemoryStore;

/// Agent known to the fixture's genesis directory.
pub const GENESIS_AGENT: AgentId = AgentId::new(7);

/// Credential of [`GENESIS_AGENT`].
pub const GENESIS_CODE: SecurityCode = SecurityCode::from_bytes(*b"A7");

/// A valid twelve-symbol text.
pub const TEXT: &[u8; 12] = b"all is quiet";

/// A test fixture with an attester and a genesis directory.
pub struct TestFixture {
    pub attester: SignedAttester,
    pub genesis: GenesisDirectory,
}

impl TestFixture {
    /// Create a fixture with a random attester.
    pub fn new() -> Self {
        Self::with_attester(SignedAttester::generate())
    }

    /// Create with a deterministic attester key.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_attester(SignedAttester::new(Keypair::from_seed(&seed)))
    }

    fn with_attester(attester: SignedAttester) -> Self {
        let genesis = GenesisDirectory::from_entries([(
            GENESIS_AGENT,
            AgentRecord::new(0, GENESIS_CODE),
        )])
        .expect("fixture genesis must be valid");
        Self { attester, genesis }
    }

    /// A chain builder trusting this fixture's attester.
    pub fn builder(&self) -> ChainBuilder<SignedAttester, SignatureVerifier> {
        ChainBuilder::signed(self.attester.clone())
    }

    /// A message prover using this fixture's attester.
    pub fn prover(&self) -> MessageProver<SignedAttester> {
        MessageProver::new(self.attester.clone())
    }

    /// A resolver over an empty directory and the fixture's genesis.
    pub fn resolver(&self) -> Resolver {
        Resolver::new(Directory::new(), self.genesis.clone())
    }

    /// A bootstrapped in-memory kernel.
    pub async fn kernel(&self, config: KernelConfig) -> Result<Kernel<MemoryStore>> {
        let kernel = Kernel::signed(MemoryStore::new(), self.attester.clone(), config)?;
        kernel.bootstrap(self.genesis.clone()).await?;
        Ok(kernel)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A well-formed location report from `agent`.
pub fn location(agent: AgentId, number: u64) -> Message {
    Message::new(LocationReport::with_checksum(agent, 10, 6000), number)
}

/// A location report whose y coordinate does not exceed x.
pub fn inverted_location(agent: AgentId, number: u64) -> Message {
    Message::new(LocationReport::with_checksum(agent, 9000, 8000), number)
}

/// A credentialed message with a valid text.
pub fn credentialed(agent: AgentId, code: SecurityCode, number: u64) -> Message {
    Message::new(
        CredentialedDetails {
            agent_id: agent,
            text: MessageText::from_prefix(TEXT),
            security_code: code,
        },
        number,
    )
}

/// `count` valid messages from the genesis agent numbered `1..=count`.
pub fn valid_run(count: u64) -> Vec<Message> {
    (1..=count).map(|n| location(GENESIS_AGENT, n)).collect()
}
