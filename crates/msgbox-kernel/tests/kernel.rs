//! End-to-end tests for the Kernel over both store backends.

use anyhow::Result;
use msgbox_kernel::chain::{MessageProver, SignedAttester};
use msgbox_kernel::store::{MemoryStore, SqliteStore, Store};
use msgbox_kernel::{
    AgentId, AgentRecord, CredentialedDetails, Kernel, KernelConfig, KernelError, LocationReport,
    Message, MessageText, SecurityCode, Watermark,
};

const GENESIS: &str = r#"{"agents": [
    {"agent_id": 7, "last_message_number": 0, "security_code": "A7"},
    {"agent_id": 9, "last_message_number": 0, "security_code": "B9"}
]}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn valid(agent: u64, number: u64) -> Message {
    Message::new(LocationReport::with_checksum(AgentId::new(agent), 10, 6000), number)
}

fn invalid(agent: u64, number: u64) -> Message {
    Message::new(LocationReport::with_checksum(AgentId::new(agent), 9000, 8000), number)
}

fn credentialed(agent: u64, code: &[u8; 2], number: u64) -> Message {
    Message::new(
        CredentialedDetails {
            agent_id: AgentId::new(agent),
            text: MessageText::from_prefix(b"all is quiet"),
            security_code: SecurityCode::from_bytes(*code),
        },
        number,
    )
}

async fn kernel_with<S: Store>(store: S, config: KernelConfig) -> Result<(Kernel<S>, SignedAttester)> {
    init_tracing();
    let attester = SignedAttester::generate();
    let kernel = Kernel::signed(store, attester.clone(), config)?;
    kernel.bootstrap_json(GENESIS).await?;
    Ok((kernel, attester))
}

async fn memory_kernel() -> Result<(Kernel<MemoryStore>, SignedAttester)> {
    kernel_with(MemoryStore::new(), KernelConfig { chunk_size: 2, ..Default::default() }).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Batch Path
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_five_valid_messages_commit_to_five() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    let messages: Vec<_> = (1..=5).map(|n| valid(7, n)).collect();

    let attestation = kernel.build_batch(&messages).await?;
    assert_eq!(kernel.commit_batch(&attestation).await?, Watermark(5));
    assert_eq!(kernel.watermark().await?, Watermark(5));
    assert_eq!(kernel.height().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_invalid_then_valid_commits_later_number() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    kernel.process_batch(&[valid(7, 3)]).await?;

    let n = kernel.watermark().await?.get();
    let watermark = kernel.process_batch(&[invalid(7, n + 1), valid(7, n + 2)]).await?;
    assert_eq!(watermark, Watermark(n + 2));
    Ok(())
}

#[tokio::test]
async fn test_valid_then_invalid_commits_earlier_number() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    kernel.process_batch(&[valid(7, 3)]).await?;

    let n = kernel.watermark().await?.get();
    let watermark = kernel.process_batch(&[valid(7, n + 1), invalid(7, n + 2)]).await?;
    assert_eq!(watermark, Watermark(n + 1));
    Ok(())
}

#[tokio::test]
async fn test_reserved_agent_and_unknown_agent_in_batch() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    let messages = [invalid(0, 4), credentialed(1234, b"XX", 60), credentialed(9, b"XX", 70)];
    assert_eq!(kernel.process_batch(&messages).await?, Watermark(4));
    Ok(())
}

#[tokio::test]
async fn test_well_formed_reports_from_unregistered_agent_count() -> Result<()> {
    init_tracing();
    let config = KernelConfig { chunk_size: 2, ..Default::default() };
    let kernel = Kernel::signed(MemoryStore::new(), SignedAttester::generate(), config)?;
    let messages: Vec<_> = (1..=5)
        .map(|n| Message::new(LocationReport::with_checksum(AgentId::new(1), 2, 5000), n))
        .collect();

    assert_eq!(kernel.process_batch(&messages).await?, Watermark(5));
    assert_eq!(kernel.resolve(AgentId::new(1)).await?, AgentRecord::SENTINEL);
    Ok(())
}

#[tokio::test]
async fn test_stale_seed_rejected_and_watermark_unchanged() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    kernel.process_batch(&[valid(7, 10)]).await?;

    // Seeded below the stored watermark: would regress it to 4 if committed.
    let stale = kernel.build_batch_from(Watermark(0), &[valid(7, 4)]).await?;
    let err = kernel.commit_batch(&stale).await.unwrap_err();
    assert!(matches!(
        err,
        KernelError::StaleSeed { seed: Watermark(0), current: Watermark(10) }
    ));
    assert_eq!(kernel.watermark().await?, Watermark(10));
    assert_eq!(kernel.height().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_same_attestation_cannot_commit_twice() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    let attestation = kernel.build_batch(&[valid(7, 2)]).await?;
    kernel.commit_batch(&attestation).await?;
    assert!(matches!(
        kernel.commit_batch(&attestation).await,
        Err(KernelError::StaleSeed { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_foreign_attestation_rejected() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    let (other, _) = memory_kernel().await?;

    let forged = other.build_batch(&[valid(7, 99)]).await?;
    let err = kernel.commit_batch(&forged).await.unwrap_err();
    assert!(err.is_attestation_failure());
    assert_eq!(kernel.watermark().await?, Watermark(0));
    Ok(())
}

#[tokio::test]
async fn test_tampered_output_rejected() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    let mut attestation = kernel.build_batch(&[valid(7, 2)]).await?;
    attestation.statement.output.highest_msg_number = 1_000;
    assert!(kernel.commit_batch(&attestation).await.unwrap_err().is_attestation_failure());
    Ok(())
}

#[tokio::test]
async fn test_tree_mode_matches_sequential() -> Result<()> {
    let messages: Vec<_> = [5, 1, 22, 8, 13, 2, 21, 3]
        .into_iter()
        .map(|n| if n == 22 { invalid(7, n) } else { valid(9, n) })
        .collect();

    let (sequential, _) = memory_kernel().await?;
    let (tree, _) = kernel_with(
        MemoryStore::new(),
        KernelConfig { chunk_size: 3, parallel_tree: true, ..Default::default() },
    )
    .await?;

    let a = sequential.process_batch(&messages).await?;
    let b = tree.process_batch(&messages).await?;
    assert_eq!(a, b);
    assert_eq!(a, Watermark(21));
    Ok(())
}

#[tokio::test]
async fn test_attestation_survives_transport() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    let attestation = kernel.build_batch(&[valid(7, 6)]).await?;
    let bytes = attestation.to_bytes()?;
    let decoded = msgbox_kernel::BatchAttestation::from_bytes(&bytes)?;
    assert_eq!(kernel.commit_batch(&decoded).await?, Watermark(6));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Direct Path
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_direct_submit_advances_record() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    kernel.submit_message(&credentialed(7, b"A7", 1)).await?;

    let record = kernel.resolve(AgentId::new(7)).await?;
    assert_eq!(record.last_message_number, 1);
    assert_eq!(record.security_code, SecurityCode::from_bytes(*b"A7"));
    assert_eq!(kernel.height().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_direct_submit_failures_leave_no_trace() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    kernel.submit_message(&credentialed(7, b"A7", 5)).await?;

    let cases = [
        credentialed(7, b"A8", 6),
        credentialed(7, b"A7", 5),
        credentialed(42, b"A7", 6),
        invalid(7, 6),
        Message::new(
            CredentialedDetails {
                agent_id: AgentId::new(7),
                text: MessageText::from_prefix(b"too short"),
                security_code: SecurityCode::from_bytes(*b"A7"),
            },
            6,
        ),
    ];

    for message in &cases {
        let err = kernel.submit_message(message).await.unwrap_err();
        assert!(err.is_invalid_message(), "{message:?} gave {err}");
    }

    assert_eq!(kernel.resolve(AgentId::new(7)).await?.last_message_number, 5);
    assert_eq!(kernel.height().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_direct_submit_error_classes() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    let classify = |e: KernelError| match e {
        KernelError::InvalidMessage(v) => (v.is_structural(), v.is_authorization(), v.is_sequencing()),
        other => panic!("unexpected error {other}"),
    };

    let e = kernel.submit_message(&invalid(7, 1)).await.unwrap_err();
    assert_eq!(classify(e), (true, false, false));

    let e = kernel.submit_message(&credentialed(7, b"ZZ", 1)).await.unwrap_err();
    assert_eq!(classify(e), (false, true, false));

    let e = kernel.submit_message(&credentialed(7, b"A7", 0)).await.unwrap_err();
    assert_eq!(classify(e), (false, false, true));
    Ok(())
}

#[tokio::test]
async fn test_forged_sentinel_credential_rejected() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    let err = kernel.submit_message(&credentialed(500, b"00", 1)).await.unwrap_err();
    assert!(err.is_invalid_message());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Private Path
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_private_update_keeps_credential() -> Result<()> {
    let (kernel, attester) = memory_kernel().await?;
    let prover = MessageProver::new(attester);

    let record = kernel.resolve(AgentId::new(9)).await?;
    let proof = prover.prove_message(&credentialed(9, b"B9", 3), &record)?;
    kernel.submit_private_update(&proof).await?;

    let updated = kernel.resolve(AgentId::new(9)).await?;
    assert_eq!(updated, AgentRecord::new(3, SecurityCode::from_bytes(*b"B9")));
    assert_eq!(kernel.height().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_private_update_replay_rejected() -> Result<()> {
    let (kernel, attester) = memory_kernel().await?;
    let prover = MessageProver::new(attester);

    let record = kernel.resolve(AgentId::new(7)).await?;
    let proof = prover.prove_message(&credentialed(7, b"A7", 2), &record)?;
    kernel.submit_private_update(&proof).await?;

    let err = kernel.submit_private_update(&proof).await.unwrap_err();
    assert!(matches!(err, KernelError::InvalidMessage(v) if v.is_sequencing()));
    Ok(())
}

#[tokio::test]
async fn test_private_update_unknown_agent() -> Result<()> {
    let (kernel, attester) = memory_kernel().await?;
    let prover = MessageProver::new(attester);

    // A prover holding a record the kernel has never seen.
    let phantom = AgentRecord::new(0, SecurityCode::from_bytes(*b"P1"));
    let proof = prover.prove_message(&credentialed(31, b"P1", 1), &phantom)?;

    assert!(matches!(
        kernel.submit_private_update(&proof).await,
        Err(KernelError::UnknownAgent(id)) if id == AgentId::new(31)
    ));
    assert_eq!(kernel.height().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_private_update_from_foreign_prover() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    let prover = MessageProver::new(SignedAttester::generate());

    let record = kernel.resolve(AgentId::new(7)).await?;
    let proof = prover.prove_message(&credentialed(7, b"A7", 2), &record)?;
    assert!(kernel
        .submit_private_update(&proof)
        .await
        .unwrap_err()
        .is_attestation_failure());
    Ok(())
}

#[tokio::test]
async fn test_private_update_with_wrong_credential_rejected() -> Result<()> {
    let (kernel, attester) = memory_kernel().await?;
    let prover = MessageProver::new(attester);

    // The prover checks against a record carrying a credential agent 7 never had.
    let forged = AgentRecord::new(0, SecurityCode::from_bytes(*b"ZZ"));
    let proof = prover.prove_message(&credentialed(7, b"ZZ", 500), &forged)?;

    let err = kernel.submit_private_update(&proof).await.unwrap_err();
    assert!(matches!(err, KernelError::InvalidMessage(ref v) if v.is_authorization()));
    assert_eq!(
        kernel.resolve(AgentId::new(7)).await?,
        AgentRecord::new(0, SecurityCode::from_bytes(*b"A7"))
    );
    assert_eq!(kernel.height().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_private_update_against_stale_record_cannot_roll_back() -> Result<()> {
    let (kernel, attester) = memory_kernel().await?;
    let prover = MessageProver::new(attester);

    let stale = kernel.resolve(AgentId::new(7)).await?;
    let later = prover.prove_message(&credentialed(7, b"A7", 10), &stale)?;
    let earlier = prover.prove_message(&credentialed(7, b"A7", 4), &stale)?;
    kernel.submit_private_update(&later).await?;

    let err = kernel.submit_private_update(&earlier).await.unwrap_err();
    assert!(matches!(err, KernelError::InvalidMessage(ref v) if v.is_sequencing()));
    assert_eq!(kernel.resolve(AgentId::new(7)).await?.last_message_number, 10);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Administration
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bootstrap_only_once() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    assert!(matches!(
        kernel.bootstrap_json(GENESIS).await,
        Err(KernelError::AdministrativeOrdering(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_bootstrap_after_first_step_rejected() -> Result<()> {
    init_tracing();
    let kernel = Kernel::signed(MemoryStore::new(), SignedAttester::generate(), KernelConfig::default())?;
    kernel
        .register_agent(AgentId::new(7), AgentRecord::new(0, SecurityCode::from_bytes(*b"A7")))
        .await?;
    kernel.submit_message(&valid(7, 1)).await?;

    assert!(matches!(
        kernel.bootstrap_json(GENESIS).await,
        Err(KernelError::AdministrativeOrdering(_))
    ));
    assert!(matches!(
        kernel
            .register_agent(AgentId::new(8), AgentRecord::new(0, SecurityCode::from_bytes(*b"A8")))
            .await,
        Err(KernelError::AdministrativeOrdering(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_directory_overrides_genesis() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    kernel
        .register_agent(AgentId::new(7), AgentRecord::new(0, SecurityCode::from_bytes(*b"N7")))
        .await?;

    assert!(kernel.submit_message(&credentialed(7, b"A7", 1)).await.is_err());
    kernel.submit_message(&credentialed(7, b"N7", 1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_sentinel_registration_rejected() -> Result<()> {
    let (kernel, _) = memory_kernel().await?;
    assert!(matches!(
        kernel.register_agent(AgentId::new(3), AgentRecord::SENTINEL).await,
        Err(KernelError::Authz(_))
    ));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Backend
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sqlite_full_flow_persists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("msgbox.db");
    let config = KernelConfig { chunk_size: 2, ..Default::default() };

    {
        let (kernel, _) = kernel_with(SqliteStore::open(&path)?, config.clone()).await?;
        kernel.submit_message(&credentialed(7, b"A7", 4)).await?;
        kernel.process_batch(&[valid(9, 8), valid(7, 6)]).await?;
        assert_eq!(kernel.height().await?, 2);
    }

    let kernel = Kernel::signed(SqliteStore::open(&path)?, SignedAttester::generate(), config)?;
    assert_eq!(kernel.watermark().await?, Watermark(8));
    assert_eq!(kernel.height().await?, 2);
    assert_eq!(kernel.resolve(AgentId::new(7)).await?.last_message_number, 4);
    assert!(matches!(
        kernel.bootstrap_json(GENESIS).await,
        Err(KernelError::AdministrativeOrdering(_))
    ));
    Ok(())
}
