//! Balanced combination tree over chunk chains.
//!
//! Leaves are independent chains, one per chunk, all seeded from the same
//! watermark and built concurrently on blocking tasks. Siblings are merged
//! pairwise until one attestation remains. Because the fold is a running
//! maximum, the final output equals that of the sequential chain.

use std::sync::Arc;

use msgbox_kernel_authz::Resolve;
use msgbox_kernel_core::{Message, Watermark};
use tokio::task::JoinSet;
use tracing::debug;

use crate::attestation::BatchAttestation;
use crate::chain::ChainBuilder;
use crate::error::{ChainError, Result};
use crate::proving::{AttestationVerifier, Attester};

/// Build the attestation for `messages` as a combination tree.
pub async fn process_batch_tree<A, V, R>(
    builder: Arc<ChainBuilder<A, V>>,
    resolver: Arc<R>,
    seed: Watermark,
    messages: Vec<Message>,
    chunk_size: usize,
) -> Result<BatchAttestation>
where
    A: Attester + 'static,
    V: AttestationVerifier + 'static,
    R: Resolve + 'static,
{
    if chunk_size == 0 {
        return Err(ChainError::InvalidChunkSize);
    }
    if messages.is_empty() {
        return builder.init_chain(seed);
    }

    let mut tasks = JoinSet::new();
    for (index, chunk) in messages.chunks(chunk_size).enumerate() {
        let chunk = chunk.to_vec();
        let builder = Arc::clone(&builder);
        let resolver = Arc::clone(&resolver);
        tasks.spawn_blocking(move || {
            let init = builder.init_chain(seed)?;
            let leaf = builder.extend_chunk(init, &chunk, resolver.as_ref())?;
            Ok::<_, ChainError>((index, leaf))
        });
    }

    let mut leaves = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (index, leaf) = joined.map_err(|e| ChainError::TaskFailed(e.to_string()))??;
        leaves.push((index, leaf));
    }
    leaves.sort_by_key(|(index, _)| *index);

    let mut level: Vec<BatchAttestation> = leaves.into_iter().map(|(_, leaf)| leaf).collect();
    debug!(leaves = level.len(), "leaf chains attested");

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut pairs = level.into_iter();
        while let Some(left) = pairs.next() {
            match pairs.next() {
                // Identical chunks attest identically; one stands for both.
                Some(right) if right.id()? == left.id()? => next.push(left),
                Some(right) => next.push(builder.merge(&left, &right)?),
                None => next.push(left),
            }
        }
        level = next;
    }

    level
        .pop()
        .ok_or_else(|| ChainError::TaskFailed("no leaves".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proving::{SignatureVerifier, SignedAttester};
    use msgbox_kernel_authz::{Directory, GenesisDirectory, Resolver};
    use msgbox_kernel_core::{AgentId, AgentRecord, LocationReport, SecurityCode};

    fn setup() -> (Arc<ChainBuilder<SignedAttester, SignatureVerifier>>, Arc<Resolver>) {
        let mut directory = Directory::new();
        directory.insert(
            AgentId::new(7),
            AgentRecord::new(0, SecurityCode::from_bytes(*b"A7")),
        );
        (
            Arc::new(ChainBuilder::signed(SignedAttester::generate())),
            Arc::new(Resolver::new(directory, GenesisDirectory::empty())),
        )
    }

    fn message(agent: u64, number: u64) -> Message {
        Message::new(LocationReport::with_checksum(AgentId::new(agent), 10, 6000), number)
    }

    fn inverted(agent: u64, number: u64) -> Message {
        Message::new(LocationReport::with_checksum(AgentId::new(agent), 9000, 8000), number)
    }

    #[tokio::test]
    async fn test_tree_matches_sequential() {
        let (builder, resolver) = setup();
        let messages: Vec<_> = [3, 17, 4, 9, 11, 2, 30]
            .into_iter()
            .enumerate()
            .map(|(i, n)| if i == 6 { inverted(7, n) } else { message(7, n) })
            .collect();

        let sequential = builder
            .process_batch(Watermark(1), &messages, 2, resolver.as_ref())
            .unwrap();
        let tree = process_batch_tree(builder.clone(), resolver, Watermark(1), messages, 2)
            .await
            .unwrap();

        assert_eq!(tree.output(), sequential.output());
        assert_eq!(tree.output().highest_msg_number, 17);
        assert_eq!(tree.statement.steps, 7);
        builder.verifier().verify(&tree).unwrap();
    }

    #[tokio::test]
    async fn test_tree_with_repeated_chunks() {
        let (builder, resolver) = setup();
        let messages = vec![message(7, 5), message(7, 5), message(7, 5), message(7, 2)];

        let sequential = builder
            .process_batch(Watermark(0), &messages, 1, resolver.as_ref())
            .unwrap();
        let tree = process_batch_tree(builder.clone(), resolver, Watermark(0), messages, 1)
            .await
            .unwrap();

        assert_eq!(tree.output(), sequential.output());
        builder.verifier().verify(&tree).unwrap();
    }

    #[tokio::test]
    async fn test_tree_empty_is_seed() {
        let (builder, resolver) = setup();
        let att = process_batch_tree(builder, resolver, Watermark(4), Vec::new(), 3)
            .await
            .unwrap();
        assert_eq!(att.output().highest_msg_number, 4);
    }

    #[tokio::test]
    async fn test_tree_rejects_zero_chunk() {
        let (builder, resolver) = setup();
        let result = process_batch_tree(builder, resolver, Watermark(0), vec![message(7, 1)], 0).await;
        assert!(matches!(result, Err(ChainError::InvalidChunkSize)));
    }
}
