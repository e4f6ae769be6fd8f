//! The fold engine.
//!
//! Combines a running accumulator with one message. Inadmissible messages are
//! skipped, never reported: the fold cannot fail. The final value is the
//! maximum admissible message number or the seed, so it does not depend on
//! message order or on how the stream is chunked.

use msgbox_kernel_authz::Resolve;
use msgbox_kernel_core::{is_authorized, is_well_formed, BatchAccumulator, Message, Watermark};
use tracing::trace;

/// Whether a message may raise the watermark.
///
/// The reserved agent bypasses well-formedness and authorization. The agent
/// is resolved either way.
pub fn admissible<R: Resolve + ?Sized>(message: &Message, resolver: &R) -> bool {
    let agent_id = message.agent_id();
    let record = resolver.resolve(agent_id);
    let checks_pass = is_well_formed(&message.details) & is_authorized(&message.details, &record);
    agent_id.is_reserved() | checks_pass
}

/// Fold one message into the accumulator.
pub fn fold_step<R: Resolve + ?Sized>(
    acc: BatchAccumulator,
    message: &Message,
    resolver: &R,
) -> BatchAccumulator {
    let admit = admissible(message, resolver);
    let advances = message.message_number > acc.highest_msg_number;

    trace!(
        agent = %message.agent_id(),
        number = message.message_number,
        admit,
        advances,
        "fold step"
    );

    if admit && advances {
        BatchAccumulator {
            highest_msg_number: message.message_number,
        }
    } else {
        acc
    }
}

/// Fold a whole stream starting from `seed`.
pub fn fold_all<'a, R: Resolve + ?Sized>(
    seed: Watermark,
    messages: impl IntoIterator<Item = &'a Message>,
    resolver: &R,
) -> BatchAccumulator {
    messages
        .into_iter()
        .fold(BatchAccumulator::seeded(seed), |acc, message| {
            fold_step(acc, message, resolver)
        })
}
