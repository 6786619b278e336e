//! Bounded worker pool shared by the network-bound stages.

use std::future::Future;

use futures::stream::{self, StreamExt};

use crate::domain::Candidate;
use crate::stage::{StageOutput, StageWarning};

/// Run `work` over every candidate with at most `width` in flight.
///
/// Completion order is not preserved; membership and count are. A `width`
/// of zero is treated as one.
pub async fn run_pool<F, Fut>(candidates: Vec<Candidate>, width: usize, work: F) -> StageOutput
where
    F: Fn(Candidate) -> Fut,
    Fut: Future<Output = (Candidate, Option<StageWarning>)>,
{
    let finished: Vec<(Candidate, Option<StageWarning>)> = stream::iter(candidates)
        .map(work)
        .buffer_unordered(width.max(1))
        .collect()
        .await;

    let mut output = StageOutput {
        candidates: Vec::with_capacity(finished.len()),
        warnings: Vec::new(),
    };
    for (candidate, warning) in finished {
        output.candidates.push(candidate);
        output.warnings.extend(warning);
    }
    output
}
