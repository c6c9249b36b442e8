use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};
use serde::Serialize;

use crate::gacha::PullResult;

/// One step of a reveal: the result at `index` out of `total`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevealStep {
    pub index: usize,
    pub total: usize,
    pub result: PullResult,
    pub is_last: bool,
}

/// Presentation order of an accepted pull's results. Purely cosmetic: the
/// results are final before the first step is shown, and dropping the
/// sequence part way through changes nothing.
#[derive(Debug, Clone)]
pub struct RevealSequence {
    results: Arc<[PullResult]>,
    interval: Duration,
}

impl RevealSequence {
    pub fn new(results: impl Into<Arc<[PullResult]>>, interval: Duration) -> Self {
        Self { results: results.into(), interval }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Every step, immediately. Each call starts over from the first result.
    pub fn iter(&self) -> impl Iterator<Item = RevealStep> + '_ {
        let total = self.results.len();
        self.results.iter().enumerate().map(move |(index, result)| RevealStep {
            index,
            total,
            result: result.clone(),
            is_last: index + 1 == total,
        })
    }

    /// Steps spaced by the configured interval. The first step is yielded
    /// right away.
    pub fn paced(&self) -> impl Stream<Item = RevealStep> + Send + 'static {
        let results = self.results.clone();
        let interval = self.interval;
        let total = results.len();

        stream::unfold(0usize, move |index| {
            let results = results.clone();
            async move {
                let result = results.get(index)?.clone();
                if index > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                let step = RevealStep { index, total, result, is_last: index + 1 == total };
                Some((step, index + 1))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gacha::{ItemKind, Rarity};
    use futures::StreamExt;
    use std::time::Instant;

    fn results(n: usize) -> Vec<PullResult> {
        (0..n)
            .map(|slot| PullResult {
                slot,
                item_id: format!("item_{}", slot),
                item_type: ItemKind::Hunter,
                name: format!("Item {}", slot),
                rarity: Rarity::Common,
                is_new: slot == 0,
                guarantee: None,
            })
            .collect()
    }

    #[test]
    fn test_iter_is_restartable() {
        let sequence = RevealSequence::new(results(3), Duration::from_millis(800));
        assert_eq!(sequence.len(), 3);

        let first: Vec<RevealStep> = sequence.iter().collect();
        let second: Vec<RevealStep> = sequence.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(first[2].is_last);
        assert!(!first[1].is_last);
    }

    #[tokio::test]
    async fn test_paced_stream_yields_every_step() {
        let sequence = RevealSequence::new(results(10), Duration::from_millis(1));
        let start = Instant::now();
        let steps: Vec<RevealStep> = sequence.paced().collect().await;
        assert_eq!(steps.len(), 10);
        assert_eq!(steps[9].result.item_id, "item_9");
        assert!(steps[9].is_last);
        // nine gaps between ten steps
        assert!(start.elapsed() >= Duration::from_millis(9));
    }

    #[tokio::test]
    async fn test_abandoned_stream_leaves_results_untouched() {
        let original = results(10);
        let sequence = RevealSequence::new(original.clone(), Duration::from_millis(1));
        let partial: Vec<RevealStep> = sequence.paced().take(2).collect().await;
        assert_eq!(partial.len(), 2);

        let replay: Vec<PullResult> = sequence.iter().map(|s| s.result).collect();
        assert_eq!(replay, original);
    }

    #[tokio::test]
    async fn test_empty_sequence() {
        let sequence = RevealSequence::new(Vec::<PullResult>::new(), Duration::from_millis(1));
        assert!(sequence.is_empty());
        let steps: Vec<RevealStep> = sequence.paced().collect().await;
        assert!(steps.is_empty());
    }
}
