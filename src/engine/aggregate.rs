use std::{collections::HashSet, sync::Arc};

use rand::{Rng, seq::SliceRandom};
use tokio::sync::Mutex;

use crate::types::ItemRef;

/// The deduplicated set of tracks collected during one run.
///
/// Clones share the same underlying set, so the handle can be passed to
/// concurrent tasks. Each run creates its own set; nothing is global.
#[derive(Debug, Clone, Default)]
pub struct AggregationSet {
    inner: Arc<Mutex<HashSet<ItemRef>>>,
}

impl AggregationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts every item, ignoring ones already present.
    ///
    /// Returns how many items were new.
    pub async fn insert_all<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = ItemRef>,
    {
        let mut set = self.inner.lock().await;
        items
            .into_iter()
            .fold(0, |added, item| if set.insert(item) { added + 1 } else { added })
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Empties the set and returns its members in uniformly random order.
    pub async fn drain_shuffled(&self) -> Vec<ItemRef> {
        let mut items = self.drain().await;
        items.shuffle(&mut rand::rng());
        items
    }

    /// Same as [`drain_shuffled`](Self::drain_shuffled) with a caller supplied
    /// random source.
    pub async fn drain_shuffled_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<ItemRef> {
        let mut items = self.drain().await;
        items.shuffle(rng);
        items
    }

    async fn drain(&self) -> Vec<ItemRef> {
        let mut set = self.inner.lock().await;
        let mut items: Vec<ItemRef> = set.drain().collect();
        // HashSet order depends on the hasher seed; fix it before shuffling
        // so only the rng decides the final order.
        items.sort_unstable();
        items
    }
}
