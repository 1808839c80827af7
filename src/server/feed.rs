//! The ordered feed of posts and the [`Feed`] capability it implements.

use super::lock::{DEFAULT_MAX_READERS, SyncLock};
use serde::{Deserialize, Serialize};
use std::iter;
use tracing::trace;

/// The operations a dispatcher needs from a feed.
///
/// Implementations synchronize internally; every method takes `&self` and
/// may be called from any number of threads.
pub trait Feed: Send + Sync {
    /// Inserts a post, keeping the feed ordered most-recent-first.
    fn add(&self, body: String, timestamp: f64);

    /// Removes the first post with exactly this timestamp.
    ///
    /// Returns `false`, leaving the feed unchanged, when no post matches.
    fn remove(&self, timestamp: f64) -> bool;

    /// Whether a post with exactly this timestamp is present.
    fn contains(&self, timestamp: f64) -> bool;

    /// A detached copy of the feed, most recent post first.
    fn snapshot(&self) -> Vec<FeedEntry>;
}

/// One post as it appears in a feed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Text of the post
    pub body: String,

    /// Unix timestamp of the post
    pub timestamp: f64,
}

impl FeedEntry {
    /// Creates a snapshot entry.
    pub fn new(body: impl Into<String>, timestamp: f64) -> Self {
        FeedEntry {
            body: body.into(),
            timestamp,
        }
    }
}

#[derive(Debug)]
struct Post {
    body: String,
    timestamp: f64,
    next: Option<Box<Post>>,
}

/// The singly-linked post chain. Ordered by non-increasing timestamp.
#[derive(Debug, Default)]
struct Chain {
    head: Option<Box<Post>>,
}

impl Chain {
    fn iter(&self) -> impl Iterator<Item = &Post> {
        iter::successors(self.head.as_deref(), |post| post.next.as_deref())
    }

    /// Links a new post in front of the first post whose timestamp is
    /// strictly smaller than `timestamp`, except that a post with an equal
    /// timestamp goes after the head and before any later equal post.
    ///
    /// Timestamps compare with `f64::total_cmp`, so a NaN has a fixed place
    /// in the chain instead of stopping every later scan at the head.
    fn insert(&mut self, body: String, timestamp: f64) {
        let mut cursor = &mut self.head;
        if cursor
            .as_ref()
            .is_some_and(|head| head.timestamp.total_cmp(&timestamp).is_ge())
        {
            if let Some(head) = cursor {
                cursor = &mut head.next;
            }
        }
        while cursor
            .as_ref()
            .is_some_and(|post| post.timestamp.total_cmp(&timestamp).is_gt())
        {
            if let Some(post) = cursor {
                cursor = &mut post.next;
            }
        }
        let next = cursor.take();
        *cursor = Some(Box::new(Post {
            body,
            timestamp,
            next,
        }));
    }

    fn unlink(&mut self, timestamp: f64) -> bool {
        let mut cursor = &mut self.head;
        while cursor
            .as_ref()
            .is_some_and(|post| post.timestamp != timestamp)
        {
            if let Some(post) = cursor {
                cursor = &mut post.next;
            }
        }
        match cursor.take() {
            Some(mut found) => {
                *cursor = found.next.take();
                true
            }
            None => false,
        }
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        // Unlink iteratively; the default recursive drop overflows the stack
        // on long feeds.
        let mut next = self.head.take();
        while let Some(mut post) = next {
            next = post.next.take();
        }
    }
}

/// A feed kept sorted by descending timestamp, guarded by one [`SyncLock`].
///
/// Writers (`add`, `remove`) take the lock exclusively; readers (`contains`,
/// `snapshot`) share it up to the lock's reader cap. Every scan runs to
/// completion once the lock is held.
#[derive(Debug)]
pub struct OrderedFeed {
    chain: SyncLock<Chain>,
}

impl OrderedFeed {
    /// Creates an empty feed admitting up to [`DEFAULT_MAX_READERS`]
    /// concurrent readers.
    pub fn new() -> Self {
        Self::with_max_readers(DEFAULT_MAX_READERS)
    }

    /// Creates an empty feed with a custom reader cap.
    pub fn with_max_readers(max_readers: usize) -> Self {
        OrderedFeed {
            chain: SyncLock::new(Chain::default(), max_readers),
        }
    }

    /// Number of posts currently in the feed.
    pub fn len(&self) -> usize {
        self.chain.read().iter().count()
    }

    /// Whether the feed holds no posts.
    pub fn is_empty(&self) -> bool {
        self.chain.read().head.is_none()
    }

    /// The reader cap of the underlying lock.
    pub fn max_readers(&self) -> usize {
        self.chain.max_readers()
    }
}

impl Default for OrderedFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Feed for OrderedFeed {
    fn add(&self, body: String, timestamp: f64) {
        trace!("feed add timestamp={}", timestamp);
        self.chain.write().insert(body, timestamp);
    }

    fn remove(&self, timestamp: f64) -> bool {
        let removed = self.chain.write().unlink(timestamp);
        trace!("feed remove timestamp={} removed={}", timestamp, removed);
        removed
    }

    fn contains(&self, timestamp: f64) -> bool {
        self.chain
            .read()
            .iter()
            .any(|post| post.timestamp == timestamp)
    }

    fn snapshot(&self) -> Vec<FeedEntry> {
        let chain = self.chain.read();
        chain
            .iter()
            .map(|post| FeedEntry::new(post.body.clone(), post.timestamp))
            .collect()
    }
}
