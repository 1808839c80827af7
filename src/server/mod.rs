//! Feed server: the ordered feed, its synchronization primitives and the
//! dispatcher that applies requests to it.

pub mod config;
pub mod dispatcher;
pub mod error;
/// Ordered post feed and the `Feed` capability.
pub mod feed;
/// Counting semaphore with shutdown flag for the consumer pool.
pub mod gate;
pub mod lock;
/// Lock-free task queue.
pub mod queue;
pub mod serialization;
pub mod types;

pub use config::{Mode, ServerConfig};
pub use dispatcher::{Dispatcher, RunSummary};
pub use error::ServerError;
pub use feed::{Feed, FeedEntry, OrderedFeed};
pub use gate::{Gate, GatePermit};
pub use lock::{DEFAULT_MAX_READERS, SyncLock, SyncReadGuard, SyncWriteGuard};
pub use queue::TaskQueue;
pub use serialization::{JsonRequestSource, JsonResponseSink, RequestSource, ResponseSink};
pub use types::{Command, Request, Response};
