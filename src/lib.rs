//! # parfeed: a concurrent feed server
//!
//! `parfeed` processes commands against a single shared feed of timestamped
//! posts. Clients add posts, remove them, test for them and dump the feed;
//! every request gets exactly one response. The feed is always ordered by
//! descending timestamp.
//!
//! ## Execution modes
//!
//! - **Sequential**: one thread decodes each request and applies it before
//!   reading the next.
//! - **Parallel**: a producer decodes requests onto a lock-free queue and a
//!   fixed pool of consumers applies them. Responses may leave in a
//!   different order than requests arrived; the final feed is the same as a
//!   sequential run of the same requests.
//!
//! ## Building blocks
//!
//! - [`SyncLock`]: readers-writer lock from a mutex and condition variable,
//!   with a hard cap on concurrent readers (32 by default). It makes no
//!   fairness promise: a continuous stream of readers can starve a writer.
//! - [`OrderedFeed`]: singly-linked post chain behind one `SyncLock`.
//! - [`TaskQueue`]: unbounded lock-free MPMC FIFO queue using
//!   compare-and-swap on the node chain, with epoch-based reclamation of
//!   retired nodes.
//! - [`Gate`]: counting semaphore coupled with a one-way shutdown flag that
//!   coordinates consumer wake-ups.
//! - [`Dispatcher`]: the producer and consumer loops.
//!
//! ## Example
//!
//! ```rust
//! use parfeed::prelude::*;
//!
//! let dispatcher = Dispatcher::new(ServerConfig::parallel(4));
//! let requests = vec![
//!     Request::add(1, "hello", 100.0),
//!     Request::add(2, "world", 200.0),
//!     Request::done(3),
//! ];
//! let mut responses: Vec<Response> = Vec::new();
//! let summary = dispatcher
//!     .run(requests.into_iter(), &mut responses)
//!     .expect("run succeeds");
//! assert_eq!(summary.processed, 2);
//!
//! let feed = dispatcher.feed().snapshot();
//! assert_eq!(feed[0], FeedEntry::new("world", 200.0));
//! assert_eq!(feed[1], FeedEntry::new("hello", 100.0));
//! ```
//!
//! ## Wire format
//!
//! The `parfeed` binary reads JSON requests from stdin and writes one JSON
//! response per line to stdout:
//!
//! ```text
//! {"command":"ADD","id":1,"body":"hello","timestamp":100.0}
//! {"command":"FEED","id":2}
//! {"command":"DONE"}
//! ```
//!
//! ```text
//! {"id":1,"success":true}
//! {"id":2,"feed":[{"body":"hello","timestamp":100.0}]}
//! ```
//!
//! Run it as `parfeed [consumers]`; a consumer count above one selects
//! parallel mode.

pub mod prelude;
pub mod server;

pub use server::{
    Command, Dispatcher, Feed, FeedEntry, Gate, JsonRequestSource, JsonResponseSink, Mode,
    OrderedFeed, Request, RequestSource, Response, ResponseSink, RunSummary, ServerConfig,
    ServerError, SyncLock, TaskQueue,
};
