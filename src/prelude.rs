//! Prelude module that re-exports commonly used types and traits.
//!
//! ```rust
//! use parfeed::prelude::*;
//! ```

// Feed
pub use crate::server::{Feed, FeedEntry, OrderedFeed};

// Requests and responses
pub use crate::server::{Command, Request, Response};

// Running a server
pub use crate::server::{
    Dispatcher, JsonRequestSource, JsonResponseSink, Mode, RequestSource, ResponseSink,
    RunSummary, ServerConfig, ServerError,
};

// Concurrency primitives
pub use crate::server::{Gate, SyncLock, TaskQueue};
