//! Request and response values exchanged with the dispatcher.

use super::feed::{Feed, FeedEntry};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// The operation a [`Request`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    /// Insert a post.
    Add,
    /// Remove the post with a given timestamp.
    Remove,
    /// Test for a post with a given timestamp.
    Contains,
    /// Return a snapshot of the whole feed.
    Feed,
    /// Stop accepting requests and drain the ones already accepted.
    Done,
}

impl Command {
    /// The wire name of the command.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Add => "ADD",
            Command::Remove => "REMOVE",
            Command::Contains => "CONTAINS",
            Command::Feed => "FEED",
            Command::Done => "DONE",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded client request.
///
/// `body` is only meaningful for `ADD` and `timestamp` only for `ADD`,
/// `REMOVE` and `CONTAINS`; absent fields decode to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The requested operation
    pub command: Command,

    /// Client-chosen identifier echoed in the response
    #[serde(default)]
    pub id: i64,

    /// Text of the post for `ADD`
    #[serde(default)]
    pub body: String,

    /// Timestamp the operation targets
    #[serde(default)]
    pub timestamp: f64,
}

impl Request {
    /// An `ADD` request.
    pub fn add(id: i64, body: impl Into<String>, timestamp: f64) -> Self {
        Request {
            command: Command::Add,
            id,
            body: body.into(),
            timestamp,
        }
    }

    /// A `REMOVE` request.
    pub fn remove(id: i64, timestamp: f64) -> Self {
        Self::bare(Command::Remove, id, timestamp)
    }

    /// A `CONTAINS` request.
    pub fn contains(id: i64, timestamp: f64) -> Self {
        Self::bare(Command::Contains, id, timestamp)
    }

    /// A `FEED` request.
    pub fn feed(id: i64) -> Self {
        Self::bare(Command::Feed, id, 0.0)
    }

    /// A `DONE` request.
    pub fn done(id: i64) -> Self {
        Self::bare(Command::Done, id, 0.0)
    }

    fn bare(command: Command, id: i64, timestamp: f64) -> Self {
        Request {
            command,
            id,
            body: String::new(),
            timestamp,
        }
    }

    /// Applies the request to `feed` and builds its response.
    ///
    /// An `ADD` whose timestamp is NaN or infinite is refused with
    /// `success: false` and leaves the feed untouched.
    ///
    /// `DONE` is a control message that the run loops consume themselves;
    /// applied directly it leaves the feed untouched and yields a bare
    /// response carrying only the id.
    pub fn apply<F>(self, feed: &F) -> Response
    where
        F: Feed + ?Sized,
    {
        trace!("applying {} id={}", self.command, self.id);
        match self.command {
            Command::Add if !self.timestamp.is_finite() => {
                debug!("rejecting ADD id={} with timestamp {}", self.id, self.timestamp);
                Response::success(self.id, false)
            }
            Command::Add => {
                feed.add(self.body, self.timestamp);
                Response::success(self.id, true)
            }
            Command::Remove => Response::success(self.id, feed.remove(self.timestamp)),
            Command::Contains => Response::success(self.id, feed.contains(self.timestamp)),
            Command::Feed => Response::feed(self.id, feed.snapshot()),
            Command::Done => Response {
                id: self.id,
                success: None,
                feed: None,
            },
        }
    }
}

/// The result of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Identifier of the request this answers
    pub id: i64,

    /// Outcome of `ADD`, `REMOVE` and `CONTAINS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    /// Feed snapshot, most recent post first, for `FEED`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed: Option<Vec<FeedEntry>>,
}

impl Response {
    /// A response reporting a success flag.
    pub fn success(id: i64, success: bool) -> Self {
        Response {
            id,
            success: Some(success),
            feed: None,
        }
    }

    /// A response carrying a feed snapshot.
    pub fn feed(id: i64, feed: Vec<FeedEntry>) -> Self {
        Response {
            id,
            success: None,
            feed: Some(feed),
        }
    }
}
