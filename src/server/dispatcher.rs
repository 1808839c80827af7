//! Sequential and parallel request execution.
//!
//! In parallel mode one producer decodes requests and publishes them on a
//! [`TaskQueue`], and `consumers` worker threads drain the queue under a
//! [`Gate`]. A consumer only decides "there is work" versus "the queue is
//! empty" while holding the gate's mutex, and dequeues under that same
//! hold, so two consumers cannot both see "empty" while an item sits in the
//! queue. Responses go through one mutex around the sink so each is written
//! whole; a consumer whose send fails records the error and exits, and the
//! first recorded failure is what [`Dispatcher::run`] returns.
//!
//! Requests are dequeued in the order they were decoded, but consumers
//! apply them concurrently, so responses may be emitted out of submission
//! order. The feed's ordering does not depend on arrival order.

use super::config::{Mode, ServerConfig};
use super::error::ServerError;
use super::feed::{Feed, OrderedFeed};
use super::gate::Gate;
use super::queue::TaskQueue;
use super::serialization::{RequestSource, ResponseSink};
use super::types::{Command, Request};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::{debug, error, info, trace, warn};

/// Outcome of a completed [`Dispatcher::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Mode the run executed in
    pub mode: Mode,

    /// Worker threads used (1 in sequential mode)
    pub consumers: usize,

    /// Requests applied to the feed, `DONE` excluded
    pub processed: u64,
}

/// Executes requests against a shared feed.
#[derive(Debug)]
pub struct Dispatcher<F = OrderedFeed> {
    config: ServerConfig,
    feed: Arc<F>,
}

impl Dispatcher<OrderedFeed> {
    /// Creates a dispatcher over a fresh, empty [`OrderedFeed`].
    pub fn new(config: ServerConfig) -> Self {
        let feed = Arc::new(OrderedFeed::with_max_readers(config.max_readers));
        Dispatcher { config, feed }
    }
}

impl<F: Feed> Dispatcher<F> {
    /// Creates a dispatcher over an existing feed.
    pub fn with_feed(config: ServerConfig, feed: Arc<F>) -> Self {
        Dispatcher { config, feed }
    }

    /// The feed requests are applied to.
    pub fn feed(&self) -> &Arc<F> {
        &self.feed
    }

    /// The run configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Reads requests from `source` until `DONE` or end of input, applies
    /// them and writes one response per applied request to `sink`.
    ///
    /// Returns once every accepted request has been applied and every worker
    /// has exited.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidConfig`] if the configuration does not validate
    /// - [`ServerError::Decode`] / [`ServerError::Io`] from the source; requests
    ///   accepted before the failure are still applied
    /// - [`ServerError::Encode`] / [`ServerError::Io`] from the sink
    /// - [`ServerError::Io`] if a consumer thread cannot be spawned
    /// - [`ServerError::WorkerPanicked`] if a consumer panicked
    pub fn run<S, K>(&self, source: S, sink: K) -> Result<RunSummary, ServerError>
    where
        S: RequestSource,
        K: ResponseSink,
    {
        self.config.validate()?;
        info!(
            "starting {} run with {} consumer(s)",
            self.config.mode, self.config.consumers
        );
        let summary = match self.config.mode {
            Mode::Sequential => self.run_sequential(source, sink),
            Mode::Parallel => self.run_parallel(source, sink),
        }?;
        info!("run finished, {} request(s) processed", summary.processed);
        Ok(summary)
    }

    fn run_sequential<S, K>(&self, mut source: S, mut sink: K) -> Result<RunSummary, ServerError>
    where
        S: RequestSource,
        K: ResponseSink,
    {
        let mut processed = 0;
        loop {
            let request = match source.next_request()? {
                Some(request) if request.command == Command::Done => break,
                Some(request) => request,
                None => {
                    warn!("request stream ended without DONE");
                    break;
                }
            };
            record_request(request.command);
            let response = request.apply(self.feed.as_ref());
            sink.send(&response)?;
            processed += 1;
        }
        sink.flush()?;
        Ok(RunSummary {
            mode: Mode::Sequential,
            consumers: 1,
            processed,
        })
    }

    fn run_parallel<S, K>(&self, source: S, sink: K) -> Result<RunSummary, ServerError>
    where
        S: RequestSource,
        K: ResponseSink,
    {
        let consumers = self.config.consumers;
        let queue = TaskQueue::new();
        let gate = Gate::new(consumers);
        let shared = Mutex::new(SharedSink {
            sink,
            failure: None,
        });
        let processed = AtomicU64::new(0);
        let feed = self.feed.as_ref();

        let (produced, panicked) = thread::scope(|scope| {
            let mut workers = Vec::new();
            let mut spawn_failure = None;
            for worker in 0..consumers {
                let (queue, gate, shared, processed) = (&queue, &gate, &shared, &processed);
                let mut builder =
                    thread::Builder::new().name(format!("parfeed-consumer-{worker}"));
                if let Some(size) = self.config.stack_size {
                    builder = builder.stack_size(size);
                }
                let spawned = builder.spawn_scoped(scope, move || {
                    consume(worker, queue, gate, feed, shared, processed)
                });
                match spawned {
                    Ok(handle) => workers.push(handle),
                    Err(e) => {
                        error!("failed to spawn consumer {}: {}", worker, e);
                        spawn_failure = Some(ServerError::from(e));
                        break;
                    }
                }
            }

            let produced = match spawn_failure {
                Some(e) => {
                    gate.signal_shutdown();
                    Err(e)
                }
                None => produce(source, &queue, &gate),
            };

            let panicked: Vec<usize> = workers
                .into_iter()
                .enumerate()
                .filter_map(|(worker, handle)| handle.join().is_err().then_some(worker))
                .collect();
            (produced, panicked)
        });

        let SharedSink { mut sink, failure } =
            shared.into_inner().unwrap_or_else(PoisonError::into_inner);
        produced?;
        if let Some(e) = failure {
            return Err(e);
        }
        if let Some(&worker) = panicked.first() {
            return Err(ServerError::WorkerPanicked { worker });
        }
        sink.flush()?;

        Ok(RunSummary {
            mode: Mode::Parallel,
            consumers,
            processed: processed.into_inner(),
        })
    }
}

/// The response sink plus the first send failure any consumer hit. Both sit
/// under one mutex, so "first" is the order in which sends failed.
struct SharedSink<K> {
    sink: K,
    failure: Option<ServerError>,
}

/// Signals shutdown when dropped, so consumers drain and exit however the
/// producer stops, unwinding included.
struct ShutdownOnDrop<'a>(&'a Gate);

impl Drop for ShutdownOnDrop<'_> {
    fn drop(&mut self) {
        self.0.signal_shutdown();
    }
}

fn produce<S: RequestSource>(
    mut source: S,
    queue: &TaskQueue<Request>,
    gate: &Gate,
) -> Result<(), ServerError> {
    let _shutdown = ShutdownOnDrop(gate);
    loop {
        match source.next_request() {
            Ok(Some(request)) if request.command == Command::Done => {
                debug!("producer received DONE");
                return Ok(());
            }
            Ok(Some(request)) => {
                trace!("enqueue {} id={}", request.command, request.id);
                queue.enqueue(request);
                record_queue_depth(queue.len());
                gate.notify_work();
            }
            Ok(None) => {
                warn!("request stream ended without DONE");
                return Ok(());
            }
            Err(e) => {
                error!("producer stopped: {}", e);
                return Err(e);
            }
        }
    }
}

fn consume<F, K>(
    worker: usize,
    queue: &TaskQueue<Request>,
    gate: &Gate,
    feed: &F,
    shared: &Mutex<SharedSink<K>>,
    processed: &AtomicU64,
) where
    F: Feed + ?Sized,
    K: ResponseSink,
{
    debug!("consumer {} started", worker);
    loop {
        let mut permit = gate.acquire();
        permit.wait_for_work(|| !queue.is_empty());
        let task = queue.dequeue();
        let finished = permit.is_finished();
        drop(permit);

        let Some(request) = task else {
            if finished {
                break;
            }
            continue;
        };

        record_request(request.command);
        let response = request.apply(feed);
        let mut out = shared.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.sink.send(&response) {
            error!("consumer {} failed to send response {}: {}", worker, response.id, e);
            if out.failure.is_none() {
                out.failure = Some(e);
            }
            return;
        }
        drop(out);
        processed.fetch_add(1, Ordering::Relaxed);
    }
    debug!("consumer {} exiting", worker);
}

#[cfg(feature = "metrics")]
fn record_request(command: Command) {
    metrics::counter!("parfeed_requests_total", "command" => command.as_str()).increment(1);
}

#[cfg(not(feature = "metrics"))]
fn record_request(_command: Command) {}

#[cfg(feature = "metrics")]
fn record_queue_depth(depth: usize) {
    metrics::gauge!("parfeed_queue_depth").set(depth as f64);
}

#[cfg(not(feature = "metrics"))]
fn record_queue_depth(_depth: usize) {}
