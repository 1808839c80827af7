#[cfg(test)]
mod tests_equivalence {
    use parfeed::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    const SEEDED: usize = 400;
    const REQUESTS: usize = 1000;

    /// A feed pre-populated with posts at `0.0, 1.0, ..`.
    fn seeded_feed() -> Arc<OrderedFeed> {
        let feed = Arc::new(OrderedFeed::new());
        for i in 0..SEEDED {
            feed.add(format!("seed {i}"), i as f64);
        }
        feed
    }

    /// Interleaved requests whose outcomes do not depend on execution order:
    /// adds use fresh timestamps, removes target distinct seeded posts and
    /// lookups target seeded posts nothing removes.
    fn workload() -> Vec<Request> {
        let mut requests = Vec::with_capacity(REQUESTS + 1);
        let mut next_remove = 0;
        for i in 0..REQUESTS {
            let id = i as i64;
            let request = match i % 3 {
                0 => Request::add(id, format!("post {i}"), 10_000.0 + i as f64 * 0.25),
                1 if next_remove < SEEDED / 2 => {
                    let ts = (next_remove * 2) as f64;
                    next_remove += 1;
                    Request::remove(id, ts)
                }
                _ => Request::contains(id, ((i % (SEEDED / 2)) * 2 + 1) as f64),
            };
            requests.push(request);
        }
        requests.push(Request::done(REQUESTS as i64));
        requests
    }

    fn run(config: ServerConfig) -> (Vec<FeedEntry>, HashMap<i64, Response>) {
        let dispatcher = Dispatcher::with_feed(config, seeded_feed());
        let mut responses: Vec<Response> = Vec::new();
        let summary = dispatcher
            .run(workload().into_iter(), &mut responses)
            .expect("run succeeds");
        assert_eq!(summary.processed, REQUESTS as u64);
        assert_eq!(responses.len(), REQUESTS);

        let by_id = responses.into_iter().map(|r| (r.id, r)).collect();
        (dispatcher.feed().snapshot(), by_id)
    }

    #[test]
    fn parallel_run_matches_sequential_run() {
        let (sequential_feed, sequential_responses) = run(ServerConfig::sequential());
        let (parallel_feed, parallel_responses) = run(ServerConfig::parallel(8));

        assert_eq!(parallel_feed, sequential_feed);
        assert_eq!(parallel_responses, sequential_responses);
    }

    #[test]
    fn parallel_feed_stays_ordered() {
        let (feed, responses) = run(ServerConfig::parallel(8));

        assert!(
            feed.windows(2).all(|w| w[0].timestamp >= w[1].timestamp),
            "feed out of order"
        );
        assert!(responses.values().all(|r| r.success == Some(true)));
    }

    #[test]
    fn single_consumer_matches_many_consumers() {
        let (one, _) = run(ServerConfig::parallel(1));
        let (many, _) = run(ServerConfig::parallel(16));
        assert_eq!(one, many);
    }
}
