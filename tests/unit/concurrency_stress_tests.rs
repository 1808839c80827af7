#[cfg(test)]
mod tests_concurrency_stress {
    use parfeed::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn queue_preserves_per_producer_order() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 5_000;

        let queue = Arc::new(TaskQueue::new());
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        queue.enqueue((p, seq));
                    }
                })
            })
            .collect();

        let mut next_seq = [0usize; PRODUCERS];
        let mut received = 0;
        while received < PRODUCERS * PER_PRODUCER {
            match queue.dequeue() {
                Some((p, seq)) => {
                    assert_eq!(seq, next_seq[p], "producer {p} reordered");
                    next_seq[p] += 1;
                    received += 1;
                }
                None => thread::yield_now(),
            }
        }

        for handle in producers {
            handle.join().expect("producer thread panicked");
        }
        assert!(queue.dequeue().is_none());
        assert_eq!(next_seq, [PER_PRODUCER; PRODUCERS]);
    }

    #[test]
    fn lock_never_admits_more_than_max_readers() {
        const MAX_READERS: usize = 3;

        let lock = Arc::new(SyncLock::new(0u64, MAX_READERS));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let writer_inside = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..12)
            .map(|_| {
                let (lock, active, peak, writer_inside) = (
                    Arc::clone(&lock),
                    Arc::clone(&active),
                    Arc::clone(&peak),
                    Arc::clone(&writer_inside),
                );
                thread::spawn(move || {
                    for _ in 0..200 {
                        let guard = lock.read();
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        assert!(!writer_inside.load(Ordering::SeqCst));
                        let _value = *guard;
                        thread::yield_now();
                        active.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        let writer = {
            let (lock, active, writer_inside) =
                (Arc::clone(&lock), Arc::clone(&active), Arc::clone(&writer_inside));
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut guard = lock.write();
                    writer_inside.store(true, Ordering::SeqCst);
                    assert_eq!(active.load(Ordering::SeqCst), 0);
                    *guard += 1;
                    writer_inside.store(false, Ordering::SeqCst);
                }
            })
        };

        for handle in readers {
            handle.join().expect("reader thread panicked");
        }
        writer.join().expect("writer thread panicked");

        assert!(peak.load(Ordering::SeqCst) <= MAX_READERS);
        assert_eq!(*lock.read(), 200);
    }

    #[test]
    fn feed_stays_ordered_under_concurrent_writers() {
        let feed = Arc::new(OrderedFeed::with_max_readers(4));

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let feed = Arc::clone(&feed);
                thread::spawn(move || {
                    for i in 0..250 {
                        let ts = (i * 8 + w) as f64;
                        feed.add(format!("w{w} #{i}"), ts);
                        if i % 5 == 0 {
                            assert!(feed.remove(ts));
                        }
                    }
                })
            })
            .collect();

        let reader = {
            let feed = Arc::clone(&feed);
            thread::spawn(move || {
                for _ in 0..100 {
                    let snapshot = feed.snapshot();
                    assert!(snapshot.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
                }
            })
        };

        for handle in writers {
            handle.join().expect("writer thread panicked");
        }
        reader.join().expect("reader thread panicked");

        assert_eq!(feed.len(), 8 * 200);
    }
}
