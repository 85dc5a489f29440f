use priority_pipeline::{
    BoundedPriorityQueue, ItemSource, LineSink, MemorySink, PipelineBuilder, Sink,
    URGENT_PRIORITY,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn quick_builder() -> PipelineBuilder {
    PipelineBuilder::new()
        .enqueue_timeout(Duration::from_millis(100))
        .dequeue_timeout(Duration::from_millis(50))
}

#[test]
fn test_conservation_and_multiset() {
    init_tracing();
    let pipeline = quick_builder()
        .processors(4)
        .pickers(2)
        .queue_capacity(10)
        .failure_rate_percent(2)
        .build()
        .expect("Pipeline build failed");

    let sink = Arc::new(MemorySink::new());
    let report = pipeline
        .run(ItemSource::new(0..1000u64), Arc::clone(&sink))
        .expect("Run failed");

    assert_eq!(report.emitted, 1000);
    assert_eq!(report.delivered, 1000);
    assert!(report.is_consistent());

    let mut items = sink.items();
    items.sort_unstable();
    assert_eq!(items, (0..1000).collect::<Vec<_>>());
}

#[test]
fn test_scenario_a_empty_source() {
    init_tracing();
    let pipeline = quick_builder()
        .processors(2)
        .pickers(2)
        .build()
        .expect("Pipeline build failed");

    let sink = Arc::new(MemorySink::new());
    let report = pipeline
        .run(ItemSource::new(std::iter::empty::<u64>()), Arc::clone(&sink))
        .expect("Run failed");

    assert_eq!(report.emitted, 0);
    assert_eq!(report.delivered, 0);
    assert!(sink.is_empty());
}

#[test]
fn test_scenario_b_single_workers_sum() {
    init_tracing();
    let pipeline = quick_builder()
        .processors(1)
        .pickers(1)
        .queue_capacity(10)
        .failure_rate_percent(0)
        .build()
        .expect("Pipeline build failed");

    let sink = Arc::new(MemorySink::new());
    let report = pipeline
        .run(ItemSource::new(0..100u64), Arc::clone(&sink))
        .expect("Run failed");

    assert_eq!(report.delivered, 100);
    assert_eq!(sink.items().iter().sum::<u64>(), 4950);
}

#[test]
fn test_scenario_c_maximal_backpressure() {
    init_tracing();
    let pipeline = quick_builder()
        .processors(4)
        .pickers(1)
        .queue_capacity(1)
        .build()
        .expect("Pipeline build failed");

    let sink = Arc::new(MemorySink::new());
    let report = pipeline
        .run(ItemSource::new(0..100u64), Arc::clone(&sink))
        .expect("Run failed");

    assert_eq!(report.emitted, 100);
    assert_eq!(report.delivered, 100);

    let unique: HashSet<u64> = sink.items().into_iter().collect();
    assert_eq!(unique.len(), 100, "an item was duplicated or lost");
}

#[test]
fn test_scenario_d_all_urgent() {
    init_tracing();
    let pipeline = quick_builder()
        .processors(2)
        .pickers(2)
        .queue_capacity(5)
        .failure_rate_percent(100)
        .build()
        .expect("Pipeline build failed");

    let sink = Arc::new(MemorySink::new());
    let report = pipeline
        .run(ItemSource::new(0..200u64), Arc::clone(&sink))
        .expect("Run failed");

    assert_eq!(report.delivered, 200);
    assert_eq!(report.stats.urgent_escalations, 200);
}

// With one processor, enqueue order equals source order; with every
// item urgent, all entries share one priority, so FIFO-by-sequence
// makes the single picker deliver in exact source order even while
// several items are pending.
#[test]
fn test_all_urgent_single_pair_delivers_in_enqueue_order() {
    init_tracing();
    let pipeline = quick_builder()
        .processors(1)
        .pickers(1)
        .queue_capacity(5)
        .failure_rate_percent(100)
        .build()
        .expect("Pipeline build failed");

    let sink = Arc::new(MemorySink::new());
    let report = pipeline
        .run(ItemSource::new(0..200u64), Arc::clone(&sink))
        .expect("Run failed");

    assert_eq!(report.delivered, 200);
    assert_eq!(sink.items(), (0..200).collect::<Vec<_>>());
}

// Claim-token source: each item carries a single-use token, proving no
// item is handed to two processors.
#[test]
fn test_single_handout_claim_tokens() {
    init_tracing();
    let tokens: Arc<Vec<AtomicBool>> = Arc::new((0..500).map(|_| AtomicBool::new(false)).collect());
    let claim_tokens = Arc::clone(&tokens);

    let source = ItemSource::new((0..500usize).map(move |i| {
        let already_claimed = claim_tokens[i].swap(true, Ordering::SeqCst);
        assert!(!already_claimed, "item {i} handed out twice");
        i
    }));

    let pipeline = quick_builder()
        .processors(8)
        .pickers(4)
        .queue_capacity(8)
        .build()
        .expect("Pipeline build failed");

    let sink = Arc::new(MemorySink::new());
    let report = pipeline.run(source, Arc::clone(&sink)).expect("Run failed");

    assert_eq!(report.delivered, 500);
    assert!(tokens.iter().all(|t| t.load(Ordering::SeqCst)));
}

// The queue length may never exceed capacity, sampled while a run with
// heavy contention is in flight.
#[test]
fn test_queue_never_exceeds_capacity() {
    let queue = BoundedPriorityQueue::new(5);
    let max_seen = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let sampler = {
        let queue = Arc::clone(&queue);
        let max_seen = Arc::clone(&max_seen);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                max_seen.fetch_max(queue.len(), Ordering::Relaxed);
                thread::yield_now();
            }
        })
    };

    let mut producers = Vec::new();
    for p in 0..4 {
        let queue = Arc::clone(&queue);
        producers.push(thread::spawn(move || {
            for i in 0..100 {
                let mut item = p * 100 + i;
                while let Err(back) = queue.enqueue(1, item, Duration::from_millis(20)) {
                    item = back;
                }
            }
        }));
    }

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut seen = 0;
            while seen < 400 {
                if queue.dequeue(Duration::from_millis(20)).is_some() {
                    seen += 1;
                }
            }
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    consumer.join().unwrap();
    done.store(true, Ordering::Relaxed);
    sampler.join().unwrap();

    assert!(max_seen.load(Ordering::Relaxed) <= 5);
}

// P5 against the queue directly: strict priority order first, FIFO by
// sequence among equal priorities.
#[test]
fn test_priority_and_fifo_tiebreak() {
    let queue = BoundedPriorityQueue::new(16);
    let timeout = Duration::from_millis(20);

    queue.enqueue(7, "normal-a", timeout).unwrap();
    queue.enqueue(URGENT_PRIORITY, "urgent-1", timeout).unwrap();
    queue.enqueue(7, "normal-b", timeout).unwrap();
    queue.enqueue(URGENT_PRIORITY, "urgent-2", timeout).unwrap();

    assert_eq!(queue.dequeue(timeout), Some("urgent-1"));
    assert_eq!(queue.dequeue(timeout), Some("urgent-2"));
    assert_eq!(queue.dequeue(timeout), Some("normal-a"));
    assert_eq!(queue.dequeue(timeout), Some("normal-b"));
}

// A slow sink keeps pickers busy past many processor exits; the run
// must still terminate and conserve every item.
#[test]
fn test_termination_with_slow_sink() {
    init_tracing();

    struct SlowSink {
        inner: MemorySink<u64>,
    }

    impl Sink<u64> for SlowSink {
        fn append(&self, item: u64) -> std::io::Result<()> {
            thread::sleep(Duration::from_micros(200));
            self.inner.append(item)
        }
    }

    let pipeline = quick_builder()
        .processors(4)
        .pickers(2)
        .queue_capacity(4)
        .build()
        .expect("Pipeline build failed");

    let sink = Arc::new(SlowSink {
        inner: MemorySink::new(),
    });
    let report = pipeline
        .run(ItemSource::new(0..300u64), Arc::clone(&sink))
        .expect("Run failed");

    assert_eq!(report.delivered, 300);
    assert_eq!(sink.inner.len(), 300);
}

// Full run through the file-backed sink: the output file must hold one
// record per line, with line count and value sum matching the source.
#[test]
fn test_line_sink_end_to_end() {
    init_tracing();
    const N: u64 = 5000;

    let dir = std::env::temp_dir().join("priority-pipeline-e2e-test");
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("output.txt");

    let pipeline = quick_builder()
        .processors(4)
        .pickers(2)
        .queue_capacity(10)
        .failure_rate_percent(2)
        .build()
        .expect("Pipeline build failed");

    let sink = Arc::new(LineSink::create(&path).expect("Sink create failed"));
    let report = pipeline
        .run(ItemSource::new(0..N), Arc::clone(&sink))
        .expect("Run failed");

    assert_eq!(report.emitted, N);
    assert_eq!(report.delivered, N);

    let contents = std::fs::read_to_string(&path).expect("Read back failed");
    let values: Vec<u64> = contents
        .lines()
        .map(|line| line.parse().expect("malformed record"))
        .collect();

    assert_eq!(values.len() as u64, N);
    assert_eq!(values.iter().sum::<u64>(), N * (N - 1) / 2);
}

#[test]
fn test_run_report_format() {
    init_tracing();
    let pipeline = quick_builder()
        .processors(1)
        .pickers(1)
        .build()
        .expect("Pipeline build failed");

    let report = pipeline
        .run(ItemSource::new(0..10u64), Arc::new(MemorySink::new()))
        .expect("Run failed");

    let formatted = report.format();
    assert!(formatted.contains("Emitted: 10"));
    assert!(formatted.contains("PASS"));
}
