//! End-to-end pipeline run into a line-per-record output file.
//!
//! Drains a 5000-item source through the processor and picker pools into
//! `output.txt`, then reads the file back and checks line count and
//! value sum against the source.
//!
//! Usage: cargo run --example queue_run --release

use priority_pipeline::{ItemSource, LineSink, PipelineBuilder};
use std::sync::Arc;
use std::time::Duration;

const SOURCE_SIZE: u64 = 5000;
const OUTPUT_FILE: &str = "output.txt";

fn main() -> priority_pipeline::Result<()> {
    let pipeline = PipelineBuilder::new()
        .processors(4)
        .pickers(2)
        .queue_capacity(10)
        .failure_rate_percent(2)
        .enqueue_timeout(Duration::from_millis(500))
        .dequeue_timeout(Duration::from_millis(100))
        .build()?;

    let sink = Arc::new(LineSink::create(OUTPUT_FILE)?);
    let report = pipeline.run(ItemSource::new(0..SOURCE_SIZE), Arc::clone(&sink))?;
    println!("{}", report.format());

    // Read the file back and verify the records survived intact.
    let contents = std::fs::read_to_string(OUTPUT_FILE)?;
    let mut count: u64 = 0;
    let mut sum: u64 = 0;
    for line in contents.lines() {
        count += 1;
        sum += line.parse::<u64>().expect("malformed record");
    }

    let expected_sum = SOURCE_SIZE * (SOURCE_SIZE - 1) / 2;
    println!(
        "{OUTPUT_FILE}: {count} records, sum {sum} (expected {SOURCE_SIZE} records, sum {expected_sum})"
    );
    assert_eq!(count, SOURCE_SIZE);
    assert_eq!(sum, expected_sum);
    println!("Verification passed");

    Ok(())
}
