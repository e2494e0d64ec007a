//! Heap accounting across the delivery pipeline
//!
//! Runs with the counting allocator installed, so this file holds a single
//! test to keep other threads from disturbing the measurement.

use tidelog::prelude::*;
use tidelog::{allocated_memory, CountingAllocator};

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

#[test]
fn test_pipeline_releases_messages() {
    let service = Service::new();
    service.start().unwrap();
    let memory = MemorySink::new("memory");
    let logger = service
        .create_logger(vec![SinkHandle::new(memory.clone())], "heap", true)
        .unwrap();

    // Each queued message owns a 1 KiB buffer, so a leak of even a few
    // messages shows up well above the noise threshold.
    let before_live = allocated_memory();
    for i in 0..1_000 {
        logger.log_fmt(LogLevel::Info, format_args!("live {}", i));
    }
    service.stop();
    assert_eq!(memory.len(), 1_000);
    memory.clear();
    let after_live = allocated_memory();
    assert!(
        after_live - before_live < 64 * 1024,
        "delivered messages leaked {} bytes",
        after_live - before_live
    );

    // Submissions after stop are allocated and immediately destroyed
    let before_discard = allocated_memory();
    for i in 0..1_000 {
        logger.log_fmt(LogLevel::Info, format_args!("discarded {}", i));
    }
    let after_discard = allocated_memory();
    assert_eq!(service.metrics().discarded(), 1_000);
    assert!(
        after_discard - before_discard < 1024,
        "discarded messages leaked {} bytes",
        after_discard - before_discard
    );

    drop(logger);
}
