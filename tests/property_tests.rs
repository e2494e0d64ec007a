//! Property-based tests for tidelog using proptest

use proptest::prelude::*;
use tidelog::core::{IntrusiveQueue, Link, Linked};
use tidelog::prelude::*;
use tidelog::{Buffer2K, Manifest, MessageBuffer};

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Fatal),
    ]
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Parsing accepts any letter case of the canonical name
    #[test]
    fn test_log_level_parse_any_case(level in any_level(), mask in any::<u8>()) {
        let mixed: String = level
            .to_str()
            .chars()
            .enumerate()
            .map(|(i, c)| if mask & (1 << (i % 8)) != 0 { c.to_ascii_lowercase() } else { c })
            .collect();
        let parsed: LogLevel = mixed.parse().unwrap();
        prop_assert_eq!(parsed, level);
    }

    /// Ordering matches the numeric representation
    #[test]
    fn test_log_level_ordering(a in any_level(), b in any_level()) {
        prop_assert_eq!(a <= b, a.as_u8() <= b.as_u8());
        prop_assert_eq!(LogLevel::from_u8(a.as_u8()), a);
    }
}

// ============================================================================
// MessageBuffer Tests
// ============================================================================

proptest! {
    /// Append then peek returns the appended bytes, truncated at capacity
    #[test]
    fn test_append_then_peek(
        first in prop::collection::vec(any::<u8>(), 0..3000),
        second in prop::collection::vec(any::<u8>(), 0..3000),
    ) {
        let mut buf = Buffer2K::new();
        let written_first = buf.append(&first);
        prop_assert_eq!(written_first, first.len().min(Buffer2K::CAPACITY));

        let written_second = buf.append(&second);
        prop_assert_eq!(written_second, second.len().min(Buffer2K::CAPACITY - written_first));

        let mut expected = first[..written_first].to_vec();
        expected.extend_from_slice(&second[..written_second]);

        let mut out = vec![0u8; expected.len()];
        prop_assert_eq!(buf.peek(&mut out), expected.len());
        prop_assert_eq!(&out, &expected);
        prop_assert_eq!(buf.readable(), expected.len());
    }

    /// Prepend succeeds exactly when there is room in front of the read cursor
    #[test]
    fn test_prepend_respects_prependable(
        reserved in 0usize..64,
        prefix in prop::collection::vec(any::<u8>(), 0..96),
        payload in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let mut buf = MessageBuffer::<256>::with_prefix_space(reserved);
        buf.append(&payload);

        let fits = prefix.len() <= buf.prependable();
        prop_assert_eq!(buf.prepend(&prefix), fits);

        if fits {
            prop_assert!(buf.as_bytes().starts_with(&prefix));
            prop_assert_eq!(&buf.as_bytes()[prefix.len()..], &payload[..]);
        } else {
            prop_assert_eq!(buf.as_bytes(), &payload[..]);
        }
    }

    /// Compaction keeps the unread bytes and frees the consumed front
    #[test]
    fn test_shrink_preserves_content(
        payload in prop::collection::vec(any::<u8>(), 1..512),
        consume in 0usize..512,
    ) {
        let mut buf = MessageBuffer::<512>::new();
        buf.append(&payload);
        let consumed = buf.consume(consume);
        let remaining = payload[consumed..].to_vec();

        buf.shrink();
        prop_assert_eq!(buf.prependable(), 0);
        prop_assert_eq!(buf.as_bytes(), &remaining[..]);
        prop_assert_eq!(buf.writable(), 512 - remaining.len());
    }
}

// ============================================================================
// Queue Tests
// ============================================================================

struct Item {
    value: u32,
    link: Link<Item>,
}

impl Linked for Item {
    fn link(&self) -> &Link<Self> {
        &self.link
    }
}

proptest! {
    /// A single producer's pushes come back out in order, across batches
    #[test]
    fn test_queue_is_fifo(values in prop::collection::vec(any::<u32>(), 0..200), split in 0usize..200) {
        let queue = IntrusiveQueue::new();
        let split = split.min(values.len());
        let mut drained = Vec::new();

        for (i, &value) in values.iter().enumerate() {
            let was_empty = queue.push_back(Box::new(Item { value, link: Link::new() }));
            prop_assert_eq!(was_empty, i == 0 || i == split);
            if i + 1 == split {
                drained.extend(queue.take_batch().map(|item| item.value));
            }
        }
        drained.extend(queue.take_batch().map(|item| item.value));

        prop_assert_eq!(drained, values);
        prop_assert!(queue.is_empty());
    }
}

// ============================================================================
// Manifest Tests
// ============================================================================

proptest! {
    /// Rotation never moves the segment backwards
    #[test]
    fn test_manifest_next_is_monotonic(
        day in 0u32..30_000_000,
        seq in 0u32..10_000,
        today in 19_700_101u32..30_000_000,
    ) {
        let current = Manifest::new(day, seq);
        let next = current.next(today);
        prop_assert!(next > current);
        if today > day {
            prop_assert_eq!(next, Manifest::new(today, 0));
        } else {
            prop_assert_eq!(next, Manifest::new(day, seq + 1));
        }
    }
}
