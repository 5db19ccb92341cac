//! Pagination covers every labelled message exactly once, including runs of
//! messages received at the same instant.

#![allow(clippy::unwrap_used)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{Archive, timestamp};
use mailvault_core::{ArchiveSession, ListRequest, QueryEngine, SortField, SortOrder};
use proptest::prelude::*;

/// Messages `1..=messages`; every `same_time` consecutive numbers share a timestamp.
async fn build(archive: &Archive, messages: i64, labelled_every: i64, same_time: i64) {
    let alice = archive.account("alice").await;
    for num in 1..=messages {
        let labels: &[&str] = if num % labelled_every == 0 {
            &["INBOX", "Other"]
        } else {
            &["Other"]
        };
        alice
            .message_at(num, &timestamp(num / same_time), "ann@example.com", "Hi", labels)
            .await;
    }
    alice.finish().await;
}

async fn collect_pages(engine: &QueryEngine, page_size: u32, order: SortOrder) -> Vec<i64> {
    let total = engine.count_by_label("INBOX").await.unwrap();
    let pages = u32::try_from(total).unwrap().div_ceil(page_size);
    let mut seen = Vec::new();
    for page in 1..=pages {
        let request = ListRequest::new("INBOX", page_size)
            .page(page)
            .sorted(SortField::Date, order);
        let listed = engine.list_by_label(&request).await.unwrap();
        assert_eq!(listed.total, total);
        assert!(listed.messages.len() <= page_size as usize);
        seen.extend(listed.messages.into_iter().map(|m| m.message_num));
    }
    seen
}

#[tokio::test]
async fn test_same_timestamp_pages_by_message_num() {
    let archive = Archive::new();
    let alice = archive.account("alice").await;
    for num in 1..=7 {
        alice
            .message_at(num, "2024-03-01 08:00:00", "ann@example.com", "Batch", &["INBOX"])
            .await;
    }
    alice
        .message_at(8, "2024-02-01 08:00:00", "ann@example.com", "Older", &["INBOX"])
        .await;
    alice
        .message_at(9, "2024-04-01 08:00:00", "ann@example.com", "Newer", &["INBOX"])
        .await;
    alice.finish().await;
    let engine = QueryEngine::new(Arc::new(ArchiveSession::new(&archive.config())));

    let ascending = collect_pages(&engine, 3, SortOrder::Asc).await;
    assert_eq!(ascending, [8, 1, 2, 3, 4, 5, 6, 7, 9]);

    let descending = collect_pages(&engine, 3, SortOrder::Desc).await;
    assert_eq!(descending, [9, 7, 6, 5, 4, 3, 2, 1, 8]);

    let second = ListRequest::new("INBOX", 3)
        .page(2)
        .sorted(SortField::Date, SortOrder::Desc);
    for _ in 0..3 {
        let listed = engine.list_by_label(&second).await.unwrap();
        let nums: Vec<_> = listed.messages.iter().map(|m| m.message_num).collect();
        assert_eq!(nums, [5, 4, 3]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_pages_partition_label(
        messages in 0i64..40,
        labelled_every in 1i64..4,
        page_size in 1u32..12,
        same_time in 1i64..5,
        ascending in any::<bool>(),
    ) {
        tokio_test::block_on(async {
            let archive = Archive::new();
            build(&archive, messages, labelled_every, same_time).await;
            let engine = QueryEngine::new(Arc::new(ArchiveSession::new(&archive.config())));
            if messages == 0 {
                // Nothing to page through.
                assert!(engine.list_labels().await.unwrap().is_empty());
                return;
            }

            let order = if ascending { SortOrder::Asc } else { SortOrder::Desc };
            let total = engine.count_by_label("INBOX").await.unwrap();
            assert_eq!(total, messages / labelled_every);

            let seen = collect_pages(&engine, page_size, order).await;

            let unique: HashSet<_> = seen.iter().copied().collect();
            assert_eq!(seen.len(), unique.len());
            assert_eq!(i64::try_from(seen.len()).unwrap(), total);

            let mut sorted = seen.clone();
            sorted.sort_unstable();
            if !ascending {
                sorted.reverse();
            }
            assert_eq!(seen, sorted);

            engine.session().close().await;
        });
    }
}
