mod common;

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicU32, AtomicUsize, Ordering},
    },
    time::Duration,
};

use rand::{SeedableRng, rngs::StdRng};
use shufflecli::{
    engine::{
        AggregationSet, BatchWriter, FetchOptions, PageFailurePolicy, Remote, RetryPolicy,
        pagination::{fan_out, fetch_cursor_pages, fetch_offset_pages_sequential, page_offsets},
        retry::parse_retry_after,
    },
    error::{RemoteError, RunError},
    reconcile::{ArtistTriage, TriageSource, fetch_playlist_items},
    types::{ItemRef, Page},
};

use common::{MockCatalog, MemoryStore, Write, track, tracks};

fn rate_limited() -> RemoteError {
    RemoteError::RateLimited {
        retry_after: Duration::from_secs(2),
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_waits_out_rate_limits() {
    let attempts = AtomicU32::new(0);
    let start = tokio::time::Instant::now();

    let result = RetryPolicy::default()
        .execute("test op", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move { if n < 3 { Err(rate_limited()) } else { Ok(42) } }
        })
        .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    // three backoffs of the server-provided 2s
    assert!(start.elapsed() >= Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhausted_after_max_attempts() {
    let attempts = AtomicU32::new(0);

    let result: Result<(), RemoteError> = RetryPolicy::default()
        .execute("test op", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 10);
    match result {
        Err(RemoteError::RetryExhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 10);
            assert!(last.is_rate_limited());
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_retry_does_not_retry_other_errors() {
    let attempts = AtomicU32::new(0);

    let result: Result<(), RemoteError> = RetryPolicy::new(5)
        .execute("test op", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(RemoteError::Status {
                    operation: "test op".to_string(),
                    status: 500,
                    message: "boom".to_string(),
                })
            }
        })
        .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(RemoteError::Status { status: 500, .. })));
}

#[test]
fn test_retry_policy_needs_one_attempt() {
    assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    assert_eq!(RetryPolicy::default().max_attempts, 10);
}

#[test]
fn test_parse_retry_after() {
    assert_eq!(parse_retry_after(Some("7")), Duration::from_secs(7));
    assert_eq!(parse_retry_after(Some(" 3 ")), Duration::from_secs(3));
    assert_eq!(parse_retry_after(Some("soon")), Duration::from_secs(1));
    assert_eq!(parse_retry_after(None), Duration::from_secs(1));
}

#[test]
fn test_page_offsets() {
    assert_eq!(page_offsets(0, 100), Vec::<u32>::new());
    assert_eq!(page_offsets(100, 100), vec![0]);
    assert_eq!(page_offsets(250, 100), vec![0, 100, 200]);
    assert_eq!(page_offsets(3, 0), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_fetch_known_total_issues_one_request_per_page() {
    let items = tracks("p", 250);
    let mock = Arc::new(MockCatalog::new().with_playlist("pl", "Big", items.clone()));
    let remote = Remote::new(mock.clone());

    let fetched = fetch_playlist_items(&remote, "pl").await.unwrap();

    assert_eq!(mock.calls("playlist_total"), 1);
    assert_eq!(mock.calls("playlist_items"), 3);
    assert_eq!(fetched, items);
}

#[tokio::test]
async fn test_failed_page_is_dropped_under_skip() {
    let items = tracks("p", 250);
    let mock = Arc::new(
        MockCatalog::new()
            .with_playlist("pl", "Big", items.clone())
            .fail("playlist_items", 100),
    );
    let remote = Remote::new(mock.clone());

    let fetched = fetch_playlist_items(&remote, "pl").await.unwrap();

    assert_eq!(mock.calls("playlist_items"), 3);
    assert_eq!(fetched.len(), 150);
    assert_eq!(&fetched[..100], &items[..100]);
    assert_eq!(&fetched[100..], &items[200..]);
}

#[tokio::test]
async fn test_failed_page_aborts_under_abort() {
    let mock = Arc::new(
        MockCatalog::new()
            .with_playlist("pl", "Big", tracks("p", 250))
            .fail("playlist_items", 200),
    );
    let remote = Remote::new(mock.clone()).with_fetch_options(FetchOptions {
        on_page_failure: PageFailurePolicy::Abort,
        ..FetchOptions::default()
    });

    let result = fetch_playlist_items(&remote, "pl").await;

    assert!(matches!(result, Err(RemoteError::Status { status: 500, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_page_is_retried() {
    let items = tracks("p", 120);
    let mock = Arc::new(
        MockCatalog::new()
            .with_playlist("pl", "Mid", items.clone())
            .rate_limit("playlist_items", 2),
    );
    let remote = Remote::new(mock.clone());

    let fetched = fetch_playlist_items(&remote, "pl").await.unwrap();

    assert_eq!(fetched.len(), 120);
    assert_eq!(mock.calls("playlist_items"), 4);
}

#[tokio::test]
async fn test_cursor_walk_follows_next_until_absent() {
    let mut mock = MockCatalog::new();
    for i in 0..120 {
        mock = mock.with_artist(&format!("a{}", i), &format!("Artist {}", i), Vec::new());
    }
    let mock = Arc::new(mock);
    let remote = Remote::new(mock.clone());
    let triage = ArtistTriage::new(remote, Arc::new(MemoryStore::default()), "target");

    let artists = triage.fetch_remote().await.unwrap();

    assert_eq!(mock.calls("followed_artists"), 3);
    assert_eq!(artists.len(), 120);
    assert_eq!(artists[0].id, "a0");
    assert_eq!(artists[119].id, "a119");
}

#[tokio::test]
async fn test_cursor_walk_keeps_pages_before_a_failure() {
    let mut mock = MockCatalog::new();
    for i in 0..120 {
        mock = mock.with_artist(&format!("a{}", i), &format!("Artist {}", i), Vec::new());
    }
    let mock = Arc::new(mock.fail("followed_artists", 50));
    let triage = ArtistTriage::new(
        Remote::new(mock.clone()),
        Arc::new(MemoryStore::default()),
        "target",
    );

    let artists = triage.fetch_remote().await.unwrap();

    assert_eq!(mock.calls("followed_artists"), 2);
    assert_eq!(artists.len(), 50);
}

#[tokio::test]
async fn test_cursor_walk_stops_at_empty_page_with_next() {
    let calls = AtomicU32::new(0);
    let remote = Remote::new(Arc::new(MockCatalog::new()));

    let items = fetch_cursor_pages(&remote, "test op", |cursor| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            match n {
                0 => {
                    assert!(cursor.is_none());
                    Ok::<_, RemoteError>(Page::new(vec![1, 2], None, Some("x".to_string())))
                }
                1 => {
                    assert_eq!(cursor.as_deref(), Some("x"));
                    Ok(Page::new(Vec::new(), None, Some("y".to_string())))
                }
                _ => panic!("walk continued past an empty page"),
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(items, vec![1, 2]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_page_dropped_once_retries_run_out() {
    let items = tracks("p", 250);
    let mock = Arc::new(
        MockCatalog::new()
            .with_playlist("pl", "Big", items.clone())
            .rate_limit_at("playlist_items", 100, 5),
    );
    let remote = Remote::new(mock.clone()).with_retry(RetryPolicy::new(2));

    let fetched = fetch_playlist_items(&remote, "pl").await.unwrap();

    // offsets 0 and 200 once, offset 100 twice
    assert_eq!(mock.calls("playlist_items"), 4);
    assert_eq!(fetched.len(), 150);
    assert_eq!(&fetched[..100], &items[..100]);
    assert_eq!(&fetched[100..], &items[200..]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_page_aborts_under_abort() {
    let mock = Arc::new(
        MockCatalog::new()
            .with_playlist("pl", "Big", tracks("p", 250))
            .rate_limit_at("playlist_items", 200, 5),
    );
    let remote = Remote::new(mock.clone())
        .with_retry(RetryPolicy::new(2))
        .with_fetch_options(FetchOptions {
            on_page_failure: PageFailurePolicy::Abort,
            ..FetchOptions::default()
        });

    let result = fetch_playlist_items(&remote, "pl").await;

    match result {
        Err(RemoteError::RetryExhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 2);
            assert!(last.is_rate_limited());
        }
        other => panic!("expected RetryExhausted, got {:?}", other.map(|v| v.len())),
    }
}

#[tokio::test(start_paused = true)]
async fn test_sequential_offsets_one_request_at_a_time() {
    let running = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);
    let requested = std::sync::Mutex::new(Vec::new());
    let all: Vec<u32> = (0..120).collect();
    let remote = Remote::new(Arc::new(MockCatalog::new()));
    let (running, peak, requested, all) = (&running, &peak, &requested, &all);

    let items = fetch_offset_pages_sequential(&remote, "test op", 50, move |offset, limit| {
        requested.lock().unwrap().push(offset);
        async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            running.fetch_sub(1, Ordering::SeqCst);

            let start = offset as usize;
            let end = (start + limit as usize).min(all.len());
            Ok::<_, RemoteError>(Page::new(all[start..end].to_vec(), Some(120), None))
        }
    })
    .await
    .unwrap();

    assert_eq!(&items, all);
    assert_eq!(*requested.lock().unwrap(), vec![0, 50, 100]);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sequential_offsets_skip_failed_page() {
    let remote = Remote::new(Arc::new(MockCatalog::new()));

    let items = fetch_offset_pages_sequential(&remote, "test op", 2, |offset, _limit| async move {
        match offset {
            2 => Err(RemoteError::Status {
                operation: "test op".to_string(),
                status: 500,
                message: "boom".to_string(),
            }),
            _ => Ok(Page::new(vec![offset, offset + 1], Some(6), None)),
        }
    })
    .await
    .unwrap();

    assert_eq!(items, vec![0, 1, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_bounds_concurrency_and_keeps_order() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let (task_running, task_peak) = (Arc::clone(&running), Arc::clone(&peak));
    let results = fan_out((0..20).collect::<Vec<u32>>(), 3, move |i| {
        let running = Arc::clone(&task_running);
        let peak = Arc::clone(&task_peak);
        async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            // later inputs finish first
            tokio::time::sleep(Duration::from_millis(100 - i as u64)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Ok::<u32, RemoteError>(i * 2)
        }
    })
    .await;

    assert!(peak.load(Ordering::SeqCst) <= 3);
    let values: Vec<u32> = results.into_iter().map(Result::unwrap).collect();
    assert_eq!(values, (0..20).map(|i| i * 2).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_aggregation_set_deduplicates() {
    let set = AggregationSet::new();

    assert_eq!(set.insert_all(vec![track("a"), track("b"), track("a")]).await, 2);
    assert_eq!(set.insert_all(vec![track("b"), track("c")]).await, 1);
    assert_eq!(set.len().await, 3);

    let drained = set.drain_shuffled().await;
    let unique: HashSet<&ItemRef> = drained.iter().collect();
    assert_eq!(drained.len(), 3);
    assert_eq!(unique.len(), 3);
    assert!(drained.contains(&track("c")));
    assert!(set.is_empty().await);
}

#[tokio::test]
async fn test_aggregation_set_concurrent_writers() {
    let set = AggregationSet::new();
    let mut handles = Vec::new();

    for worker in 0..8 {
        let set = set.clone();
        handles.push(tokio::spawn(async move {
            // every worker overlaps with the next one by half
            let items = (worker * 50..worker * 50 + 100).map(|i| track(&i.to_string()));
            set.insert_all(items).await
        }));
    }

    let mut added = 0;
    for handle in handles {
        added += handle.await.unwrap();
    }

    assert_eq!(added, 450);
    assert_eq!(set.len().await, 450);
}

#[tokio::test]
async fn test_drain_shuffled_is_a_permutation() {
    let set = AggregationSet::new();
    let input = tracks("t", 200);
    set.insert_all(input.clone()).await;

    let mut drained = set.drain_shuffled().await;
    drained.sort();
    let mut expected = input;
    expected.sort();

    assert_eq!(drained, expected);
}

#[tokio::test]
async fn test_drain_shuffled_has_no_first_position_bias() {
    const N: usize = 5;
    const TRIALS: usize = 5000;

    let input = tracks("t", N);
    let mut sorted = input.clone();
    sorted.sort();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut first = vec![0usize; N];
    let set = AggregationSet::new();

    for _ in 0..TRIALS {
        set.insert_all(input.clone()).await;
        let order = set.drain_shuffled_with(&mut rng).await;
        let position = sorted.iter().position(|t| *t == order[0]).unwrap();
        first[position] += 1;
    }

    let expected = TRIALS as f64 / N as f64;
    let chi_square: f64 = first
        .iter()
        .map(|&observed| (observed as f64 - expected).powi(2) / expected)
        .sum();

    // 4 degrees of freedom: 30.0 is the p ~ 5e-6 critical value
    assert!(chi_square < 30.0, "chi square {} for {:?}", chi_square, first);
}

#[tokio::test]
async fn test_writer_chunks_in_order() {
    let mock = Arc::new(MockCatalog::new().with_playlist("shuffle", "Shuffle", Vec::new()));
    let writer = BatchWriter::new(Remote::new(mock.clone()), "shuffle");
    let items = tracks("w", 250);

    let written = writer.replace_all(&items).await.unwrap();

    assert_eq!(written, 250);
    assert_eq!(mock.calls("replace_playlist_items"), 1);
    assert_eq!(mock.calls("add_playlist_items"), 3);

    let writes = mock.writes();
    assert_eq!(writes[0], Write::Replace(Vec::new()));
    let mut concatenated = Vec::new();
    for write in &writes[1..] {
        match write {
            Write::Add(chunk) => {
                assert!(chunk.len() <= 100);
                concatenated.extend(chunk.iter().cloned());
            }
            Write::Replace(_) => panic!("unexpected replace after clear"),
        }
    }
    assert_eq!(concatenated, items);
    assert_eq!(mock.playlist("shuffle"), items);
}

#[tokio::test]
async fn test_writer_custom_chunk_size() {
    let mock = Arc::new(MockCatalog::new().with_playlist("shuffle", "Shuffle", Vec::new()));
    let writer = BatchWriter::new(Remote::new(mock.clone()), "shuffle").with_chunk_size(7);
    let items = tracks("w", 50);

    writer.append_chunks(&items).await.unwrap();

    assert_eq!(mock.calls("add_playlist_items"), 8);
    assert_eq!(mock.playlist("shuffle"), items);
}

#[tokio::test]
async fn test_writer_empty_list_only_clears() {
    let mock = Arc::new(MockCatalog::new().with_playlist("shuffle", "Shuffle", tracks("old", 3)));
    let writer = BatchWriter::new(Remote::new(mock.clone()), "shuffle");

    assert_eq!(writer.replace_all(&[]).await.unwrap(), 0);
    assert_eq!(mock.calls("replace_playlist_items"), 1);
    assert_eq!(mock.calls("add_playlist_items"), 0);
    assert!(mock.playlist("shuffle").is_empty());
}

#[tokio::test]
async fn test_writer_chunk_failure_is_fatal() {
    let mock = Arc::new(
        MockCatalog::new()
            .with_playlist("shuffle", "Shuffle", Vec::new())
            .fail("add_playlist_items", 1),
    );
    let writer = BatchWriter::new(Remote::new(mock.clone()), "shuffle");

    let result = writer.replace_all(&tracks("w", 250)).await;

    match result {
        Err(RunError::Write { written, total, .. }) => {
            assert_eq!(written, 100);
            assert_eq!(total, 250);
        }
        other => panic!("expected a write error, got {:?}", other.map(|_| ())),
    }
    // nothing after the failing chunk
    assert_eq!(mock.calls("add_playlist_items"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_writer_reports_exhausted_retries() {
    let mock = Arc::new(
        MockCatalog::new()
            .with_playlist("shuffle", "Shuffle", tracks("old", 3))
            .rate_limit("add_playlist_items", 5),
    );
    let remote = Remote::new(mock.clone()).with_retry(RetryPolicy::new(3));
    let writer = BatchWriter::new(remote, "shuffle");

    let result = writer.replace_all(&tracks("w", 150)).await;

    match result {
        Err(RunError::Write {
            written,
            total,
            source: RemoteError::RetryExhausted { attempts, .. },
        }) => {
            assert_eq!(written, 0);
            assert_eq!(total, 150);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected exhausted retries, got {:?}", other.map(|_| ())),
    }
    assert_eq!(mock.calls("replace_playlist_items"), 1);
    assert_eq!(mock.calls("add_playlist_items"), 3);
    // cleared, nothing added
    assert!(mock.playlist("shuffle").is_empty());
}
