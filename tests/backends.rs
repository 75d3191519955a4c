//! Store contract checks shared by every backend.
//!
//! The memory backend always runs. The durable backends run with
//! `cargo test -- --ignored` and need a live server:
//!
//! - `DATABASE_URL` for PostgreSQL;
//! - `MONGO_URL` for MongoDB (a fresh database is created per run).
//!
//! Rows are tagged with a per-run `source` so reruns against the same
//! database stay independent.

#![allow(clippy::panic)]

use std::time::Duration;

use chrono::Utc;

use virality_analyzer::domain::{
    EngagementEvent, LEADERBOARD_SIZE, NOMINAL_STATUS, Payload, SortBy, Stats, TrendingParams,
};
use virality_analyzer::store::{MemoryStore, MongoStore, PostgresStore, SnapshotStore};

fn run_tag(backend: &str) -> String {
    format!(
        "{backend}-{}",
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

fn event(tag: &str, id: &str, data_type: &str, views: u64, likes: u64) -> EngagementEvent {
    EngagementEvent {
        source: tag.to_string(),
        event_time: None,
        data_type: data_type.to_string(),
        payload: Payload {
            platform_id: format!("{tag}-{id}"),
            description: format!("clip {id}"),
            stats: Stats {
                views,
                likes,
                comments: 0,
                shares: 0,
            },
            ..Payload::default()
        },
    }
}

fn page(tag: &str, sort_by: SortBy, page: u64, limit: u64) -> TrendingParams {
    TrendingParams {
        sort_by,
        platform: Some(tag.to_string()),
        page,
        limit,
    }
}

async fn save(store: &dyn SnapshotStore, event: &EngagementEvent) {
    if let Err(err) = store.save_snapshot(event).await {
        panic!("save_snapshot failed on {}: {err}", store.backend_name());
    }
}

/// Runs the store contract against `store`, writing only rows tagged `tag`.
async fn exercise(store: &dyn SnapshotStore, tag: &str) {
    let backend = store.backend_name();

    // One aggregate per id, one snapshot per event, oldest first. A lower
    // counter overwrites (last write wins).
    for likes in [3_000, 9_000_000, 10] {
        save(store, &event(tag, "a", "video", 1_000, likes)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let a = format!("{tag}-a");
    let Ok(history) = store.get_video_trajectory(&a).await else {
        panic!("{backend}: trajectory read failed");
    };
    let likes: Vec<u64> = history.iter().map(|s| s.stats.likes).collect();
    assert_eq!(likes, vec![3_000, 9_000_000, 10], "{backend}");
    assert!(
        history.windows(2).all(|w| matches!(w, [x, y] if x.snapshot_time <= y.snapshot_time)),
        "{backend}: trajectory out of order"
    );

    let Ok(only_a) = store.get_trending_videos(&page(tag, SortBy::Newest, 1, 20)).await else {
        panic!("{backend}: trending read failed");
    };
    assert_eq!(only_a.total, 1, "{backend}");
    let Some(row) = only_a.items.first() else {
        panic!("{backend}: aggregate missing");
    };
    assert_eq!(row.platform_id, a);
    assert_eq!(row.stats.likes, 10, "{backend}: lower counter must overwrite");

    // Non-video events write nothing.
    save(store, &event(tag, "c", "comment", 5, 5)).await;
    let Ok(none) = store.get_video_trajectory(&format!("{tag}-c")).await else {
        panic!("{backend}: trajectory read failed");
    };
    assert!(none.is_empty(), "{backend}");

    // Unknown ids have an empty trajectory.
    let Ok(unknown) = store.get_video_trajectory(&format!("{tag}-missing")).await else {
        panic!("{backend}: trajectory read failed");
    };
    assert!(unknown.is_empty(), "{backend}");

    // Virality ordering with pagination and the platform filter.
    save(store, &event(tag, "a", "video", 1_000, 9_000_000)).await;
    save(store, &event(tag, "b", "video", 1_000, 163_000)).await;
    save(store, &event(tag, "d", "video", 1_000, 3_000)).await;
    save(store, &event(&format!("{tag}-other"), "e", "video", 1_000, 9_000_000)).await;

    let Ok(first) = store.get_trending_videos(&page(tag, SortBy::Virality, 1, 2)).await else {
        panic!("{backend}: trending read failed");
    };
    let scores: Vec<u32> = first.items.iter().map(|v| v.virality_score).collect();
    assert_eq!(scores, vec![80, 60], "{backend}");
    assert_eq!(first.total, 3, "{backend}");
    assert!(first.items.iter().all(|v| v.source == tag), "{backend}");

    let Ok(second) = store.get_trending_videos(&page(tag, SortBy::Virality, 2, 2)).await else {
        panic!("{backend}: trending read failed");
    };
    let ids: Vec<&str> = second.items.iter().map(|v| v.platform_id.as_str()).collect();
    assert_eq!(ids, vec![format!("{tag}-d").as_str()], "{backend}");

    let Ok(past_end) = store.get_trending_videos(&page(tag, SortBy::Virality, 9, 2)).await else {
        panic!("{backend}: trending read failed");
    };
    assert!(past_end.items.is_empty(), "{backend}");
    assert_eq!(past_end.total, 3, "{backend}");

    // Leaderboard is global: at most five rows, highest score first.
    let Ok(board) = store.get_leaderboard().await else {
        panic!("{backend}: leaderboard read failed");
    };
    assert!(!board.is_empty(), "{backend}");
    assert!(board.len() as u64 <= LEADERBOARD_SIZE, "{backend}");
    assert!(
        board
            .windows(2)
            .all(|w| matches!(w, [x, y] if x.virality_score >= y.virality_score)),
        "{backend}: leaderboard out of order"
    );

    let Ok(stats) = store.get_stats().await else {
        panic!("{backend}: stats read failed");
    };
    assert!(stats.total_assets >= 4, "{backend}");
    assert_eq!(stats.status, NOMINAL_STATUS);
}

#[tokio::test]
async fn memory_store_honors_the_contract() {
    let store = MemoryStore::new();
    exercise(&store, &run_tag("memory")).await;
    assert_eq!(store.video_count().await, 4);
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server at DATABASE_URL"]
async fn postgres_store_honors_the_contract() {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        panic!("DATABASE_URL must be set");
    };
    let Ok(store) = PostgresStore::connect(&url, 4, Duration::from_secs(5)).await else {
        panic!("could not connect to {url}");
    };
    exercise(&store, &run_tag("postgres")).await;
    store.close().await;
}

#[tokio::test]
#[ignore = "needs a MongoDB server at MONGO_URL"]
async fn mongo_store_honors_the_contract() {
    let Ok(url) = std::env::var("MONGO_URL") else {
        panic!("MONGO_URL must be set");
    };
    let tag = run_tag("mongo");
    let database = format!("virality_test_{}", tag.replace('-', "_"));
    let Ok(store) = MongoStore::connect(&url, &database, Duration::from_secs(5)).await else {
        panic!("could not connect to {url}");
    };
    exercise(&store, &tag).await;
    store.close().await;
}
