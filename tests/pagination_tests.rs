//! Integration tests for cursor pagination over a 25-row catalog
//!
//! These tests verify:
//! - Forward and backward windows addressed by cursors
//! - Page info derived from the window
//! - Count consistency for every window
//! - Rejection of malformed or out-of-range pagination arguments

mod common;

use assert_matches::assert_matches;
use librarian_query::graphql::filters::{FieldComparison, FilterNode};
use librarian_query::graphql::orm::{EntityQueryArgs, QueryError};
use librarian_query::graphql::pagination::{decode_cursor, encode_cursor};
use librarian_query::graphql::sorting::SortSpec;
use pretty_assertions::assert_eq;

use common::{Media, ids};
use librarian_query::graphql::pagination::Connection;

async fn catalog_of(count: i64) -> librarian_query::Database {
    let db = common::setup().await;
    common::seed_media(&db, count).await;
    db
}

fn assert_counts_partition(conn: &Connection<Media>) {
    let total = conn.total_count;
    if conn.edges.is_empty() {
        assert!(conn.page_info.start_cursor.is_none());
        assert!(conn.page_info.end_cursor.is_none());
        return;
    }
    let start = decode_cursor(conn.page_info.start_cursor.as_deref().unwrap()).unwrap();
    let end = decode_cursor(conn.page_info.end_cursor.as_deref().unwrap()).unwrap();
    assert_eq!(end - start + 1, conn.edges.len() as i64);
    assert_eq!((start - 1) + conn.edges.len() as i64 + (total - end), total);
    assert_eq!(conn.page_info.has_previous_page, start > 1);
    assert_eq!(conn.page_info.has_next_page, end < total);
}

// ============================================================================
// Forward pagination
// ============================================================================

#[tokio::test]
async fn test_first_page() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let conn = service.connection(&EntityQueryArgs::new().first(10)).await.unwrap();

    assert_eq!(conn.total_count, 25);
    assert_eq!(ids(&conn), (1..=10).collect::<Vec<_>>());
    assert!(conn.page_info.has_next_page);
    assert!(!conn.page_info.has_previous_page);
    assert_eq!(conn.page_info.start_cursor, Some(encode_cursor(1)));
    assert_eq!(conn.page_info.end_cursor, Some(encode_cursor(10)));
    assert_counts_partition(&conn);
}

#[tokio::test]
async fn test_first_after_cursor() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new().first(10).after(encode_cursor(10));
    let conn = service.connection(&args).await.unwrap();

    assert_eq!(ids(&conn), (11..=20).collect::<Vec<_>>());
    assert!(conn.page_info.has_next_page);
    assert!(conn.page_info.has_previous_page);
    assert_counts_partition(&conn);
}

#[tokio::test]
async fn test_first_past_end_truncates() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new().first(10).after(encode_cursor(20));
    let conn = service.connection(&args).await.unwrap();

    assert_eq!(ids(&conn), (21..=25).collect::<Vec<_>>());
    assert!(!conn.page_info.has_next_page);
    assert_counts_partition(&conn);
}

#[tokio::test]
async fn test_after_last_row_is_empty() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new().first(5).after(encode_cursor(25));
    let conn = service.connection(&args).await.unwrap();

    assert!(conn.edges.is_empty());
    assert!(!conn.page_info.has_next_page);
    assert!(conn.page_info.has_previous_page);
    assert_counts_partition(&conn);
}

#[tokio::test]
async fn test_walk_forward_visits_every_row_once() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let mut seen = Vec::new();
    let mut args = EntityQueryArgs::new().first(7);
    loop {
        let conn = service.connection(&args).await.unwrap();
        assert_counts_partition(&conn);
        seen.extend(ids(&conn));
        if !conn.page_info.has_next_page {
            break;
        }
        let cursor = conn.page_info.end_cursor.clone().unwrap();
        args = EntityQueryArgs::new().first(7).after(cursor);
    }

    assert_eq!(seen, (1..=25).collect::<Vec<_>>());
}

// ============================================================================
// Backward pagination
// ============================================================================

#[tokio::test]
async fn test_last_before_cursor() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new().last(5).before(encode_cursor(11));
    let conn = service.connection(&args).await.unwrap();

    assert_eq!(ids(&conn), (6..=10).collect::<Vec<_>>());
    assert!(conn.page_info.has_previous_page);
    assert!(conn.page_info.has_next_page);
    assert_counts_partition(&conn);
}

#[tokio::test]
async fn test_last_before_first_row_is_empty() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new().last(5).before(encode_cursor(1));
    let conn = service.connection(&args).await.unwrap();

    assert!(conn.edges.is_empty());
    assert!(!conn.page_info.has_previous_page);
    assert_eq!(conn.total_count, 25);
    assert_counts_partition(&conn);
}

#[tokio::test]
async fn test_last_without_cursor_reads_tail() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let conn = service.connection(&EntityQueryArgs::new().last(3)).await.unwrap();

    assert_eq!(ids(&conn), vec![23, 24, 25]);
    assert!(!conn.page_info.has_next_page);
    assert!(conn.page_info.has_previous_page);
}

#[tokio::test]
async fn test_walk_backward_visits_every_row_once() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let mut pages = Vec::new();
    let mut args = EntityQueryArgs::new().last(6);
    loop {
        let conn = service.connection(&args).await.unwrap();
        assert_counts_partition(&conn);
        pages.push(ids(&conn));
        if !conn.page_info.has_previous_page {
            break;
        }
        let cursor = conn.page_info.start_cursor.clone().unwrap();
        args = EntityQueryArgs::new().last(6).before(cursor);
    }

    let seen: Vec<i64> = pages.into_iter().rev().flatten().collect();
    assert_eq!(seen, (1..=25).collect::<Vec<_>>());
}

// ============================================================================
// Interaction with filter and order
// ============================================================================

#[tokio::test]
async fn test_no_arguments_returns_everything() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let conn = service.connection(&EntityQueryArgs::new()).await.unwrap();
    assert_eq!(conn.edges.len(), 25);
    assert!(!conn.page_info.has_next_page);
    assert!(!conn.page_info.has_previous_page);
}

#[tokio::test]
async fn test_cursors_follow_filtered_ordinals() {
    let db = catalog_of(25).await;
    let service = common::service(&db);
    let tv = FilterNode::new().field("type", FieldComparison::eq("tv"));

    let conn = service
        .connection(&EntityQueryArgs::new().first(5).filter(tv.clone()))
        .await
        .unwrap();
    assert_eq!(conn.total_count, 12);
    assert_eq!(ids(&conn), vec![2, 4, 6, 8, 10]);

    let next = service
        .connection(
            &EntityQueryArgs::new()
                .first(5)
                .after(conn.page_info.end_cursor.clone().unwrap())
                .filter(tv),
        )
        .await
        .unwrap();
    assert_eq!(ids(&next), vec![12, 14, 16, 18, 20]);
}

#[tokio::test]
async fn test_order_applies_before_window() {
    let db = catalog_of(25).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new()
        .first(3)
        .after(encode_cursor(2))
        .order(SortSpec::new().desc("title"));
    let conn = service.connection(&args).await.unwrap();

    assert_eq!(ids(&conn), vec![23, 22, 21]);
}

#[tokio::test]
async fn test_empty_result_set() {
    let db = catalog_of(0).await;
    let service = common::service(&db);

    let conn = service.connection(&EntityQueryArgs::new().first(10)).await.unwrap();
    assert_eq!(conn.total_count, 0);
    assert!(conn.edges.is_empty());
    assert!(!conn.page_info.has_next_page);
    assert!(!conn.page_info.has_previous_page);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_invalid_pagination_arguments() {
    let db = catalog_of(5).await;
    let service = common::service(&db);

    assert_matches!(
        service.connection(&EntityQueryArgs::new().first(201)).await,
        Err(QueryError::InvalidPagination(_))
    );
    assert_matches!(
        service.connection(&EntityQueryArgs::new().first(1).last(1)).await,
        Err(QueryError::InvalidPagination(_))
    );
    assert_matches!(
        service
            .connection(&EntityQueryArgs::new().first(1).after("bm90IGEgY3Vyc29y"))
            .await,
        Err(QueryError::InvalidCursor(_))
    );
}

#[tokio::test]
async fn test_non_positive_cursor_is_out_of_range() {
    let db = catalog_of(5).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new().first(2).after(encode_cursor(0));
    assert_matches!(
        service.connection(&args).await,
        Err(QueryError::CursorRange { ordinal: 0, total_count: 5 })
    );
}

// ============================================================================
// Boundaries
// ============================================================================

#[tokio::test]
async fn test_after_past_result_set_is_empty() {
    let db = catalog_of(5).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new().first(2).after(encode_cursor(6));
    let conn = service.connection(&args).await.unwrap();

    assert!(conn.edges.is_empty());
    assert_eq!(conn.total_count, 5);
    assert!(!conn.page_info.has_next_page);
    assert!(conn.page_info.has_previous_page);
    assert_counts_partition(&conn);
}

#[tokio::test]
async fn test_before_first_row_of_empty_result() {
    let db = catalog_of(0).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new().last(5).before(encode_cursor(1));
    let conn = service.connection(&args).await.unwrap();

    assert!(conn.edges.is_empty());
    assert_eq!(conn.total_count, 0);
    assert!(!conn.page_info.has_previous_page);
    assert!(!conn.page_info.has_next_page);
}

#[tokio::test]
async fn test_before_past_result_set_reads_tail() {
    let db = catalog_of(5).await;
    let service = common::service(&db);

    let args = EntityQueryArgs::new().last(2).before(encode_cursor(9));
    let conn = service.connection(&args).await.unwrap();

    assert_eq!(ids(&conn), vec![4, 5]);
    assert!(!conn.page_info.has_next_page);
}
