//! Multi-page fetching.
//!
//! Adapters describe how an endpoint pages ([`PaginationMode`]) and hand
//! [`paginate`] a closure that fetches a single page. The helper owns the
//! loop, the stop conditions and the final ordering.

use crate::core::errors::ExchangeError;
use crate::core::safe;
use crate::core::types::{FetchParams, LedgerEntry, Ohlcv, Order, Trade, Transaction};
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use tracing::debug;

pub const DEFAULT_MAX_PAGES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationMode {
    /// Fixed chronological windows of `window` entries spaced `step_ms` apart.
    TimeWindow { window: usize, step_ms: i64 },
    /// Opaque token read from `field` of the last item's raw payload.
    Cursor { field: String },
    /// One-based page numbers of `page_size` entries.
    PageNumber { page_size: usize },
}

/// The addressing of one page, as seen by the fetch closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
    pub page: usize,
}

/// Entries that can be stitched across pages.
pub trait Paginated {
    fn timestamp(&self) -> Option<i64>;

    fn id(&self) -> Option<&str> {
        None
    }

    fn info(&self) -> &Value;

    fn cursor(&self, field: &str) -> Option<String> {
        safe::string(self.info(), field)
    }
}

/// Walk pages until the caller's limit is met or the exchange runs out.
pub async fn paginate<T, F, Fut>(
    mode: &PaginationMode,
    query: &FetchParams,
    max_pages: usize,
    mut fetch: F,
) -> Result<Vec<T>, ExchangeError>
where
    T: Paginated,
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ExchangeError>>,
{
    let mut results: Vec<T> = Vec::new();
    let wanted = query.limit;
    let satisfied = |n: usize| wanted.is_some_and(|limit| n >= limit);

    match mode {
        PaginationMode::TimeWindow { window, step_ms } => {
            let span = step_ms.saturating_mul(*window as i64).max(1);
            let end = query.until.unwrap_or_else(safe::milliseconds);
            match query.since {
                // forward from `since`: gaps before a listing are skipped over
                Some(since) => {
                    let mut cursor = since;
                    for page in 1..=max_pages {
                        if cursor >= end || satisfied(results.len()) {
                            break;
                        }
                        let request = PageRequest {
                            since: Some(cursor),
                            until: Some(cursor.saturating_add(span).min(end)),
                            limit: Some(*window),
                            cursor: None,
                            page,
                        };
                        let batch = fetch(request).await?;
                        debug!(page, entries = batch.len(), "Fetched time window");
                        results.extend(batch);
                        cursor = cursor.saturating_add(span);
                        dedupe(&mut results);
                    }
                }
                // backward from the end: an empty window means nothing older exists
                None => {
                    let mut upper = end;
                    for page in 1..=max_pages {
                        let lower = upper.saturating_sub(span);
                        let request = PageRequest {
                            since: Some(lower),
                            until: Some(upper),
                            limit: Some(*window),
                            cursor: None,
                            page,
                        };
                        let batch = fetch(request).await?;
                        debug!(page, entries = batch.len(), "Fetched time window");
                        let empty = batch.is_empty();
                        results.extend(batch);
                        dedupe(&mut results);
                        if empty || satisfied(results.len()) {
                            break;
                        }
                        upper = lower;
                    }
                }
            }
        }
        PaginationMode::Cursor { field } => {
            let mut cursor = None;
            for page in 1..=max_pages {
                let request = PageRequest {
                    since: query.since,
                    until: query.until,
                    limit: query.limit,
                    cursor: cursor.take(),
                    page,
                };
                let batch = fetch(request).await?;
                debug!(page, entries = batch.len(), "Fetched cursor page");
                let next = batch.last().and_then(|last| last.cursor(field));
                let empty = batch.is_empty();
                results.extend(batch);
                match next {
                    Some(token) if !empty && !satisfied(results.len()) => cursor = Some(token),
                    _ => break,
                }
            }
        }
        PaginationMode::PageNumber { page_size } => {
            for page in 1..=max_pages {
                let request = PageRequest {
                    since: query.since,
                    until: query.until,
                    limit: Some(*page_size),
                    cursor: None,
                    page,
                };
                let batch = fetch(request).await?;
                debug!(page, entries = batch.len(), "Fetched numbered page");
                let short = batch.len() < *page_size;
                results.extend(batch);
                if short || satisfied(results.len()) {
                    break;
                }
            }
        }
    }

    Ok(filter_by_since_limit(results, query))
}

/// Ascending time order, clipped to `[since, until)` and the caller's limit.
/// Without `since` the most recent `limit` entries are kept.
pub fn filter_by_since_limit<T: Paginated>(mut items: Vec<T>, query: &FetchParams) -> Vec<T> {
    items.sort_by_key(|item| item.timestamp().unwrap_or(i64::MIN));
    if let Some(until) = query.until {
        items.retain(|item| item.timestamp().map_or(true, |ts| ts < until));
    }
    if let Some(since) = query.since {
        items.retain(|item| item.timestamp().map_or(true, |ts| ts >= since));
    }
    if let Some(limit) = query.limit {
        if items.len() > limit {
            if query.since.is_some() {
                items.truncate(limit);
            } else {
                items.drain(..items.len() - limit);
            }
        }
    }
    items
}

/// Overlapping windows return boundary entries twice.
fn dedupe<T: Paginated>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert((item.timestamp(), item.id().map(str::to_string))));
}

/// Duration of a unified timeframe (`1m`, `4h`, `1w`) in seconds.
pub fn parse_timeframe(timeframe: &str) -> Option<i64> {
    let split = timeframe.len().checked_sub(1)?;
    let (amount, unit) = timeframe.split_at(split);
    let amount: i64 = amount.parse().ok()?;
    let scale = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        "w" => 604_800,
        "M" => 2_592_000,
        "y" => 31_536_000,
        _ => return None,
    };
    Some(amount * scale)
}

static NO_INFO: Value = Value::Null;

impl Paginated for Ohlcv {
    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }

    fn info(&self) -> &Value {
        &NO_INFO
    }
}

impl Paginated for Trade {
    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn info(&self) -> &Value {
        &self.info
    }
}

impl Paginated for Order {
    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn info(&self) -> &Value {
        &self.info
    }
}

impl Paginated for Transaction {
    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn info(&self) -> &Value {
        &self.info
    }
}

impl Paginated for LedgerEntry {
    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn info(&self) -> &Value {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn trade(ts: i64, id: &str, info: Value) -> Trade {
        Trade {
            id: Some(id.to_string()),
            timestamp: Some(ts),
            info,
            ..Trade::default()
        }
    }

    #[tokio::test]
    async fn cursor_stops_when_token_disappears() {
        let calls = AtomicUsize::new(0);
        let mode = PaginationMode::Cursor {
            field: "next_cursor".into(),
        };
        let out = paginate(&mode, &FetchParams::default(), 10, |req| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(match (call, req.cursor.as_deref()) {
                    (0, None) => vec![
                        trade(3, "c", json!({})),
                        trade(2, "b", json!({ "next_cursor": "abc" })),
                    ],
                    (1, Some("abc")) => vec![trade(1, "a", json!({}))],
                    _ => panic!("unexpected page"),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let ids: Vec<_> = out.iter().filter_map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn page_number_stops_on_short_page() {
        let mode = PaginationMode::PageNumber { page_size: 2 };
        let out = paginate(&mode, &FetchParams::default(), 10, |req| async move {
            Ok(match req.page {
                1 => vec![trade(1, "a", Value::Null), trade(2, "b", Value::Null)],
                2 => vec![trade(3, "c", Value::Null)],
                _ => panic!("read past the last page"),
            })
        })
        .await
        .unwrap();
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn time_windows_are_deduplicated_and_bounded() {
        let mode = PaginationMode::TimeWindow {
            window: 2,
            step_ms: 60_000,
        };
        let query = FetchParams::default().since(0).until(240_000);
        let out = paginate(&mode, &query, 10, |req| async move {
            let since = req.since.unwrap();
            // each window repeats its left boundary candle
            Ok(vec![
                Ohlcv { timestamp: since, open: None, high: None, low: None, close: None, volume: None },
                Ohlcv { timestamp: since + 60_000, open: None, high: None, low: None, close: None, volume: None },
                Ohlcv { timestamp: since + 120_000, open: None, high: None, low: None, close: None, volume: None },
            ])
        })
        .await
        .unwrap();
        let stamps: Vec<_> = out.iter().map(|c| c.timestamp).collect();
        assert_eq!(stamps, vec![0, 60_000, 120_000, 180_000]);
    }

    fn candle(timestamp: i64) -> Ohlcv {
        Ohlcv { timestamp, open: None, high: None, low: None, close: None, volume: None }
    }

    #[tokio::test]
    async fn time_windows_stop_once_the_limit_is_met() {
        let calls = AtomicUsize::new(0);
        let mode = PaginationMode::TimeWindow {
            window: 2,
            step_ms: 60_000,
        };
        let query = FetchParams::default().since(0).until(6_000_000).limit(3);
        let out = paginate(&mode, &query, 10, |req| {
            calls.fetch_add(1, Ordering::SeqCst);
            let since = req.since.unwrap();
            async move { Ok(vec![candle(since), candle(since + 60_000)]) }
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let stamps: Vec<_> = out.iter().map(|c| c.timestamp).collect();
        assert_eq!(stamps, vec![0, 60_000, 120_000]);
    }

    #[tokio::test]
    async fn time_windows_without_since_walk_back_from_the_end() {
        let calls = AtomicUsize::new(0);
        let mode = PaginationMode::TimeWindow {
            window: 2,
            step_ms: 60_000,
        };
        // history starts at 240_000
        let query = FetchParams::default().until(600_000);
        let out = paginate(&mode, &query, 10, |req| {
            calls.fetch_add(1, Ordering::SeqCst);
            let since = req.since.unwrap();
            async move {
                Ok(if since >= 240_000 {
                    vec![candle(since), candle(since + 60_000)]
                } else {
                    Vec::new()
                })
            }
        })
        .await
        .unwrap();
        // windows 480k, 360k, 240k, then the empty 120k one
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let stamps: Vec<_> = out.iter().map(|c| c.timestamp).collect();
        assert_eq!(stamps, vec![240_000, 300_000, 360_000, 420_000, 480_000, 540_000]);
    }

    #[tokio::test]
    async fn max_pages_caps_the_walk() {
        let calls = AtomicUsize::new(0);
        let mode = PaginationMode::PageNumber { page_size: 1 };
        let out = paginate(&mode, &FetchParams::default(), 3, |req| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(vec![trade(req.page as i64, "x", Value::Null)]) }
        })
        .await
        .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn timeframe_durations() {
        assert_eq!(parse_timeframe("1m"), Some(60));
        assert_eq!(parse_timeframe("4h"), Some(14_400));
        assert_eq!(parse_timeframe("1w"), Some(604_800));
        assert_eq!(parse_timeframe("x"), None);
    }
}
