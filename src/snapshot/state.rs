//! Typed views of the transient snapshot state kept in the cache.
//!
//! - in-progress: JSON array of domains submitted to the worker
//! - pending: JSON object mapping domain to its enqueue time (unix seconds)
//! - scheduled: JSON array of fetch-at times (unix seconds) of delayed fetches
//!
//! Every mutation goes through [`CacheStore::update`]; a collection that
//! becomes empty is removed instead of stored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::cache::CacheStore;
use crate::config::{CACHE_KEY_IN_PROGRESS, CACHE_KEY_PENDING, CACHE_KEY_SCHEDULED, CACHE_TTL};
use crate::error_handling::CacheError;

fn parse_set(value: Option<Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => BTreeSet::new(),
    }
}

fn set_value(set: BTreeSet<String>) -> Option<Value> {
    (!set.is_empty()).then(|| Value::Array(set.into_iter().map(Value::String).collect()))
}

fn parse_map(value: Option<Value>) -> BTreeMap<String, i64> {
    match value {
        Some(Value::Object(entries)) => entries
            .into_iter()
            .filter_map(|(domain, ts)| ts.as_i64().map(|ts| (domain, ts)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn map_value(map: BTreeMap<String, i64>) -> Option<Value> {
    if map.is_empty() {
        return None;
    }
    let entries: Map<String, Value> = map
        .into_iter()
        .map(|(domain, ts)| (domain, Value::from(ts)))
        .collect();
    Some(Value::Object(entries))
}

fn parse_times(value: Option<Value>) -> Vec<i64> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
        _ => Vec::new(),
    }
}

fn times_value(times: Vec<i64>) -> Option<Value> {
    (!times.is_empty()).then(|| Value::Array(times.into_iter().map(Value::from).collect()))
}

pub(crate) async fn in_progress(cache: &dyn CacheStore) -> Result<BTreeSet<String>, CacheError> {
    Ok(parse_set(cache.get(CACHE_KEY_IN_PROGRESS).await?))
}

pub(crate) async fn pending(cache: &dyn CacheStore) -> Result<BTreeMap<String, i64>, CacheError> {
    Ok(parse_map(cache.get(CACHE_KEY_PENDING).await?))
}

pub(crate) async fn scheduled(cache: &dyn CacheStore) -> Result<Vec<i64>, CacheError> {
    Ok(parse_times(cache.get(CACHE_KEY_SCHEDULED).await?))
}

/// Adds the requested domains that are not yet in progress to the in-progress
/// set, in one atomic update, and returns the ones this call added.
///
/// Two callers claiming the same domain concurrently cannot both get it.
pub(crate) async fn claim_in_progress(
    cache: &dyn CacheStore,
    domains: &[String],
) -> Result<Vec<String>, CacheError> {
    let requested = domains.to_vec();
    let claimed = Arc::new(Mutex::new(Vec::new()));
    let sink = claimed.clone();
    cache
        .update(
            CACHE_KEY_IN_PROGRESS,
            CACHE_TTL,
            Box::new(move |current| {
                let mut set = parse_set(current);
                let mut added = Vec::new();
                for domain in requested {
                    if set.insert(domain.clone()) {
                        added.push(domain);
                    }
                }
                *sink.lock().unwrap_or_else(|e| e.into_inner()) = added;
                set_value(set)
            }),
        )
        .await?;

    let claimed = std::mem::take(&mut *claimed.lock().unwrap_or_else(|e| e.into_inner()));
    Ok(claimed)
}

/// Removes `domains` from the in-progress set, undoing a claim.
pub(crate) async fn release_in_progress(
    cache: &dyn CacheStore,
    domains: &[String],
) -> Result<(), CacheError> {
    let released = domains.to_vec();
    cache
        .update(
            CACHE_KEY_IN_PROGRESS,
            CACHE_TTL,
            Box::new(move |current| {
                let mut set = parse_set(current);
                for domain in &released {
                    set.remove(domain);
                }
                set_value(set)
            }),
        )
        .await?;
    Ok(())
}

/// Stamps each of `domains` as pending at `now`.
pub(crate) async fn stamp_pending(
    cache: &dyn CacheStore,
    domains: &[String],
    now: i64,
) -> Result<(), CacheError> {
    let stamped = domains.to_vec();
    cache
        .update(
            CACHE_KEY_PENDING,
            CACHE_TTL,
            Box::new(move |current| {
                let mut map = parse_map(current);
                for domain in stamped {
                    map.insert(domain, now);
                }
                map_value(map)
            }),
        )
        .await?;
    Ok(())
}

/// Removes `domain` from both the pending map and the in-progress set.
pub(crate) async fn mark_fetched(cache: &dyn CacheStore, domain: &str) -> Result<(), CacheError> {
    let key = domain.to_string();
    cache
        .update(
            CACHE_KEY_PENDING,
            CACHE_TTL,
            Box::new(move |current| {
                let mut map = parse_map(current);
                map.remove(&key);
                map_value(map)
            }),
        )
        .await?;

    let key = domain.to_string();
    cache
        .update(
            CACHE_KEY_IN_PROGRESS,
            CACHE_TTL,
            Box::new(move |current| {
                let mut set = parse_set(current);
                set.remove(&key);
                set_value(set)
            }),
        )
        .await?;
    Ok(())
}

pub(crate) async fn add_scheduled(cache: &dyn CacheStore, fetch_at: i64) -> Result<(), CacheError> {
    cache
        .update(
            CACHE_KEY_SCHEDULED,
            CACHE_TTL,
            Box::new(move |current| {
                let mut times = parse_times(current);
                times.push(fetch_at);
                times_value(times)
            }),
        )
        .await?;
    Ok(())
}

/// Removes one occurrence of `fetch_at`.
pub(crate) async fn remove_scheduled(
    cache: &dyn CacheStore,
    fetch_at: i64,
) -> Result<(), CacheError> {
    cache
        .update(
            CACHE_KEY_SCHEDULED,
            CACHE_TTL,
            Box::new(move |current| {
                let mut times = parse_times(current);
                if let Some(pos) = times.iter().position(|t| *t == fetch_at) {
                    times.remove(pos);
                }
                times_value(times)
            }),
        )
        .await?;
    Ok(())
}

pub(crate) async fn clear(cache: &dyn CacheStore) -> Result<(), CacheError> {
    cache.forget(CACHE_KEY_IN_PROGRESS).await?;
    cache.forget(CACHE_KEY_PENDING).await
}
