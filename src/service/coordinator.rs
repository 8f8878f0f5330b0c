//! Concurrent fan-out of source fetches

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::fetch::{fetch_source, SourceEntry};
use crate::registry::Registry;

/// Fetch every source concurrently.
///
/// Entries come back in completion order. Every task runs to completion; if
/// any failed, the first failure observed is returned and the rest are logged.
pub async fn run_all(registry: Arc<dyn Registry>, sources: &[String]) -> Result<Vec<SourceEntry>> {
    let (tx, mut rx) = mpsc::channel(sources.len().max(1));
    let mut tasks = JoinSet::new();

    for source in sources {
        let registry = Arc::clone(&registry);
        let tx = tx.clone();
        let source = source.clone();
        tasks.spawn(async move {
            let entry = fetch_source(registry.as_ref(), &source).await?;
            tx.send(entry)
                .await
                .map_err(|_| anyhow!("result channel closed before {} was delivered", source))
        });
    }
    drop(tx);

    let mut first_error: Option<anyhow::Error> = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(anyhow!("fetch task failed: {}", e)),
        };
        if let Err(e) = outcome {
            match first_error {
                None => first_error = Some(e),
                Some(_) => warn!("Discarding additional fetch failure: {:#}", e),
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    let mut entries = Vec::with_capacity(sources.len());
    while let Some(entry) = rx.recv().await {
        entries.push(entry);
    }
    debug!("Collected {} source entries", entries.len());
    Ok(entries)
}
