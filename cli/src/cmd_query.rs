//! `chainmonitor query` — print the records of one transaction.

use std::path::Path;

use alloy_primitives::B256;
use anyhow::{Context, Result};
use chainmonitor_core::types::{ContractInfo, EmbedTransfer, ProxyPattern};
use chainmonitor_core::{EventKind, MonitorConfig};
use chainmonitor_storage::{EventStore, SqliteStore};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::RecordKind;

pub fn run(path: &Path, config: &MonitorConfig, tx: &str, kind: RecordKind) -> Result<()> {
    let tx_hash: B256 = tx.parse().context("invalid --tx hash")?;
    if !path.exists() {
        anyhow::bail!("monitor store {} does not exist", path.display());
    }
    let store = SqliteStore::open_read_only(path, &config.sqlite)
        .with_context(|| format!("opening {}", path.display()))?;
    let events = EventStore::with_strategy(store, config.append_strategy);

    let output = match kind {
        RecordKind::Created => render::<ContractInfo>(&events, EventKind::CreatedContract, &tx_hash)?,
        RecordKind::Suicided => render::<ContractInfo>(&events, EventKind::SuicidedContract, &tx_hash)?,
        RecordKind::Proxy => render::<ProxyPattern>(&events, EventKind::ProxyPattern, &tx_hash)?,
        RecordKind::Transfers => render::<EmbedTransfer>(&events, EventKind::EmbedTransfer, &tx_hash)?,
    };
    println!("{output}");
    events.close()?;
    Ok(())
}

fn render<T: Serialize + DeserializeOwned>(
    events: &EventStore<SqliteStore>,
    kind: EventKind,
    tx_hash: &B256,
) -> Result<String> {
    let list: Vec<T> = events.get_for_tx(kind, tx_hash)?;
    Ok(serde_json::to_string_pretty(&list)?)
}
