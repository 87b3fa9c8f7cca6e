//! Batch tool subcommands.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use write_batch_core::{BatchConfig, Lookup, RecordType, WriteBatch, WriteBatchWithIndex};

/// One dumped record, bytes rendered as escaped ASCII.
#[derive(Debug, Serialize)]
struct DumpLine {
    index: usize,
    record_type: RecordType,
    cf: u32,
    key: Option<String>,
    value: Option<String>,
}

fn escaped(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

/// Loads a `BatchConfig` from a JSON file, or the default when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BatchConfig> {
    let Some(path) = path else {
        return Ok(BatchConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    tracing::debug!(?config, "loaded batch config");
    Ok(config)
}

fn read_batch(path: &Path, config: &BatchConfig) -> anyhow::Result<WriteBatch> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = data.len(), "loaded batch file");
    WriteBatch::from_data_with_config(&data, config.clone())
        .with_context(|| format!("{} is not a write batch", path.display()))
}

/// Prints the header and every record. Records before a decode failure are
/// printed before the error is returned.
pub fn dump(
    path: &Path,
    config: &BatchConfig,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let batch = read_batch(path, config)?;
    if !json {
        writeln!(out, "sequence: {}", batch.sequence())?;
        writeln!(out, "count: {}", batch.count())?;
        writeln!(out, "bytes: {}", batch.len())?;
    }

    for (index, record) in batch.iter().enumerate() {
        let record = record.with_context(|| format!("record {} failed to decode", index))?;
        let line = DumpLine {
            index,
            record_type: record.record_type,
            cf: record.cf,
            key: record.key.map(escaped),
            value: record.value.map(escaped),
        };
        if json {
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
        } else {
            write!(out, "{:>6} {:?} cf={}", line.index, line.record_type, line.cf)?;
            if let Some(key) = &line.key {
                write!(out, " key=\"{}\"", key)?;
            }
            if let Some(value) = &line.value {
                write!(out, " value=\"{}\"", value)?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Decodes every record and checks the header count.
pub fn verify(path: &Path, config: &BatchConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let batch = read_batch(path, config)?;
    batch
        .validate()
        .with_context(|| format!("{} failed verification", path.display()))?;
    writeln!(out, "ok: {} records, {} bytes", batch.count(), batch.len())?;
    Ok(())
}

/// Resolves `key` in column family `cf` against the batch's records.
pub fn get(
    path: &Path,
    config: &BatchConfig,
    cf: u32,
    key: &[u8],
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let batch = read_batch(path, config)?;
    let indexed = WriteBatchWithIndex::from_batch(batch)
        .with_context(|| format!("failed to index {}", path.display()))?;
    match indexed.get(cf, key)? {
        Lookup::Found(value) => writeln!(out, "found: \"{}\"", escaped(&value))?,
        Lookup::Deleted => writeln!(out, "deleted")?,
        Lookup::NotInBatch => writeln!(out, "not in batch")?,
    }
    Ok(())
}
