//! `chainmonitor classify`, `classify-dir` and `detect-proxy`.

use std::path::{Path, PathBuf};

use alloy_primitives::{Address, B256};
use anyhow::{anyhow, bail, Context, Result};
use chainmonitor_core::types::Classification;
use chainmonitor_evm::{classify as classify_code, detect_proxy as detect};
use rayon::prelude::*;
use serde_json::json;

pub fn classify(code: Option<&str>, file: Option<&Path>, as_json: bool) -> Result<()> {
    let bytes = match (code, file) {
        (Some(hex), _) => parse_hex(hex)?,
        (None, Some(path)) => read_code_file(path)?,
        (None, None) => bail!("either --code or --file is required"),
    };
    let cls = classify_code(&bytes);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&classification_json(&cls))?);
    } else {
        println!("type: {}", cls.contract_type);
        print_flags(&cls);
    }
    Ok(())
}

pub fn classify_dir(dir: &Path, threads: usize, as_json: bool) -> Result<()> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("bin") | Some("hex")
            )
        })
        .collect();
    files.sort();

    let run = || -> Vec<(PathBuf, Result<Classification>)> {
        files
            .par_iter()
            .map(|p| (p.clone(), read_code_file(p).map(|c| classify_code(&c))))
            .collect()
    };
    let results = if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(run)
    } else {
        run()
    };

    if as_json {
        let rows: Vec<_> = results
            .iter()
            .map(|(path, res)| match res {
                Ok(cls) => json!({ "file": path.display().to_string(), "classification": classification_json(cls) }),
                Err(e) => json!({ "file": path.display().to_string(), "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for (path, res) in &results {
            match res {
                Ok(cls) => println!("{:<8} {}", cls.contract_type.as_str(), path.display()),
                Err(e) => println!("{:<8} {} ({e})", "ERROR", path.display()),
            }
        }
        println!("{} file(s)", results.len());
    }
    Ok(())
}

pub fn detect_proxy(
    caller: &str,
    caller_code: &str,
    target: &str,
    target_code: &str,
    slot_value: Option<&str>,
    as_json: bool,
) -> Result<()> {
    let caller: Address = caller.parse().context("invalid --caller address")?;
    let target: Address = target.parse().context("invalid --target address")?;
    let caller_code = parse_hex(caller_code)?;
    let target_code = parse_hex(target_code)?;
    let slot_value = slot_value.map(parse_hex).transpose()?;

    // the supplied value answers every implementation-slot read of the caller
    let storage = |address: Address, _slot: B256| -> Option<Vec<u8>> {
        (address == caller).then(|| slot_value.clone()).flatten()
    };

    let found = detect(caller, &caller_code, target, &target_code, &storage);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }
    match found {
        Some(p) => {
            println!("✓ proxy pattern");
            println!("  proxy:          {} ({})", p.proxy.address, p.proxy.contract_type);
            println!(
                "  implementation: {} ({})",
                p.implementation.address, p.implementation.contract_type
            );
        }
        None => println!("✗ no proxy pattern"),
    }
    Ok(())
}

fn print_flags(cls: &Classification) {
    let caps = cls.capabilities;
    if caps.erc721_metadata {
        println!("  ✓ ERC-721 metadata");
    }
    if caps.erc721_enumerable {
        println!("  ✓ ERC-721 enumerable");
    }
    if caps.erc1155_metadata {
        println!("  ✓ ERC-1155 metadata");
    }
}

fn classification_json(cls: &Classification) -> serde_json::Value {
    json!({
        "contractType": cls.contract_type,
        "typeName": cls.contract_type.as_str(),
        "isSupportErc721Metadata": cls.capabilities.erc721_metadata,
        "isSupportErc721Enumerable": cls.capabilities.erc721_enumerable,
        "isSupportErc1155Metadata": cls.capabilities.erc1155_metadata,
    })
}

/// Hex with optional `0x` and surrounding whitespace.
pub fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| anyhow!("invalid hex input: {e}"))
}

/// Hex text if the file parses as hex, raw bytes otherwise.
fn read_code_file(path: &Path) -> Result<Vec<u8>> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match std::str::from_utf8(&raw).ok().map(parse_hex) {
        Some(Ok(bytes)) => Ok(bytes),
        _ => Ok(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_accepts_prefix_and_whitespace() {
        assert_eq!(parse_hex(" 0x6080\n").unwrap(), vec![0x60, 0x80]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
        assert!(parse_hex("0xzz").is_err());
    }

    #[test]
    fn code_files_hex_or_raw() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("a.hex");
        std::fs::write(&text, "0x60806040").unwrap();
        assert_eq!(read_code_file(&text).unwrap(), vec![0x60, 0x80, 0x60, 0x40]);

        let raw = dir.path().join("b.bin");
        std::fs::write(&raw, [0x00u8, 0x61, 0x73, 0x6d]).unwrap();
        assert_eq!(read_code_file(&raw).unwrap(), vec![0x00, 0x61, 0x73, 0x6d]);
    }
}
