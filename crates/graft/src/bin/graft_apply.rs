//! `graft-apply` — apply a patch batch to a registry seed.
//!
//! Usage:
//!   graft-apply '<batch-array-json>'
//!
//! The registry seed is read from stdin; the batch is the first argument.
//! The patched registry JSON is written to stdout and a per-patch outcome
//! report to stderr. The exit code is non-zero only for malformed input —
//! per-patch failures are reported, never fatal.

use std::io::{self, Read, Write};

use tracing_subscriber::EnvFilter;

use graft::{apply_batch, decl};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let batch_arg = match args.get(1) {
        Some(batch) => batch.clone(),
        None => {
            eprintln!("First argument must be a JSON batch array.");
            std::process::exit(1);
        }
    };

    let mut seed = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut seed) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match run(seed.trim(), &batch_arg) {
        Ok(output) => {
            io::stdout().write_all(output.as_bytes()).ok();
            io::stdout().write_all(b"\n").ok();
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(seed: &str, batch_arg: &str) -> Result<String, String> {
    let seed_json: serde_json::Value =
        serde_json::from_str(seed).map_err(|e| format!("seed: {e}"))?;
    let batch_json: serde_json::Value =
        serde_json::from_str(batch_arg).map_err(|e| format!("batch: {e}"))?;

    let mut registry = decl::decode_registry(&seed_json).map_err(|e| e.to_string())?;
    let batch = decl::decode_batch(&registry, &batch_json).map_err(|e| e.to_string())?;

    let report = apply_batch(&mut registry, &batch);
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&decl::encode_report(&report))
            .map_err(|e| e.to_string())?
    );

    let patched = decl::encode_registry(&registry).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&patched).map_err(|e| e.to_string())
}
