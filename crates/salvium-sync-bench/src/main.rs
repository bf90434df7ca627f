//! Sync engine benchmark.
//!
//! Connects to a daemon, runs a view-only wallet through `SyncEngine::sync`
//! against the live chain (or a bounded height range), and reports
//! throughput (blocks/sec, outputs found) for regressions in the scanner
//! or sync batch-sizing logic.

use clap::Parser;
use salvium_crypto::storage::WalletDb;
use salvium_rpc::DaemonRpc;
use salvium_wallet::keys::WalletKeys;
use salvium_wallet::scanner::ScanContext;
use salvium_wallet::sync::{SyncEngine, SyncEvent};
use std::sync::Mutex;
use std::time::Instant;

/// Benchmark the sync engine against a running daemon.
#[derive(Parser)]
#[command(name = "salvium-sync-bench")]
#[command(about = "Benchmark wallet sync throughput against a daemon")]
struct Cli {
    /// Daemon RPC URL.
    #[arg(long, default_value = "http://127.0.0.1:19081")]
    daemon: String,

    /// 32-byte view secret key, hex-encoded. Random if omitted.
    #[arg(long)]
    view_secret: Option<String>,

    /// 32-byte spend public key, hex-encoded. Random if omitted.
    #[arg(long)]
    spend_public: Option<String>,

    /// Stop after syncing this many blocks (0 = sync to tip).
    #[arg(long, default_value_t = 0)]
    max_blocks: u64,
}

fn hex32(s: &str, label: &str) -> [u8; 32] {
    let bytes = hex::decode(s).unwrap_or_else(|e| panic!("invalid {label} hex: {e}"));
    let mut out = [0u8; 32];
    if bytes.len() != 32 {
        panic!("{label} must be 32 bytes, got {}", bytes.len());
    }
    out.copy_from_slice(&bytes);
    out
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let seed = WalletKeys::random_seed();
    let keys = match (&cli.view_secret, &cli.spend_public) {
        (Some(vs), Some(sp)) => WalletKeys::view_only(
            hex32(vs, "view-secret"),
            hex32(sp, "spend-public"),
            salvium_types::constants::Network::Mainnet,
        ),
        _ => {
            log::info!("no keys supplied, benchmarking with a random full wallet");
            WalletKeys::from_seed(seed, salvium_types::constants::Network::Mainnet)
        }
    };

    let scan_ctx = ScanContext::from_keys(&keys, Vec::new(), Vec::new());
    let daemon = DaemonRpc::new(&cli.daemon);

    let tmp_dir = tempfile::tempdir().expect("create temp dir for bench wallet db");
    let db_path = tmp_dir.path().join("sync-bench.db");
    let db = WalletDb::open(
        db_path.to_str().expect("temp path is valid utf-8"),
        &[0u8; 32],
    )
    .expect("open wallet db");
    let db = Mutex::new(db);

    let info = daemon.get_info().await.expect("get_info failed");
    println!(
        "daemon height {} (network {})",
        info.height,
        if info.mainnet {
            "mainnet"
        } else if info.testnet {
            "testnet"
        } else {
            "stagenet"
        }
    );

    if cli.max_blocks > 0 {
        let cap = info.height.saturating_sub(cli.max_blocks);
        db.lock()
            .unwrap()
            .set_sync_height(cap as i64)
            .expect("seed starting sync height");
    }

    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel(64);
    let start = Instant::now();

    let sync_task = tokio::spawn(async move {
        let result = SyncEngine::sync(&daemon, &db, &scan_ctx, Some(&event_tx)).await;
        drop(event_tx);
        result
    });

    let mut blocks_seen = 0u64;
    let mut outputs_found = 0usize;
    while let Some(event) = event_rx.recv().await {
        match event {
            SyncEvent::Started { target_height } => {
                println!("sync started, target height {target_height}");
            }
            SyncEvent::Progress {
                current_height,
                target_height,
                outputs_found: n,
            } => {
                blocks_seen = current_height;
                outputs_found += n;
                println!("  height {current_height}/{target_height}  (+{n} outputs)");
            }
            SyncEvent::Complete { height } => {
                blocks_seen = height;
                println!("sync complete at height {height}");
            }
            SyncEvent::Reorg { from_height, to_height } => {
                println!("reorg: rolled back from {from_height} to {to_height}");
            }
            SyncEvent::Error(e) => {
                eprintln!("sync error: {e}");
            }
        }
    }

    let final_height = sync_task.await.expect("sync task panicked").expect("sync failed");
    let elapsed = start.elapsed();
    let blocks = blocks_seen.max(final_height);

    println!(
        "synced to height {final_height} in {:.2}s ({:.1} blocks/sec, {outputs_found} outputs found)",
        elapsed.as_secs_f64(),
        blocks as f64 / elapsed.as_secs_f64().max(0.001),
    );
}
