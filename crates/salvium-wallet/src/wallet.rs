//! Main Wallet struct.
//!
//! Ties together key management, subaddress generation, output scanning,
//! blockchain sync, balance tracking, and UTXO selection into a single
//! high-level API.

use crate::account::SubaddressMaps;
use crate::error::WalletError;
use crate::keys::{WalletKeys, WalletType};
use crate::scanner::ScanContext;
use crate::sync::{SyncEngine, SyncEvent};
use crate::transfer::{TransferDestination, TransferOptions};
use crate::utxo::{self, SelectionStrategy, UtxoCandidate};
use salvium_types::constants::Network;

#[cfg(not(target_arch = "wasm32"))]
use salvium_rpc::daemon::{DaemonRpc, OutputRequest};
#[cfg(not(target_arch = "wasm32"))]
use salvium_tx::builder::{Destination, PreparedInput, TransactionBuilder, UnsignedTransaction};
#[cfg(not(target_arch = "wasm32"))]
use salvium_tx::decoy::{DecoySelector, DEFAULT_RING_SIZE};
#[cfg(not(target_arch = "wasm32"))]
use salvium_tx::fee::{self, FeeContext};
#[cfg(not(target_arch = "wasm32"))]
use salvium_tx::types::{output_type, rct_type};
#[cfg(not(target_arch = "wasm32"))]
use salvium_types::address::{parse_address, AddressType};

/// Default number of subaddresses to pre-generate per account.
const DEFAULT_SUBADDRESS_COUNT: u32 = 50;

/// High-level wallet.
///
/// Manages keys, subaddresses, and (on native) persistent storage + sync.
pub struct Wallet {
    keys: WalletKeys,
    subaddress_maps: SubaddressMaps,
    scan_context: ScanContext,

    #[cfg(not(target_arch = "wasm32"))]
    db: std::sync::Mutex<salvium_crypto::storage::WalletDb>,
}

impl Wallet {
    /// Create a new wallet from a seed, writing to a new database file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn create(
        seed: [u8; 32],
        network: Network,
        db_path: &str,
        db_key: &[u8],
    ) -> Result<Self, WalletError> {
        let keys = WalletKeys::from_seed(seed, network);
        Self::init_with_keys(keys, db_path, db_key)
    }

    /// Open an existing wallet with pre-constructed keys.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn open(
        keys: WalletKeys,
        db_path: &str,
        db_key: &[u8],
    ) -> Result<Self, WalletError> {
        Self::init_with_keys(keys, db_path, db_key)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn init_with_keys(
        keys: WalletKeys,
        db_path: &str,
        db_key: &[u8],
    ) -> Result<Self, WalletError> {
        let db = salvium_crypto::storage::WalletDb::open(db_path, db_key)
            .map_err(|e| WalletError::Storage(e.to_string()))?;

        let maps = SubaddressMaps::generate(&keys, 1, DEFAULT_SUBADDRESS_COUNT);
        let scan_context =
            ScanContext::from_keys(&keys, maps.cn.clone(), maps.carrot.clone());

        Ok(Self {
            keys,
            subaddress_maps: maps,
            scan_context,
            db: std::sync::Mutex::new(db),
        })
    }

    // ── Key accessors ────────────────────────────────────────────────────

    /// Get the wallet type (Full / ViewOnly / Watch).
    pub fn wallet_type(&self) -> WalletType {
        self.keys.wallet_type
    }

    /// Get the network (Mainnet / Testnet / Stagenet).
    pub fn network(&self) -> Network {
        self.keys.network
    }

    /// Get the primary CryptoNote address.
    pub fn cn_address(&self) -> Result<String, WalletError> {
        self.keys
            .cn_address()
            .map_err(|e| WalletError::InvalidAddress(e.to_string()))
    }

    /// Get the primary CARROT address.
    pub fn carrot_address(&self) -> Result<String, WalletError> {
        self.keys
            .carrot_address()
            .map_err(|e| WalletError::InvalidAddress(e.to_string()))
    }

    /// Get the CryptoNote view secret key (hex).
    pub fn view_secret_key_hex(&self) -> String {
        hex::encode(self.keys.cn.view_secret_key)
    }

    /// Get the CryptoNote spend public key (hex).
    pub fn spend_public_key_hex(&self) -> String {
        hex::encode(self.keys.cn.spend_public_key)
    }

    /// Whether the wallet can sign transactions.
    pub fn can_spend(&self) -> bool {
        self.keys.can_spend()
    }

    /// Access the raw wallet keys.
    pub fn keys(&self) -> &WalletKeys {
        &self.keys
    }

    /// Access the subaddress maps.
    pub fn subaddress_maps(&self) -> &SubaddressMaps {
        &self.subaddress_maps
    }

    /// Access the scan context.
    pub fn scan_context(&self) -> &ScanContext {
        &self.scan_context
    }

    // ── Balance (native only) ────────────────────────────────────────────

    /// Get balance for an asset type (e.g., "SAL").
    #[cfg(not(target_arch = "wasm32"))]
    pub fn get_balance(
        &self,
        asset_type: &str,
        account_index: i32,
    ) -> Result<salvium_crypto::storage::BalanceResult, WalletError> {
        let db = self.db.lock().map_err(|e| WalletError::Storage(e.to_string()))?;
        let sync_height = db
            .get_sync_height()
            .map_err(|e| WalletError::Storage(e.to_string()))?;
        db.get_balance(sync_height, asset_type, account_index)
            .map_err(|e| WalletError::Storage(e.to_string()))
    }

    /// Get balances for all asset types.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn get_all_balances(
        &self,
        account_index: i32,
    ) -> Result<
        std::collections::HashMap<String, salvium_crypto::storage::BalanceResult>,
        WalletError,
    > {
        let db = self.db.lock().map_err(|e| WalletError::Storage(e.to_string()))?;
        let sync_height = db
            .get_sync_height()
            .map_err(|e| WalletError::Storage(e.to_string()))?;
        db.get_all_balances(sync_height, account_index)
            .map_err(|e| WalletError::Storage(e.to_string()))
    }

    /// Get the current sync height.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn sync_height(&self) -> Result<u64, WalletError> {
        let db = self.db.lock().map_err(|e| WalletError::Storage(e.to_string()))?;
        db.get_sync_height()
            .map(|h| h as u64)
            .map_err(|e| WalletError::Storage(e.to_string()))
    }

    // ── Sync (native only) ───────────────────────────────────────────────

    /// Sync the wallet with the blockchain.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn sync(
        &self,
        daemon: &salvium_rpc::DaemonRpc,
        event_tx: Option<&tokio::sync::mpsc::Sender<SyncEvent>>,
    ) -> Result<u64, WalletError> {
        SyncEngine::sync(daemon, &self.db, &self.scan_context, event_tx).await
    }

    // ── UTXO selection ───────────────────────────────────────────────────

    /// Select unspent outputs for a transfer.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn select_outputs(
        &self,
        amount: u64,
        fee: u64,
        asset_type: &str,
        strategy: SelectionStrategy,
    ) -> Result<utxo::SelectionResult, WalletError> {
        let db = self.db.lock().map_err(|e| WalletError::Storage(e.to_string()))?;
        let sync_height = db
            .get_sync_height()
            .map_err(|e| WalletError::Storage(e.to_string()))?;

        let query = salvium_crypto::storage::OutputQuery {
            is_spent: Some(false),
            is_frozen: Some(false),
            asset_type: Some(asset_type.to_string()),
            tx_type: None,
            account_index: None,
            subaddress_index: None,
            min_amount: None,
            max_amount: None,
        };

        let outputs = db
            .get_outputs(&query)
            .map_err(|e| WalletError::Storage(e.to_string()))?;

        // Filter to unlocked outputs only.
        let candidates: Vec<UtxoCandidate> = outputs
            .into_iter()
            .filter(|o| is_output_unlocked(o, sync_height))
            .filter_map(|o| {
                let amount = o.amount.parse::<u64>().ok()?;
                Some(UtxoCandidate {
                    key_image: o.key_image.unwrap_or_default(),
                    amount,
                    block_height: o.block_height.unwrap_or(0) as u64,
                    global_index: o.global_index.unwrap_or(0) as u64,
                })
            })
            .collect();

        utxo::select_utxos(&candidates, amount, fee, strategy).ok_or(WalletError::NoOutputs)
    }

    /// Select CARROT-only unspent outputs for a SALVIUM_ONE transfer.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn select_carrot_outputs(
        &self,
        amount: u64,
        fee: u64,
        asset_type: &str,
        strategy: SelectionStrategy,
    ) -> Result<utxo::SelectionResult, WalletError> {
        let db = self.db.lock().map_err(|e| WalletError::Storage(e.to_string()))?;
        let sync_height = db
            .get_sync_height()
            .map_err(|e| WalletError::Storage(e.to_string()))?;

        let query = salvium_crypto::storage::OutputQuery {
            is_spent: Some(false),
            is_frozen: Some(false),
            asset_type: Some(asset_type.to_string()),
            tx_type: None,
            account_index: None,
            subaddress_index: None,
            min_amount: None,
            max_amount: None,
        };

        let outputs = db
            .get_outputs(&query)
            .map_err(|e| WalletError::Storage(e.to_string()))?;

        let candidates: Vec<UtxoCandidate> = outputs
            .into_iter()
            .filter(|o| o.is_carrot && is_output_unlocked(o, sync_height))
            .filter_map(|o| {
                let amount = o.amount.parse::<u64>().ok()?;
                Some(UtxoCandidate {
                    key_image: o.key_image.unwrap_or_default(),
                    amount,
                    block_height: o.block_height.unwrap_or(0) as u64,
                    global_index: o.global_index.unwrap_or(0) as u64,
                })
            })
            .collect();

        utxo::select_utxos(&candidates, amount, fee, strategy).ok_or(WalletError::NoOutputs)
    }

    // ── Output lookup ──────────────────────────────────────────────────

    /// Get a single output by key image.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn get_output(
        &self,
        key_image: &str,
    ) -> Result<Option<salvium_crypto::storage::OutputRow>, WalletError> {
        let db = self.db.lock().map_err(|e| WalletError::Storage(e.to_string()))?;
        db.get_output(key_image)
            .map_err(|e| WalletError::Storage(e.to_string()))
    }

    /// Mark an output as spent by key image.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn mark_output_spent(
        &self,
        key_image: &str,
        spending_tx_hash: &str,
    ) -> Result<(), WalletError> {
        let db = self.db.lock().map_err(|e| WalletError::Storage(e.to_string()))?;
        db.mark_spent(key_image, spending_tx_hash, 0)
            .map_err(|e| WalletError::Storage(e.to_string()))
    }

    // ── Transfers query ──────────────────────────────────────────────────

    /// Get transactions matching a query.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn get_transfers(
        &self,
        query: &salvium_crypto::storage::TxQuery,
    ) -> Result<Vec<salvium_crypto::storage::TransactionRow>, WalletError> {
        let db = self.db.lock().map_err(|e| WalletError::Storage(e.to_string()))?;
        db.get_txs(query)
            .map_err(|e| WalletError::Storage(e.to_string()))
    }

    // ── Staking ──────────────────────────────────────────────────────────

    /// Get all stakes, optionally filtered by status.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn get_stakes(
        &self,
        status: Option<&str>,
    ) -> Result<Vec<salvium_crypto::storage::StakeRow>, WalletError> {
        let db = self.db.lock().map_err(|e| WalletError::Storage(e.to_string()))?;
        db.get_stakes(status, None)
            .map_err(|e| WalletError::Storage(e.to_string()))
    }

    // ── Transfer building (§4.I) ─────────────────────────────────────────

    /// Build an unsigned transfer transaction.
    ///
    /// Selects unspent outputs, builds decoy rings against the live output
    /// distribution, re-derives each selected output's one-time spend key,
    /// and assembles an `UnsignedTransaction` via `TransactionBuilder`,
    /// pricing the fee against chain state fetched from `daemon` rather
    /// than falling back to `FeeContext::default`'s offline floor. If the
    /// assembled transaction's real byte-weight pushes the fee above what
    /// selection budgeted for, re-selects once against the grown fee and
    /// rebuilds.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn build_transfer(
        &self,
        daemon: &DaemonRpc,
        destinations: &[TransferDestination],
        options: &TransferOptions,
    ) -> Result<UnsignedTransaction, WalletError> {
        if destinations.is_empty() {
            return Err(WalletError::Other("no destinations given".into()));
        }
        if !self.can_spend() {
            return Err(WalletError::ViewOnly("build a transfer".into()));
        }

        let dest_addrs: Vec<_> = destinations
            .iter()
            .map(|d| {
                parse_address(&d.address).map_err(|e| WalletError::InvalidAddress(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let total_out: u64 = destinations.iter().map(|d| d.amount).sum();

        let hf_info = daemon.hard_fork_info().await?;
        let rct = fee::rct_type_for_hf(hf_info.version);
        let use_tclsag = fee::uses_tclsag(rct);
        let out_type = if rct >= rct_type::SALVIUM_ONE {
            output_type::CARROT_V1
        } else {
            output_type::TAGGED_KEY
        };
        let tx_asset_type = if rct >= rct_type::SALVIUM_ONE { "SAL1" } else { "SAL" };
        let num_outputs = destinations.len() + 1; // +1 for change

        let fee_ctx = live_fee_context(daemon).await?;
        let mut budgeted_fee = fee::estimate_tx_fee(
            1,
            num_outputs,
            DEFAULT_RING_SIZE,
            use_tclsag,
            out_type,
            options.priority,
            fee_ctx,
        );

        let keys = self.keys();
        for attempt in 0..2 {
            let selection = if rct >= rct_type::SALVIUM_ONE {
                self.select_carrot_outputs(
                    total_out,
                    budgeted_fee,
                    &options.asset_type,
                    options.strategy,
                )?
            } else {
                self.select_outputs(
                    total_out,
                    budgeted_fee,
                    &options.asset_type,
                    options.strategy,
                )?
            };

            let prepared = self
                .prepare_inputs(daemon, &selection.selected, tx_asset_type)
                .await?;

            let refreshed_fee = fee::estimate_tx_fee(
                prepared.len(),
                num_outputs,
                DEFAULT_RING_SIZE,
                use_tclsag,
                out_type,
                options.priority,
                fee_ctx,
            );

            // Step 5: if real input count raised the fee past what selection
            // budgeted for, reselect once against the grown fee.
            if attempt == 0 && refreshed_fee > budgeted_fee {
                budgeted_fee = refreshed_fee;
                continue;
            }

            let mut builder = TransactionBuilder::new()
                .add_inputs(prepared)
                .set_rct_type(rct)
                .set_fee_context(fee_ctx)
                .set_fee(refreshed_fee)
                .set_asset_types(tx_asset_type, tx_asset_type);

            for (dest, addr) in destinations.iter().zip(dest_addrs.iter()) {
                builder = builder.add_destination(Destination {
                    spend_pubkey: addr.spend_public_key,
                    view_pubkey: addr.view_public_key,
                    amount: dest.amount,
                    asset_type: tx_asset_type.to_string(),
                    payment_id: options.payment_id,
                    is_subaddress: addr.address_type == AddressType::Subaddress,
                });
            }

            builder = if rct >= rct_type::SALVIUM_ONE {
                builder.set_change_address(
                    keys.carrot.account_spend_pubkey,
                    keys.carrot.account_view_pubkey,
                )
            } else {
                builder.set_change_address(keys.cn.spend_public_key, keys.cn.view_public_key)
            };

            return builder.build().map_err(WalletError::from);
        }

        unreachable!("loop above always returns on its second iteration")
    }

    /// Fetch ring members and re-derive the spend key for each selected output.
    ///
    /// `tx_asset_type` is the current hard fork's RCT asset type, used for
    /// daemon-side indices — it may differ from the asset type the output
    /// was originally scanned and stored under.
    #[cfg(not(target_arch = "wasm32"))]
    async fn prepare_inputs(
        &self,
        daemon: &DaemonRpc,
        selected: &[UtxoCandidate],
        tx_asset_type: &str,
    ) -> Result<Vec<PreparedInput>, WalletError> {
        let rows: Vec<salvium_crypto::storage::OutputRow> = selected
            .iter()
            .map(|u| {
                self.get_output(&u.key_image)?.ok_or_else(|| {
                    WalletError::Other(format!("output {} vanished from storage", u.key_image))
                })
            })
            .collect::<Result<_, WalletError>>()?;

        let mut tx_hashes: Vec<String> = rows.iter().map(|r| r.tx_hash.clone()).collect();
        tx_hashes.sort();
        tx_hashes.dedup();
        let tx_hash_refs: Vec<&str> = tx_hashes.iter().map(|s| s.as_str()).collect();
        let tx_entries = daemon.get_transactions(&tx_hash_refs, false).await?;
        let height_by_hash: std::collections::HashMap<&str, u64> = tx_hashes
            .iter()
            .map(|s| s.as_str())
            .zip(tx_entries.iter().map(|e| e.block_height))
            .collect();

        let dist = daemon
            .get_output_distribution(&[0], 0, 0, true, tx_asset_type)
            .await?;
        let dist_entry = dist
            .first()
            .ok_or_else(|| WalletError::Other("empty output distribution".into()))?;
        let rct_offsets = &dist_entry.distribution;
        let decoy_selector = DecoySelector::new(rct_offsets.clone())?;

        let keys = self.keys();
        let mut prepared = Vec::with_capacity(rows.len());

        for (utxo, row) in selected.iter().zip(rows.iter()) {
            let output_index = row.output_index as u32;
            let output_pub_key_hex = row
                .public_key
                .as_ref()
                .ok_or_else(|| WalletError::Other("output row missing public_key".into()))?;
            let output_pub_key = hex_to_32(output_pub_key_hex)?;

            let block_height = *height_by_hash.get(row.tx_hash.as_str()).ok_or_else(|| {
                WalletError::Other(format!(
                    "tx {} missing from get_transactions response",
                    row.tx_hash
                ))
            })?;
            let h_idx = block_height.saturating_sub(dist_entry.start_height) as usize;
            let at_start = if h_idx == 0 {
                0
            } else {
                rct_offsets.get(h_idx - 1).copied().unwrap_or(0)
            };
            let at_end = *rct_offsets.get(h_idx).ok_or_else(|| {
                WalletError::Other(format!(
                    "height {} outside output distribution range",
                    block_height
                ))
            })?;
            let at_count = at_end - at_start;

            let asset_type_index = if at_count == 1 {
                at_start
            } else if at_count == 0 {
                return Err(WalletError::Other(format!(
                    "no {} outputs recorded at height {}",
                    tx_asset_type, block_height
                )));
            } else {
                let candidates: Vec<OutputRequest> = (at_start..at_end)
                    .map(|idx| OutputRequest { amount: 0, index: idx })
                    .collect();
                let probe = daemon.get_outs(&candidates, false, tx_asset_type).await?;
                probe
                    .iter()
                    .position(|o| o.key == *output_pub_key_hex)
                    .map(|i| at_start + i as u64)
                    .ok_or_else(|| {
                        WalletError::Other(format!(
                            "could not locate output {} among {} candidates at height {}",
                            output_pub_key_hex, at_count, block_height
                        ))
                    })?
            };

            let (secret_key, secret_key_y, public_key) = if row.is_carrot {
                let prove_spend_key = keys
                    .carrot
                    .prove_spend_key
                    .ok_or_else(|| WalletError::ViewOnly("build a transfer".into()))?;
                let generate_image_key = keys.carrot.generate_image_key;
                let shared_secret = hex_to_32(row.carrot_shared_secret.as_ref().ok_or_else(
                    || WalletError::Other("carrot output missing shared_secret".into()),
                )?)?;
                let commitment = if let Some(ref c) = row.commitment {
                    hex_to_32(c)?
                } else {
                    let amount: u64 = row
                        .amount
                        .parse()
                        .map_err(|_| WalletError::Other("invalid stored amount".into()))?;
                    let mask = hex_to_32(
                        row.mask
                            .as_ref()
                            .ok_or_else(|| WalletError::Other("output missing mask".into()))?,
                    )?;
                    to_32(&salvium_crypto::pedersen_commit(&amount.to_le_bytes(), &mask))
                };
                let (sk_x, sk_y) = salvium_crypto::carrot_scan::derive_carrot_spend_keys(
                    &prove_spend_key,
                    &generate_image_key,
                    &shared_secret,
                    &commitment,
                );
                (sk_x, Some(sk_y), output_pub_key)
            } else {
                let spend_secret = keys
                    .cn
                    .spend_secret_key
                    .ok_or_else(|| WalletError::ViewOnly("build a transfer".into()))?;
                let view_secret = keys.cn.view_secret_key;
                let tx_pub_key = hex_to_32(
                    row.tx_pub_key
                        .as_ref()
                        .ok_or_else(|| WalletError::Other("output missing tx_pub_key".into()))?,
                )?;
                let sk = salvium_crypto::cn_scan::derive_output_spend_key(
                    &view_secret,
                    &spend_secret,
                    &tx_pub_key,
                    output_index,
                    row.subaddress_index.major as u32,
                    row.subaddress_index.minor as u32,
                );
                let pk = to_32(&salvium_crypto::scalar_mult_base(&sk));
                (sk, None, pk)
            };

            let mask = hex_to_32(
                row.mask
                    .as_ref()
                    .ok_or_else(|| WalletError::Other("output missing mask".into()))?,
            )?;

            let (ring_indices, real_index) =
                decoy_selector.build_ring(asset_type_index, DEFAULT_RING_SIZE)?;
            let out_requests: Vec<OutputRequest> = ring_indices
                .iter()
                .map(|&idx| OutputRequest { amount: 0, index: idx })
                .collect();
            let ring_members = daemon.get_outs(&out_requests, false, tx_asset_type).await?;
            let ring: Vec<[u8; 32]> = ring_members
                .iter()
                .map(|m| hex_to_32(&m.key))
                .collect::<Result<_, _>>()?;
            let ring_commitments: Vec<[u8; 32]> = ring_members
                .iter()
                .map(|m| hex_to_32(&m.mask))
                .collect::<Result<_, _>>()?;

            prepared.push(PreparedInput {
                secret_key,
                secret_key_y,
                public_key,
                amount: utxo.amount,
                mask,
                asset_type: tx_asset_type.to_string(),
                global_index: asset_type_index,
                ring,
                ring_commitments,
                ring_indices,
                real_index,
            });
        }

        Ok(prepared)
    }
}

/// Fetch the chain state the dynamic fee model (§4.J) needs: the current
/// base reward and short/long-term block-weight medians.
///
/// The long-term window is bounded to a single practical `get_block_headers_range`
/// call rather than the full `LONG_TERM_BLOCK_WEIGHT_WINDOW_SIZE` (100,000
/// blocks) — a lightweight wallet that doesn't track the window
/// incrementally like a full node trades exactness for one bounded round
/// trip. The short-term median reuses the tail of the same fetch.
#[cfg(not(target_arch = "wasm32"))]
async fn live_fee_context(daemon: &DaemonRpc) -> Result<FeeContext, WalletError> {
    const LONG_TERM_WINDOW: u64 = 5000;

    let header = daemon.get_last_block_header().await?;
    let height = header.height;
    let window_start = height.saturating_sub(LONG_TERM_WINDOW);
    let headers = daemon.get_block_headers_range(window_start, height).await?;
    let weights: Vec<u64> = headers.iter().map(|h| h.block_weight).collect();

    let long_term_median = salvium_consensus::chain_state::get_median_block_weight(&weights);
    let short_window = (salvium_types::consensus::DIFFICULTY_WINDOW_V2).min(weights.len());
    let short_term_median = salvium_consensus::chain_state::get_median_block_weight(
        &weights[weights.len() - short_window..],
    );

    Ok(FeeContext {
        base_reward: header.reward,
        short_term_median,
        long_term_median,
    })
}

/// Decode a hex string into exactly 32 bytes.
#[cfg(not(target_arch = "wasm32"))]
fn hex_to_32(s: &str) -> Result<[u8; 32], WalletError> {
    let bytes =
        hex::decode(s).map_err(|e| WalletError::Other(format!("invalid hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(WalletError::Other(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// Copy up to 32 bytes into a fixed-size array, zero-padded.
#[cfg(not(target_arch = "wasm32"))]
fn to_32(v: &[u8]) -> [u8; 32] {
    let mut arr = [0u8; 32];
    let len = v.len().min(32);
    arr[..len].copy_from_slice(&v[..len]);
    arr
}

/// Check if an output is unlocked (spendable) at the given height.
#[cfg(not(target_arch = "wasm32"))]
fn is_output_unlocked(output: &salvium_crypto::storage::OutputRow, current_height: i64) -> bool {
    let unlock_time: u64 = output.unlock_time.parse().unwrap_or(0);
    if unlock_time == 0 {
        // Standard 10-confirmation rule.
        let out_height = output.block_height.unwrap_or(0);
        return current_height >= out_height + 10;
    }

    // Unlock time < 500_000_000 → block height.
    // Unlock time >= 500_000_000 → Unix timestamp.
    if unlock_time < 500_000_000 {
        current_height as u64 >= unlock_time
    } else {
        // Use block timestamp approximation (120s per block).
        let current_time = output.block_timestamp.unwrap_or(0) as u64
            + (current_height as u64 - output.block_height.unwrap_or(0) as u64) * 120;
        current_time >= unlock_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_key_accessors() {
        // Create keys without DB (for testing).
        let keys = WalletKeys::from_seed([42u8; 32], Network::Testnet);
        let maps = SubaddressMaps::generate(&keys, 1, 5);
        let scan_ctx = ScanContext::from_keys(&keys, maps.cn.clone(), maps.carrot.clone());

        // Verify the scan context captures the right keys.
        assert_eq!(scan_ctx.cn_view_secret, keys.cn.view_secret_key);
        assert!(scan_ctx.carrot_enabled);
    }

    #[test]
    fn test_cn_address_is_valid() {
        let keys = WalletKeys::from_seed([42u8; 32], Network::Testnet);
        let addr = keys.cn_address().unwrap();
        assert!(salvium_types::address::is_valid_address(&addr));
    }

    #[test]
    fn test_carrot_address_is_valid() {
        let keys = WalletKeys::from_seed([42u8; 32], Network::Testnet);
        let addr = keys.carrot_address().unwrap();
        assert!(salvium_types::address::is_valid_address(&addr));
    }

    #[test]
    fn test_addresses_differ_between_cn_and_carrot() {
        let keys = WalletKeys::from_seed([42u8; 32], Network::Testnet);
        let cn = keys.cn_address().unwrap();
        let carrot = keys.carrot_address().unwrap();
        assert_ne!(cn, carrot);
    }
}
