//! Stake lifecycle tracking.
//!
//! Mirrors the JS `StakeRecord` / `MemoryStorage` stake operations so that
//! Rust-side wallet code can track STAKE -> PROTOCOL-return -> reorg-rollback
//! lifecycles identically to the TypeScript wallet.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Transaction type value for a STAKE transaction.
pub const TX_TYPE_STAKE: u32 = 6;

/// Transaction type value for a PROTOCOL (return) transaction.
pub const TX_TYPE_PROTOCOL: u32 = 7;

// ---------------------------------------------------------------------------
// StakeStatus
// ---------------------------------------------------------------------------

/// Status of a stake record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeStatus {
    Locked,
    Returned,
}

// ---------------------------------------------------------------------------
// StakeRecord
// ---------------------------------------------------------------------------

/// A record tracking the lifecycle of a staking transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeRecord {
    pub tx_hash: String,
    pub output_key: String,
    pub amount_staked: u64,
    pub fee: u64,
    pub block_height: u64,
    pub asset_type: String,
    pub status: StakeStatus,
    pub return_tx_hash: Option<String>,
    pub return_amount: Option<u64>,
    pub return_height: Option<u64>,
    pub return_origin_key: Option<String>,
}

impl Default for StakeRecord {
    fn default() -> Self {
        Self {
            tx_hash: String::new(),
            output_key: String::new(),
            amount_staked: 0,
            fee: 0,
            block_height: 0,
            asset_type: "SAL".to_string(),
            status: StakeStatus::Locked,
            return_tx_hash: None,
            return_amount: None,
            return_height: None,
            return_origin_key: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StakeStore
// ---------------------------------------------------------------------------

/// In-memory stake storage for tracking stake lifecycles.
#[derive(Debug, Clone, Default)]
pub struct StakeStore {
    stakes: Vec<StakeRecord>,
}

impl StakeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a stake record (matched by `tx_hash`).
    pub fn put_stake(&mut self, record: StakeRecord) {
        if let Some(existing) = self.stakes.iter_mut().find(|s| s.tx_hash == record.tx_hash) {
            *existing = record;
        } else {
            self.stakes.push(record);
        }
    }

    /// Look up a stake by its originating transaction hash.
    pub fn get_stake(&self, tx_hash: &str) -> Option<&StakeRecord> {
        self.stakes.iter().find(|s| s.tx_hash == tx_hash)
    }

    /// Look up a stake by its output key (the `return_pubkey` / change-output
    /// public key recorded at stake time).
    pub fn get_stake_by_output_key(&self, output_key: &str) -> Option<&StakeRecord> {
        self.stakes.iter().find(|s| s.output_key == output_key)
    }

    /// Return stakes matching optional filters for status and/or asset type.
    ///
    /// When both filters are `None` all stakes are returned.
    pub fn get_stakes(
        &self,
        status: Option<StakeStatus>,
        asset_type: Option<&str>,
    ) -> Vec<&StakeRecord> {
        self.stakes
            .iter()
            .filter(|s| {
                status.is_none_or(|st| s.status == st)
                    && asset_type.is_none_or(|at| s.asset_type == at)
            })
            .collect()
    }

    /// Mark a locked stake as returned, filling in the return metadata.
    ///
    /// Returns `true` if a matching stake was found and updated, `false`
    /// otherwise.
    pub fn mark_stake_returned(
        &mut self,
        tx_hash: &str,
        return_tx_hash: &str,
        return_amount: u64,
        return_height: u64,
    ) -> bool {
        if let Some(stake) = self.stakes.iter_mut().find(|s| s.tx_hash == tx_hash) {
            stake.status = StakeStatus::Returned;
            stake.return_tx_hash = Some(return_tx_hash.to_string());
            stake.return_amount = Some(return_amount);
            stake.return_height = Some(return_height);
            true
        } else {
            false
        }
    }

    /// Handle a blockchain reorganisation by removing stakes whose
    /// `block_height` is strictly above `height`, and reverting any returned
    /// stakes whose `return_height` is strictly above `height` back to
    /// [`StakeStatus::Locked`].
    pub fn delete_stakes_above(&mut self, height: u64) {
        // First, revert returned stakes where return_height > height but
        // block_height <= height back to Locked.
        for stake in &mut self.stakes {
            if stake.block_height <= height {
                if let Some(rh) = stake.return_height {
                    if rh > height {
                        stake.status = StakeStatus::Locked;
                        stake.return_tx_hash = None;
                        stake.return_amount = None;
                        stake.return_height = None;
                    }
                }
            }
        }

        // Then remove stakes whose block_height is above the cut-off.
        self.stakes.retain(|s| s.block_height <= height);
    }

    /// Number of stake records in the store.
    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract the `return_pubkey` from a transaction JSON blob.
///
/// CARROT path:  `prefix.protocol_tx_data.return_pubkey`
/// Pre-CARROT:   `prefix.return_pubkey`
///
/// Returns `None` when neither path yields a string value.
pub fn extract_return_pubkey(tx_json: &serde_json::Value) -> Option<String> {
    // Try the CARROT path first (preferred).
    let prefix = tx_json.get("prefix");

    if let Some(prefix) = prefix {
        // CARROT: prefix.protocol_tx_data.return_pubkey
        if let Some(ptd) = prefix.get("protocol_tx_data") {
            if let Some(rp) = ptd.get("return_pubkey") {
                if let Some(s) = rp.as_str() {
                    if !s.is_empty() {
                        return Some(s.to_string());
                    }
                }
            }
        }

        // Pre-CARROT: prefix.return_pubkey
        if let Some(rp) = prefix.get("return_pubkey") {
            if let Some(s) = rp.as_str() {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }

    // Fallback: top-level return_pubkey (no prefix wrapper).
    if let Some(rp) = tx_json.get("return_pubkey") {
        if let Some(s) = rp.as_str() {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }

    None
}

/// Record or update stake lifecycle state from a scanned transaction.
///
/// * `tx_type == TX_TYPE_STAKE` (6) — create a new locked [`StakeRecord`].
/// * `tx_type == TX_TYPE_PROTOCOL` (7) — try to match via
///   `return_origin_key` (CARROT) or `output_key` (pre-CARROT) and call
///   [`StakeStore::mark_stake_returned`].
///
/// `owned_output_keys` is a list of `(output_public_key, return_origin_key,
/// amount)` triples for outputs that belong to this wallet.
///
/// `is_our_stake` should be `true` when the wallet spent inputs in a STAKE
/// transaction (i.e. it was **our** stake, not someone else's).
#[allow(clippy::too_many_arguments)]
pub fn record_stake_lifecycle(
    store: &mut StakeStore,
    tx_json: &serde_json::Value,
    tx_hash: &str,
    block_height: u64,
    tx_type: u32,
    amount_staked: u64,
    fee: u64,
    asset_type: &str,
    is_our_stake: bool,
    owned_output_keys: &[(String, Option<String>, u64)],
) {
    match tx_type {
        TX_TYPE_STAKE => {
            if !is_our_stake {
                return;
            }

            // Determine the output key to use for matching returns later.
            let return_pubkey = extract_return_pubkey(tx_json);
            let output_key = return_pubkey
                .or_else(|| owned_output_keys.first().map(|(pk, _, _)| pk.clone()))
                .unwrap_or_default();

            let record = StakeRecord {
                tx_hash: tx_hash.to_string(),
                output_key,
                amount_staked,
                fee,
                block_height,
                asset_type: asset_type.to_string(),
                status: StakeStatus::Locked,
                return_tx_hash: None,
                return_amount: None,
                return_height: None,
                return_origin_key: None,
            };
            store.put_stake(record);
        }
        TX_TYPE_PROTOCOL => {
            // Try to match each owned output to an existing locked stake.
            for (pub_key, return_origin, amount) in owned_output_keys {
                // CARROT path: returnOriginKey -> stake.output_key
                if let Some(origin) = return_origin {
                    if let Some(stake) = store.get_stake_by_output_key(origin) {
                        if stake.status == StakeStatus::Locked {
                            let stake_hash = stake.tx_hash.clone();
                            store.mark_stake_returned(
                                &stake_hash,
                                tx_hash,
                                *amount,
                                block_height,
                            );
                            continue;
                        }
                    }
                }

                // Pre-CARROT path: output public key == stake.output_key
                if let Some(stake) = store.get_stake_by_output_key(pub_key) {
                    if stake.status == StakeStatus::Locked {
                        let stake_hash = stake.tx_hash.clone();
                        store.mark_stake_returned(
                            &stake_hash,
                            tx_hash,
                            *amount,
                            block_height,
                        );
                    }
                }
            }
        }
        _ => {
            // Other transaction types are not relevant to stake tracking.
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
