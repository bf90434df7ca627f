//! Plain data types for the `Wallet::build_transfer` operation (§4.I).
//!
//! Kept separate from `wallet.rs` because these are caller-facing request/
//! option types with no access to wallet internals — the operation itself
//! lives on `Wallet` in `wallet.rs`, alongside `sync`/`select_outputs`.

use salvium_tx::fee::FeePriority;

use crate::utxo::SelectionStrategy;

/// A single requested payment.
#[derive(Debug, Clone)]
pub struct TransferDestination {
    /// Recipient address (CryptoNote or CARROT, standard or subaddress).
    pub address: String,
    /// Amount to send, in atomic units.
    pub amount: u64,
}

/// Options controlling input selection and fee pricing for a transfer.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Asset type to spend from (matches `OutputRow::asset_type` as stored).
    pub asset_type: String,
    /// UTXO selection strategy.
    pub strategy: SelectionStrategy,
    /// Fee priority tier.
    pub priority: FeePriority,
    /// Payment ID to attach to non-subaddress destinations (zero for none).
    pub payment_id: [u8; 8],
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            asset_type: "SAL1".to_string(),
            strategy: SelectionStrategy::Default,
            priority: FeePriority::Normal,
            payment_id: [0u8; 8],
        }
    }
}
