//! In-memory ledger.
//!
//! Holds a UTXO set and accepts transactions that satisfy the consensus
//! rules the contract engine relies on:
//!
//! - every input exists and is unspent (double spends are rejected),
//! - outputs never exceed inputs and none is below the dust limit,
//! - the lock time is reached when any input opts into it,
//! - P2PKH inputs carry a valid signature for their key hash,
//! - P2SH inputs reveal the redeem script their output commits to,
//! - token categories are only created at genesis and NFTs are only
//!   minted by a minting input.
//!
//! Contract bytecode itself is not evaluated.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use fundme_primitives::chainhash::Hash;
use fundme_primitives::ec::PublicKey;
use fundme_script::Script;
use fundme_transaction::signature::{split_sighash_type, verify_signature};
use fundme_transaction::{
    NftCapability, Outpoint, Transaction, TransactionInput, TransactionOutput,
};

use crate::broadcaster::{BroadcastFailure, BroadcastSuccess, Broadcaster};
use crate::chain_tracker::ChainTracker;
use crate::error::LedgerError;

/// Smallest output value the ledger relays.
pub const DUST_LIMIT: u64 = 546;

/// Lock times below this are block heights, above it Unix times.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

const SCRIPT_FAILED: &str = "mandatory-script-verify-flag-failed";

#[derive(Default)]
struct State {
    utxos: HashMap<Outpoint, TransactionOutput>,
    spent: HashSet<Outpoint>,
    transactions: HashMap<Hash, Transaction>,
    median_time_past: u32,
    height: u32,
    funding_nonce: u32,
}

/// A single-process ledger with a UTXO set and a settable clock.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

impl MemoryLedger {
    /// Create an empty ledger at height 0 and median time past 0.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::General("ledger state poisoned".to_string()))
    }

    /// Create outputs out of thin air, as a block reward would.
    ///
    /// # Arguments
    /// * `outputs` - The outputs to create.
    ///
    /// # Returns
    /// The funding transaction. Its outputs are spendable immediately at
    /// `tx.outpoint(vout)`.
    pub fn fund(&self, outputs: Vec<TransactionOutput>) -> Result<Transaction, LedgerError> {
        let mut state = self.state()?;
        let mut tx = Transaction::new();
        tx.lock_time = state.funding_nonce;
        state.funding_nonce = state.funding_nonce.wrapping_add(1);
        tx.outputs = outputs;
        state.apply(&tx);
        Ok(tx)
    }

    /// Set the median time past used for time-lock checks.
    pub fn set_median_time_past(&self, time: u32) -> Result<(), LedgerError> {
        self.state()?.median_time_past = time;
        Ok(())
    }

    /// Set the tip height used for height-lock checks.
    pub fn set_height(&self, height: u32) -> Result<(), LedgerError> {
        self.state()?.height = height;
        Ok(())
    }

    /// A transaction the ledger has accepted, by txid.
    pub fn transaction(&self, txid: &Hash) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.state()?.transactions.get(txid).cloned())
    }

    /// Whether `outpoint` has been consumed by an accepted transaction.
    pub fn is_spent(&self, outpoint: &Outpoint) -> Result<bool, LedgerError> {
        Ok(self.state()?.spent.contains(outpoint))
    }

    /// Number of unspent outputs.
    pub fn utxo_count(&self) -> Result<usize, LedgerError> {
        Ok(self.state()?.utxos.len())
    }
}

impl Broadcaster for MemoryLedger {
    fn broadcast(&self, tx: &Transaction) -> Result<BroadcastSuccess, LedgerError> {
        let mut state = self.state()?;
        let txid = tx.tx_id();
        if let Err(failure) = state.check(tx) {
            tracing::warn!(txid = %txid, code = %failure.code, "memory ledger rejected transaction: {}", failure.description);
            return Err(failure.into());
        }
        state.apply(tx);
        tracing::debug!(txid = %txid, inputs = tx.inputs.len(), outputs = tx.outputs.len(), "memory ledger accepted transaction");
        Ok(BroadcastSuccess {
            txid: txid.to_string(),
            message: "accepted".to_string(),
        })
    }
}

impl ChainTracker for MemoryLedger {
    fn source_output(&self, outpoint: &Outpoint) -> Result<Option<TransactionOutput>, LedgerError> {
        Ok(self.state()?.utxos.get(outpoint).cloned())
    }

    fn median_time_past(&self) -> Result<u32, LedgerError> {
        Ok(self.state()?.median_time_past)
    }

    fn current_height(&self) -> Result<u32, LedgerError> {
        Ok(self.state()?.height)
    }
}

// -----------------------------------------------------------------------
// Consensus checks
// -----------------------------------------------------------------------

impl State {
    fn check(&self, tx: &Transaction) -> Result<(), BroadcastFailure> {
        if tx.inputs.is_empty() {
            return Err(BroadcastFailure::new("bad-txns-vin-empty", "transaction has no inputs"));
        }
        if tx.outputs.is_empty() {
            return Err(BroadcastFailure::new("bad-txns-vout-empty", "transaction has no outputs"));
        }
        if self.transactions.contains_key(&tx.tx_id()) {
            return Err(BroadcastFailure::new("txn-already-known", tx.tx_id_hex()));
        }

        let spent = self.spent_outputs(tx)?;

        let value_in: u128 = spent.iter().map(|o| u128::from(o.satoshis)).sum();
        let value_out: u128 = tx.outputs.iter().map(|o| u128::from(o.satoshis)).sum();
        if value_out > value_in {
            return Err(BroadcastFailure::new(
                "bad-txns-in-belowout",
                format!("outputs {} exceed inputs {}", value_out, value_in),
            ));
        }

        for (vout, output) in tx.outputs.iter().enumerate() {
            if output.satoshis < DUST_LIMIT {
                return Err(BroadcastFailure::new(
                    "dust",
                    format!("output {} carries {} sats", vout, output.satoshis),
                ));
            }
            if let Some(token) = &output.token {
                token
                    .validate()
                    .map_err(|e| BroadcastFailure::new("bad-txns-token-prefix", e.to_string()))?;
            }
        }

        self.check_finality(tx)?;

        let mut signing = tx.clone();
        for (input, source) in signing.inputs.iter_mut().zip(&spent) {
            input.set_source_output(Some(source.clone()));
        }
        for index in 0..signing.inputs.len() {
            check_input_script(&signing, index)?;
        }

        check_tokens(tx, &spent)
    }

    fn spent_outputs(&self, tx: &Transaction) -> Result<Vec<TransactionOutput>, BroadcastFailure> {
        let mut seen = HashSet::with_capacity(tx.inputs.len());
        let mut spent = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            if !seen.insert(input.outpoint) {
                return Err(BroadcastFailure::new(
                    "bad-txns-inputs-duplicate",
                    format!("{} spent twice", input.outpoint),
                ));
            }
            match self.utxos.get(&input.outpoint) {
                Some(output) => spent.push(output.clone()),
                None if self.spent.contains(&input.outpoint) => {
                    return Err(BroadcastFailure::new(
                        "txn-mempool-conflict",
                        format!("{} already spent", input.outpoint),
                    ))
                }
                None => {
                    return Err(BroadcastFailure::new(
                        "missing-inputs",
                        format!("{} not found", input.outpoint),
                    ))
                }
            }
        }
        Ok(spent)
    }

    fn check_finality(&self, tx: &Transaction) -> Result<(), BroadcastFailure> {
        if tx.lock_time == 0 || tx.inputs.iter().all(TransactionInput::is_final) {
            return Ok(());
        }
        let clock = if tx.lock_time < LOCKTIME_THRESHOLD {
            self.height.saturating_add(1)
        } else {
            self.median_time_past
        };
        if tx.lock_time < clock {
            Ok(())
        } else {
            Err(BroadcastFailure::new(
                "non-final",
                format!("lock time {} not reached, clock is {}", tx.lock_time, clock),
            ))
        }
    }

    fn apply(&mut self, tx: &Transaction) {
        let txid = tx.tx_id();
        for input in &tx.inputs {
            self.utxos.remove(&input.outpoint);
            self.spent.insert(input.outpoint);
        }
        for (vout, output) in tx.outputs.iter().enumerate() {
            self.utxos.insert(Outpoint::new(txid, vout as u32), output.clone());
        }
        self.transactions.insert(txid, tx.clone());
    }
}

/// Check the unlocking script of one input whose source output is attached.
fn check_input_script(tx: &Transaction, index: usize) -> Result<(), BroadcastFailure> {
    let input = &tx.inputs[index];
    let lock = match input.source_output() {
        Some(source) => &source.locking_script,
        None => return Err(BroadcastFailure::new("missing-inputs", format!("input {}", index))),
    };
    if !lock.is_p2pkh() && !lock.is_p2sh() {
        return Ok(());
    }
    let unlocking = input
        .unlocking_script
        .as_ref()
        .ok_or_else(|| BroadcastFailure::new(SCRIPT_FAILED, format!("input {} is unsigned", index)))?;

    if lock.is_p2pkh() {
        return check_p2pkh(tx, index, lock, unlocking);
    }
    let redeem = unlocking
        .last_push()
        .map_err(|e| BroadcastFailure::new(SCRIPT_FAILED, format!("input {}: {}", index, e)))?;
    if lock.p2sh_matches(&redeem) {
        Ok(())
    } else {
        Err(BroadcastFailure::new(
            SCRIPT_FAILED,
            format!("input {} reveals the wrong redeem script", index),
        ))
    }
}

fn check_p2pkh(
    tx: &Transaction,
    index: usize,
    lock: &Script,
    unlocking: &Script,
) -> Result<(), BroadcastFailure> {
    let fail = |why: &str| BroadcastFailure::new(SCRIPT_FAILED, format!("input {}: {}", index, why));

    let chunks = unlocking.chunks().map_err(|e| fail(&e.to_string()))?;
    let (sig, key) = match chunks.as_slice() {
        [sig, key] => (sig.push_data(), key.push_data()),
        _ => return Err(fail("expected <sig> <pubkey>")),
    };
    let (sig, key) = sig.zip(key).ok_or_else(|| fail("expected two pushes"))?;

    let pub_key = PublicKey::from_bytes(key).map_err(|e| fail(&e.to_string()))?;
    if lock.hash_digest() != Some(pub_key.hash160().as_slice()) {
        return Err(fail("public key does not match key hash"));
    }
    let (body, flag) = split_sighash_type(sig).ok_or_else(|| fail("empty signature"))?;
    let digest = tx
        .calc_input_signature_hash(index, None, u32::from(flag))
        .map_err(|e| fail(&e.to_string()))?;
    if verify_signature(&pub_key, &digest, body) {
        Ok(())
    } else {
        Err(fail("signature does not verify"))
    }
}

#[derive(Default)]
struct TokenBudget {
    amount: u128,
    minting: bool,
    mutable: usize,
    immutable: Vec<Vec<u8>>,
}

impl TokenBudget {
    fn take_mutable(&mut self) -> bool {
        if self.mutable == 0 {
            return false;
        }
        self.mutable -= 1;
        true
    }
}

/// Every output token must be justified by a genesis input or by the tokens
/// of the same category being spent. Input tokens may be burned.
fn check_tokens(tx: &Transaction, spent: &[TransactionOutput]) -> Result<(), BroadcastFailure> {
    let genesis: HashSet<Hash> = tx
        .inputs
        .iter()
        .filter(|input| input.outpoint.vout == 0)
        .map(|input| input.outpoint.txid)
        .collect();

    let mut budgets: HashMap<Hash, TokenBudget> = HashMap::new();
    for token in spent.iter().filter_map(|o| o.token.as_ref()) {
        let budget = budgets.entry(token.category).or_default();
        budget.amount += u128::from(token.amount);
        if let Some(nft) = &token.nft {
            match nft.capability {
                NftCapability::Minting => budget.minting = true,
                NftCapability::Mutable => budget.mutable += 1,
                NftCapability::Immutable => budget.immutable.push(nft.commitment.clone()),
            }
        }
    }

    let mut produced: HashMap<Hash, u128> = HashMap::new();
    for token in tx.outputs.iter().filter_map(|o| o.token.as_ref()) {
        if genesis.contains(&token.category) {
            continue;
        }
        let budget = budgets.get_mut(&token.category).ok_or_else(|| {
            BroadcastFailure::new(
                "bad-txns-token-in-belowout",
                format!("category {} has no genesis and no input", token.category),
            )
        })?;
        *produced.entry(token.category).or_default() += u128::from(token.amount);

        let Some(nft) = &token.nft else { continue };
        if budget.minting {
            continue;
        }
        let allowed = match nft.capability {
            NftCapability::Minting => false,
            NftCapability::Mutable => budget.take_mutable(),
            NftCapability::Immutable => {
                match budget.immutable.iter().position(|c| c == &nft.commitment) {
                    Some(pos) => {
                        budget.immutable.swap_remove(pos);
                        true
                    }
                    None => budget.take_mutable(),
                }
            }
        };
        if !allowed {
            return Err(BroadcastFailure::new(
                "bad-txns-token-nft-ex-nihilo",
                format!("NFT of category {} is not backed by an input", token.category),
            ));
        }
    }

    for (category, amount) in produced {
        let available = budgets.get(&category).map_or(0, |b| b.amount);
        if amount > available {
            return Err(BroadcastFailure::new(
                "bad-txns-token-in-belowout",
                format!("category {} outputs {} of {} tokens", category, amount, available),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundme_primitives::ec::PrivateKey;
    use fundme_transaction::signature::SigningScheme;
    use fundme_transaction::template::{p2pkh, UnlockingScriptTemplate};
    use fundme_transaction::input::LOCKTIME_SEQUENCE_NUMBER;
    use fundme_transaction::TokenData;

    fn key_script(key: &PrivateKey) -> Script {
        Script::p2pkh(&key.pub_key().hash160())
    }

    /// A P2SH32 output spendable by revealing `OP_1`.
    fn redeem() -> Script {
        Script::from_asm("OP_1").expect("asm")
    }

    fn reveal(redeem: &Script) -> Script {
        let mut script = Script::new();
        script.append_push_data(redeem.to_bytes()).expect("push");
        script
    }

    fn spend_p2sh(
        ledger: &MemoryLedger,
        outpoint: Outpoint,
        outputs: Vec<TransactionOutput>,
    ) -> Result<BroadcastSuccess, LedgerError> {
        let mut tx = Transaction::new();
        let mut input = TransactionInput::new(outpoint);
        input.unlocking_script = Some(reveal(&redeem()));
        tx.add_input(input);
        tx.outputs = outputs;
        ledger.broadcast(&tx)
    }

    fn rejected_code(result: Result<BroadcastSuccess, LedgerError>) -> String {
        match result {
            Err(LedgerError::Rejected(failure)) => failure.code,
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    fn p2sh_output(sats: u64) -> TransactionOutput {
        TransactionOutput::new(sats, Script::p2sh32_for(&redeem()))
    }

    #[test]
    fn test_signed_p2pkh_spend_accepted() {
        let ledger = MemoryLedger::new();
        let key = PrivateKey::new();
        let funding = ledger
            .fund(vec![TransactionOutput::new(10_000, key_script(&key))])
            .expect("fund");

        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::spending(
            funding.outpoint(0),
            funding.outputs[0].clone(),
        ));
        tx.add_output(TransactionOutput::new(9_000, key_script(&key)));
        let unlocker = p2pkh::unlock(key, SigningScheme::Schnorr, None);
        tx.inputs[0].unlocking_script = Some(unlocker.sign(&tx, 0).expect("sign"));

        let success = ledger.broadcast(&tx).expect("accepted");
        assert_eq!(success.txid, tx.tx_id_hex());
        assert!(ledger.is_spent(&funding.outpoint(0)).expect("state"));
        assert_eq!(
            ledger.source_output(&tx.outpoint(0)).expect("state"),
            Some(tx.outputs[0].clone())
        );
        assert_eq!(ledger.utxo_count().expect("state"), 1);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let ledger = MemoryLedger::new();
        let owner = PrivateKey::new();
        let funding = ledger
            .fund(vec![TransactionOutput::new(10_000, key_script(&owner))])
            .expect("fund");

        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::spending(
            funding.outpoint(0),
            funding.outputs[0].clone(),
        ));
        tx.add_output(TransactionOutput::new(9_000, key_script(&owner)));
        let thief = p2pkh::unlock(PrivateKey::new(), SigningScheme::Ecdsa, None);
        tx.inputs[0].unlocking_script = Some(thief.sign(&tx, 0).expect("sign"));
        assert_eq!(rejected_code(ledger.broadcast(&tx)), SCRIPT_FAILED);

        tx.inputs[0].unlocking_script = None;
        assert_eq!(rejected_code(ledger.broadcast(&tx)), SCRIPT_FAILED);
    }

    #[test]
    fn test_double_spend_rejected() {
        let ledger = MemoryLedger::new();
        let funding = ledger.fund(vec![p2sh_output(5_000)]).expect("fund");

        spend_p2sh(&ledger, funding.outpoint(0), vec![p2sh_output(4_000)]).expect("first spend");
        let code = rejected_code(spend_p2sh(&ledger, funding.outpoint(0), vec![p2sh_output(3_000)]));
        assert_eq!(code, "txn-mempool-conflict");

        let unknown = Outpoint::new(Hash::new([9; 32]), 0);
        assert_eq!(
            rejected_code(spend_p2sh(&ledger, unknown, vec![p2sh_output(1_000)])),
            "missing-inputs"
        );
    }

    #[test]
    fn test_value_and_dust_rules() {
        let ledger = MemoryLedger::new();
        let funding = ledger.fund(vec![p2sh_output(5_000)]).expect("fund");
        let outpoint = funding.outpoint(0);

        assert_eq!(
            rejected_code(spend_p2sh(&ledger, outpoint, vec![p2sh_output(5_001)])),
            "bad-txns-in-belowout"
        );
        assert_eq!(
            rejected_code(spend_p2sh(&ledger, outpoint, vec![p2sh_output(4_000), p2sh_output(545)])),
            "dust"
        );
        spend_p2sh(&ledger, outpoint, vec![p2sh_output(4_000), p2sh_output(546)])
            .expect("dust floor is spendable");
    }

    #[test]
    fn test_wrong_redeem_script_rejected() {
        let ledger = MemoryLedger::new();
        let other = Script::from_asm("OP_2").expect("asm");
        let funding = ledger
            .fund(vec![TransactionOutput::new(5_000, Script::p2sh20_for(&other))])
            .expect("fund");
        let code = rejected_code(spend_p2sh(&ledger, funding.outpoint(0), vec![p2sh_output(4_000)]));
        assert_eq!(code, SCRIPT_FAILED);
    }

    #[test]
    fn test_time_lock_against_median_time_past() {
        let ledger = MemoryLedger::new();
        let funding = ledger.fund(vec![p2sh_output(5_000)]).expect("fund");
        ledger.set_median_time_past(1_600_000_000).expect("clock");

        let mut tx = Transaction::new();
        let mut input = TransactionInput::new(funding.outpoint(0));
        input.unlocking_script = Some(reveal(&redeem()));
        input.sequence_number = LOCKTIME_SEQUENCE_NUMBER;
        tx.add_input(input);
        tx.add_output(p2sh_output(4_000));
        tx.lock_time = 1_700_000_000;

        assert_eq!(rejected_code(ledger.broadcast(&tx)), "non-final");
        ledger.set_median_time_past(1_700_000_000).expect("clock");
        assert_eq!(rejected_code(ledger.broadcast(&tx)), "non-final");
        ledger.set_median_time_past(1_700_000_001).expect("clock");
        ledger.broadcast(&tx).expect("lock time reached");
    }

    #[test]
    fn test_final_sequence_ignores_lock_time() {
        let ledger = MemoryLedger::new();
        let funding = ledger.fund(vec![p2sh_output(5_000)]).expect("fund");
        let mut tx = Transaction::new();
        let mut input = TransactionInput::new(funding.outpoint(0));
        input.unlocking_script = Some(reveal(&redeem()));
        tx.add_input(input);
        tx.add_output(p2sh_output(4_000));
        tx.lock_time = u32::MAX;
        ledger.broadcast(&tx).expect("final inputs disable the lock time");
    }

    #[test]
    fn test_token_genesis_requires_vout_zero() {
        let ledger = MemoryLedger::new();
        let funding = ledger
            .fund(vec![p2sh_output(5_000), p2sh_output(5_000)])
            .expect("fund");
        let category = funding.tx_id();

        let at_one = vec![TransactionOutput::with_token(
            4_000,
            Script::p2sh32_for(&redeem()),
            TokenData::minting(category),
        )];
        assert_eq!(
            rejected_code(spend_p2sh(&ledger, funding.outpoint(1), at_one.clone())),
            "bad-txns-token-in-belowout"
        );
        spend_p2sh(&ledger, funding.outpoint(0), at_one).expect("genesis at vout 0");
    }

    #[test]
    fn test_minting_input_backs_new_nfts() {
        let ledger = MemoryLedger::new();
        let category = Hash::new([7; 32]);
        let lock = Script::p2sh32_for(&redeem());
        let funding = ledger
            .fund(vec![
                TransactionOutput::new(5_000, lock.clone()),
                TransactionOutput::with_token(5_000, lock.clone(), TokenData::minting(category)),
            ])
            .expect("fund");

        let receipt = TokenData::immutable_nft(category, vec![1, 2, 3]);
        let nft_only = vec![TransactionOutput::with_token(4_000, lock.clone(), receipt.clone())];
        assert_eq!(
            rejected_code(spend_p2sh(&ledger, funding.outpoint(0), nft_only)),
            "bad-txns-token-in-belowout"
        );

        // minting baton passed on, receipt minted
        let tx = {
            let mut tx = Transaction::new();
            let mut input = TransactionInput::new(funding.outpoint(1));
            input.unlocking_script = Some(reveal(&redeem()));
            tx.add_input(input);
            tx.add_output(TransactionOutput::with_token(3_000, lock.clone(), TokenData::minting(category)));
            tx.add_output(TransactionOutput::with_token(1_000, lock.clone(), receipt.clone()));
            tx
        };
        ledger.broadcast(&tx).expect("minting input backs the receipt");

        // the immutable receipt can move unchanged or be burned, never rewritten
        let rewritten = vec![TransactionOutput::with_token(
            800,
            lock.clone(),
            TokenData::immutable_nft(category, vec![9]),
        )];
        assert_eq!(
            rejected_code(spend_p2sh(&ledger, tx.outpoint(1), rewritten)),
            "bad-txns-token-nft-ex-nihilo"
        );
        spend_p2sh(&ledger, tx.outpoint(1), vec![TransactionOutput::new(800, lock)])
            .expect("burning is allowed");
    }
}
