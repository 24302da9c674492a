//! Crate-level tests for fundme-transaction.
//!
//! Covers wire roundtrips, txid computation, the FORKID signature hash
//! with and without token prefixes, and P2PKH signing end to end.

use fundme_primitives::chainhash::Hash;
use fundme_primitives::ec::{PrivateKey, PublicKey};
use fundme_script::Script;

use crate::input::{Outpoint, TransactionInput, LOCKTIME_SEQUENCE_NUMBER};
use crate::output::TransactionOutput;
use crate::sighash::{self, SIGHASH_ALL_FORKID, SIGHASH_ANYONECANPAY_ALL_FORKID};
use crate::signature::{split_sighash_type, verify_signature, SigningScheme};
use crate::template::{p2pkh, sign_all, UnlockingScriptTemplate};
use crate::token::TokenData;
use crate::transaction::Transaction;
use crate::TransactionError;

/// A standard one-input, two-output transaction.
const SOURCE_RAW_TX: &str = "010000000138c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2030000006a47304402203e9ab8e4c14addf3b4741540b556cfb0e0efb67dc1a7b5ce84c3ac56b3fd447802203c9f49f7bd893ebd7060176dfc36bcaff9d2c443d9a0dd6cd2d59b372c024d20412102798913bc057b344de675dac34faafe3dc2f312c758cd9068209f810877306d66ffffffff02dc050000000000002076a914eb0bd5edba389198e73f8efabddfc61666969ff788ac6a0568656c6c6faa0d0000000000001976a914eb0bd5edba389198e73f8efabddfc61666969ff788ac00000000";

const P2PKH_SCRIPT: &str = "76a914c0a3c167a28cabb9fbb495affa0761e6e74ac60d88ac";

fn p2pkh_script() -> Script {
    Script::from_hex(P2PKH_SCRIPT).expect("valid hex")
}

/// Two inputs with attached sources, one plain output.
fn two_input_tx() -> Transaction {
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::spending(
        Outpoint::new(Hash::new([0x11; 32]), 0),
        TransactionOutput::new(10_000, p2pkh_script()),
    ));
    tx.add_input(TransactionInput::spending(
        Outpoint::new(Hash::new([0x22; 32]), 1),
        TransactionOutput::new(5_000, p2pkh_script()),
    ));
    tx.add_output(TransactionOutput::new(14_000, p2pkh_script()));
    tx
}

// -----------------------------------------------------------------------
// Wire format
// -----------------------------------------------------------------------

#[test]
fn test_from_hex_roundtrip() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).expect("should parse source tx hex");
    assert_eq!(tx.version, 1);
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[0].satoshis, 1500);
    assert!(tx.outputs.iter().all(|o| o.token.is_none()));
    assert_eq!(tx.to_hex(), SOURCE_RAW_TX);
    assert_eq!(format!("{}", tx), SOURCE_RAW_TX);
}

#[test]
fn test_parse_errors() {
    let mut bytes = hex::decode(SOURCE_RAW_TX).expect("hex");
    bytes.push(0x00);
    assert!(matches!(
        Transaction::from_bytes(&bytes),
        Err(TransactionError::SerializationError(_))
    ));
    assert!(Transaction::from_hex("zz").is_err());
    assert!(Transaction::from_bytes(&[]).is_err());
    assert!(Transaction::from_bytes(&bytes[..40]).is_err());
}

#[test]
fn test_new_transaction_defaults() {
    let tx = Transaction::new();
    assert_eq!(tx.version, 2);
    assert_eq!(tx.lock_time, 0);
    // version(4) + 0 inputs(1) + 0 outputs(1) + locktime(4)
    assert_eq!(tx.size(), 10);
    assert_eq!(Transaction::from_bytes(&tx.to_bytes()).expect("parses"), tx);
}

#[test]
fn test_token_outputs_roundtrip() {
    let mut tx = two_input_tx();
    let category = tx.inputs[0].outpoint.txid;
    tx.add_output(TransactionOutput::with_token(
        1000,
        p2pkh_script(),
        TokenData::minting(category),
    ));
    tx.add_output(TransactionOutput::with_token(
        783,
        p2pkh_script(),
        TokenData::immutable_nft(category, vec![0x01, 0xe8, 0x03]),
    ));

    let parsed = Transaction::from_hex(&tx.to_hex()).expect("parses");
    assert_eq!(parsed.outputs, tx.outputs);
    // sources are not on the wire
    assert!(parsed.inputs.iter().all(|i| i.source_output().is_none()));
    assert_eq!(parsed.tx_id(), tx.tx_id());
}

#[test]
fn test_tx_id_display_order() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).expect("parses");
    let mut internal = *tx.tx_id().as_bytes();
    internal.reverse();
    assert_eq!(tx.tx_id_hex(), hex::encode(internal));
    assert_eq!(tx.outpoint(1).vout, 1);
    assert_eq!(tx.outpoint(1).txid, tx.tx_id());
}

#[test]
fn test_total_input_satoshis() {
    let mut tx = two_input_tx();
    assert_eq!(tx.total_input_satoshis().expect("sources attached"), 15_000);
    assert_eq!(tx.total_output_satoshis(), 14_000);
    tx.inputs[1].set_source_output(None);
    assert!(tx.total_input_satoshis().is_err());
}

// -----------------------------------------------------------------------
// Signature hash
// -----------------------------------------------------------------------

#[test]
fn test_preimage_structure() {
    let tx = two_input_tx();
    let spent = tx.inputs[0].source_output().expect("source").clone();
    let preimage =
        sighash::calc_preimage(&tx, 0, spent.locking_script.to_bytes(), &spent, SIGHASH_ALL_FORKID)
            .expect("preimage");

    // 4 + 32 + 32 + 36 + (1 + 25) + 8 + 4 + 32 + 4 + 4
    assert_eq!(preimage.len(), 182);
    assert_eq!(&preimage[..4], &2u32.to_le_bytes());
    assert_eq!(&preimage[68..100], &[0x11; 32]);
    assert_eq!(&preimage[preimage.len() - 4..], &0x41u32.to_le_bytes());
}

/// A spent output carrying tokens inserts its prefix before the scriptCode.
#[test]
fn test_preimage_includes_spent_token_prefix() {
    let tx = two_input_tx();
    let plain = tx.inputs[0].source_output().expect("source").clone();
    let token = TokenData::minting(Hash::new([0x33; 32]));
    let tokened = TransactionOutput::with_token(plain.satoshis, plain.locking_script.clone(), token.clone());

    let code = plain.locking_script.to_bytes();
    let a = sighash::calc_preimage(&tx, 0, code, &plain, SIGHASH_ALL_FORKID).expect("preimage");
    let b = sighash::calc_preimage(&tx, 0, code, &tokened, SIGHASH_ALL_FORKID).expect("preimage");
    assert_eq!(b.len(), a.len() + 34);
    assert_eq!(&b[104..138], token.to_bytes().as_slice());
}

/// ANYONECANPAY digests ignore every other input.
#[test]
fn test_anyonecanpay_ignores_other_inputs() {
    let tx = two_input_tx();
    let mut single = tx.clone();
    single.inputs.truncate(1);

    let spent = tx.inputs[0].source_output().expect("source").clone();
    let code = spent.locking_script.to_bytes();
    let flag = SIGHASH_ANYONECANPAY_ALL_FORKID;
    assert_eq!(
        sighash::signature_hash(&tx, 0, code, &spent, flag).expect("digest"),
        sighash::signature_hash(&single, 0, code, &spent, flag).expect("digest"),
    );
    assert_ne!(
        sighash::signature_hash(&tx, 0, code, &spent, SIGHASH_ALL_FORKID).expect("digest"),
        sighash::signature_hash(&single, 0, code, &spent, SIGHASH_ALL_FORKID).expect("digest"),
    );

    let mut changed_output = single.clone();
    changed_output.outputs[0].satoshis -= 1;
    assert_ne!(
        sighash::signature_hash(&single, 0, code, &spent, flag).expect("digest"),
        sighash::signature_hash(&changed_output, 0, code, &spent, flag).expect("digest"),
    );
}

#[test]
fn test_signature_hash_errors() {
    let tx = two_input_tx();
    let spent = tx.inputs[0].source_output().expect("source").clone();
    assert!(sighash::signature_hash(&tx, 5, &[], &spent, SIGHASH_ALL_FORKID).is_err());
    // FORKID is mandatory
    assert!(sighash::signature_hash(&tx, 0, &[], &spent, 0x01).is_err());

    let mut bare = tx.clone();
    bare.inputs[0].set_source_output(None);
    assert!(matches!(
        bare.calc_input_signature_hash(0, None, SIGHASH_ALL_FORKID),
        Err(TransactionError::SigningError(_))
    ));
}

#[test]
fn test_script_code_override() {
    let tx = two_input_tx();
    let redeem = Script::from_asm("OP_1").expect("asm");
    let default = tx.calc_input_signature_hash(0, None, SIGHASH_ALL_FORKID).expect("digest");
    let overridden = tx
        .calc_input_signature_hash(0, Some(redeem.to_bytes()), SIGHASH_ALL_FORKID)
        .expect("digest");
    assert_ne!(default, overridden);
}

#[test]
fn test_locktime_and_sequence_are_committed() {
    let tx = two_input_tx();
    let mut locked = tx.clone();
    locked.lock_time = 1_700_000_000;
    for input in &mut locked.inputs {
        input.sequence_number = LOCKTIME_SEQUENCE_NUMBER;
    }
    assert_ne!(
        tx.calc_input_signature_hash(0, None, SIGHASH_ALL_FORKID).expect("digest"),
        locked.calc_input_signature_hash(0, None, SIGHASH_ALL_FORKID).expect("digest"),
    );
}

// -----------------------------------------------------------------------
// P2PKH signing
// -----------------------------------------------------------------------

/// Signing a non-token input matches a known signed transaction byte for byte.
#[test]
fn test_p2pkh_sign_exact_match() {
    let incomplete_tx_hex = "010000000193a35408b6068499e0d5abd799d3e827d9bfe70c9b75ebe209c91d25072326510000000000ffffffff02404b4c00000000001976a91404ff367be719efa79d76e4416ffb072cd53b208888acde94a905000000001976a91404d03f746652cfcb6cb55119ab473a045137d26588ac00000000";
    let mut tx = Transaction::from_hex(incomplete_tx_hex).expect("should parse unsigned tx");
    tx.inputs[0].set_source_output(Some(TransactionOutput::new(100_000_000, p2pkh_script())));

    let priv_key = PrivateKey::from_wif("cNGwGSc7KRrTmdLUZ54fiSXWbhLNDc2Eg5zNucgQxyQCzuQ5YRDq")
        .expect("should parse WIF");
    let unlocker = p2pkh::unlock(priv_key, SigningScheme::Ecdsa, None);
    tx.inputs[0].unlocking_script = Some(unlocker.sign(&tx, 0).expect("signing should succeed"));

    let expected_signed_tx = "010000000193a35408b6068499e0d5abd799d3e827d9bfe70c9b75ebe209c91d2507232651000000006b483045022100c1d77036dc6cd1f3fa1214b0688391ab7f7a16cd31ea4e5a1f7a415ef167df820220751aced6d24649fa235132f1e6969e163b9400f80043a72879237dab4a1190ad412103b8b40a84123121d260f5c109bc5a46ec819c2e4002e5ba08638783bfb4e01435ffffffff02404b4c00000000001976a91404ff367be719efa79d76e4416ffb072cd53b208888acde94a905000000001976a91404d03f746652cfcb6cb55119ab473a045137d26588ac00000000";
    assert_eq!(tx.to_hex(), expected_signed_tx);
}

#[test]
fn test_p2pkh_signatures_verify_for_both_schemes() {
    for scheme in [SigningScheme::Ecdsa, SigningScheme::Schnorr] {
        let key = PrivateKey::new();
        let mut tx = two_input_tx();
        for input in &mut tx.inputs {
            let value = input.source_satoshis().expect("source");
            let lock = Script::p2pkh(&key.pub_key().hash160());
            input.set_source_output(Some(TransactionOutput::new(value, lock)));
        }

        let unlocker = p2pkh::unlock(key.clone(), scheme, None);
        sign_all(&mut tx, &[&unlocker, &unlocker]).expect("sign");

        for index in 0..2 {
            let chunks = tx.inputs[index]
                .unlocking_script
                .as_ref()
                .expect("signed")
                .chunks()
                .expect("decodes");
            assert_eq!(chunks.len(), 2);
            let sig = chunks[0].push_data().expect("sig push");
            let (body, flag) = split_sighash_type(sig).expect("flagged");
            assert_eq!(u32::from(flag), SIGHASH_ALL_FORKID);
            assert!(u32::try_from(body.len()).expect("len") <= unlocker.estimate_length(&tx, 0));

            let pub_key = PublicKey::from_bytes(chunks[1].push_data().expect("key push")).expect("key");
            let digest = tx
                .calc_input_signature_hash(index, None, SIGHASH_ALL_FORKID)
                .expect("digest");
            assert!(verify_signature(&pub_key, &digest, body));
        }
    }
}

#[test]
fn test_sign_all_template_count() {
    let key = PrivateKey::new();
    let unlocker = p2pkh::unlock(key, SigningScheme::Ecdsa, None);
    let mut tx = two_input_tx();
    assert!(sign_all(&mut tx, &[&unlocker]).is_err());
}

#[test]
fn test_p2pkh_lock_rejects_script_hash_addresses() {
    let p2sh = fundme_script::Address::from_string(
        "bitcoincash:ppm2qsznhks23z7629mms6s4cwef74vcwvn0h829pq",
    )
    .expect("address");
    assert!(p2pkh::lock(&p2sh).is_err());

    let p2pkh_addr = fundme_script::Address::from_string(
        "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a",
    )
    .expect("address");
    assert!(p2pkh::lock(&p2pkh_addr).expect("lock").is_p2pkh());
}
