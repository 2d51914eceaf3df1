//! Shared test fixtures: deterministic keys, tapscripts and trees built with
//! `TaprootBuilder` so control blocks and roots are real.

use bitcoin::{
    opcodes::all::*,
    script::Builder,
    secp256k1::{PublicKey, Secp256k1, SecretKey, XOnlyPublicKey},
    taproot::{LeafVersion, TaprootBuilder, TaprootSpendInfo},
    ScriptBuf,
};

use crate::types::TapLeafScript;

/// Install a test logger so `log` output shows up with `--nocapture`
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn secret_key(seed: u8) -> SecretKey {
    SecretKey::from_slice(&[seed; 32]).unwrap()
}

pub fn xonly_key(seed: u8) -> XOnlyPublicKey {
    let secp = Secp256k1::new();
    XOnlyPublicKey::from_keypair(&secret_key(seed).keypair(&secp)).0
}

pub fn full_key(seed: u8) -> PublicKey {
    let secp = Secp256k1::new();
    PublicKey::from_secret_key(&secp, &secret_key(seed))
}

pub fn internal_key() -> XOnlyPublicKey {
    xonly_key(0x42)
}

/// `<key> OP_CHECKSIG`
pub fn checksig_script(key: &XOnlyPublicKey) -> ScriptBuf {
    Builder::new()
        .push_x_only_key(key)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

/// Scripts of the tree `[A, [B, C]]`, one single-sig leaf per signer 1, 2, 3
pub fn three_leaf_scripts() -> Vec<ScriptBuf> {
    (1..=3).map(|seed| checksig_script(&xonly_key(seed))).collect()
}

pub fn three_leaf_spend_info() -> TaprootSpendInfo {
    let secp = Secp256k1::new();
    let scripts = three_leaf_scripts();
    TaprootBuilder::new()
        .add_leaf(1, scripts[0].clone())
        .unwrap()
        .add_leaf(2, scripts[1].clone())
        .unwrap()
        .add_leaf(2, scripts[2].clone())
        .unwrap()
        .finalize(&secp, internal_key())
        .unwrap()
}

/// 2-of-2 tapscript with the first signer's push at byte 5 and the second's
/// at byte 40:
/// `<4-byte tag> <A> OP_CHECKSIGVERIFY OP_NOP <B> OP_CHECKSIG`
pub fn two_of_two_script(first: &XOnlyPublicKey, second: &XOnlyPublicKey) -> ScriptBuf {
    let mut bytes = vec![0x04, 0xde, 0xad, 0xbe, 0xef];
    bytes.push(0x20);
    bytes.extend_from_slice(&first.serialize());
    bytes.push(OP_CHECKSIGVERIFY.to_u8());
    bytes.push(OP_NOP.to_u8());
    bytes.push(0x20);
    bytes.extend_from_slice(&second.serialize());
    bytes.push(OP_CHECKSIG.to_u8());
    ScriptBuf::from_bytes(bytes)
}

/// PSBT leaf script entry for `script` taken from `spend_info`
pub fn leaf_script(spend_info: &TaprootSpendInfo, script: &ScriptBuf) -> TapLeafScript {
    let control_block = spend_info
        .control_block(&(script.clone(), LeafVersion::TapScript))
        .unwrap();
    TapLeafScript::new(script.clone(), LeafVersion::TapScript, control_block.serialize()).unwrap()
}

/// P2TR output script paying to `spend_info`'s output key
pub fn p2tr_script(spend_info: &TaprootSpendInfo) -> ScriptBuf {
    ScriptBuf::new_p2tr_tweaked(spend_info.output_key())
}

/// Balanced two-leaf tree of single-sig leaves for `first` and `second`
pub fn two_leaf_spend_info(first: u8, second: u8) -> TaprootSpendInfo {
    let secp = Secp256k1::new();
    TaprootBuilder::new()
        .add_leaf(1, checksig_script(&xonly_key(first)))
        .unwrap()
        .add_leaf(1, checksig_script(&xonly_key(second)))
        .unwrap()
        .finalize(&secp, internal_key())
        .unwrap()
}
