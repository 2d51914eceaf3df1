//! # Tapscript Finalizer
//!
//! Builds the final script-path witness of a taproot input from the PSBT
//! signatures collected for one of its leaves.
//!
//! ## Finalization Flow
//! 1. **Select**: the requested leaf, or the signed leaf with the shortest
//!    control block
//! 2. **Collect**: signatures committing to that leaf's hash
//! 3. **Order**: by signer position in the script, last signer first
//! 4. **Assemble**: `[signatures..., script, control block]`

use bitcoin::{
    script::Error as ScriptError,
    sighash::TapSighashType,
    taproot::TapLeafHash,
};

use crate::error::{TaprootError, TaprootResult};
use crate::types::{PsbtInput, TapLeafScript, TapScriptSig};
use crate::utils::{script::pubkey_position_in_script, witness::witness_stack_to_script_witness};

/// Finalize a taproot script-path input and return its serialized
/// `finalScriptWitness`.
///
/// When `leaf_hash_to_finalize` is given only that leaf is considered,
/// otherwise the signed leaf with the shortest merkle path is used.
pub fn tap_script_finalizer(
    input_index: usize,
    input: &PsbtInput,
    leaf_hash_to_finalize: Option<&TapLeafHash>,
) -> TaprootResult<Vec<u8>> {
    let tap_leaf = find_tap_leaf_to_finalize(input, input_index, leaf_hash_to_finalize)?;

    let mut witness =
        sort_signatures(input, tap_leaf).map_err(|e| TaprootError::finalization(input_index, e))?;
    log::debug!(
        "Finalizing input #{} with {} signature(s) for leaf {}",
        input_index,
        witness.len(),
        tap_leaf.leaf_hash()
    );

    witness.push(tap_leaf.script.to_bytes());
    witness.push(tap_leaf.control_block.clone());
    Ok(witness_stack_to_script_witness(&witness))
}

/// Append the sighash byte to a Schnorr signature unless the sighash type is
/// the default one.
pub fn serialize_taproot_signature(signature: &[u8], sighash_type: Option<TapSighashType>) -> Vec<u8> {
    let mut serialized = signature.to_vec();
    if let Some(sighash_type) = sighash_type {
        if sighash_type != TapSighashType::Default {
            serialized.push(sighash_type as u8);
        }
    }
    serialized
}

/// Find the leaf matching `leaf_hash_to_finalize`, or the signed leaf with the
/// shortest path.
pub fn find_tap_leaf_to_finalize<'a>(
    input: &'a PsbtInput,
    input_index: usize,
    leaf_hash_to_finalize: Option<&TapLeafHash>,
) -> TaprootResult<&'a TapLeafScript> {
    if input.tap_script_sig.is_empty() {
        return Err(TaprootError::NoSignature { input_index });
    }

    let mut candidates: Vec<&TapLeafScript> = input.tap_leaf_script.iter().collect();
    candidates.sort_by_key(|leaf| leaf.control_block.len());

    candidates
        .into_iter()
        .find(|leaf| can_finalize_leaf(leaf, &input.tap_script_sig, leaf_hash_to_finalize))
        .ok_or(TaprootError::LeafNotFound { input_index })
}

fn can_finalize_leaf(
    leaf: &TapLeafScript,
    tap_script_sig: &[TapScriptSig],
    hash: Option<&TapLeafHash>,
) -> bool {
    let leaf_hash = leaf.leaf_hash();
    let whitelisted = hash.map_or(true, |hash| *hash == leaf_hash);
    whitelisted && tap_script_sig.iter().any(|tss| tss.leaf_hash == leaf_hash)
}

/// Signatures for `tap_leaf`, ordered by descending signer position in the
/// leaf script. Signers absent from the script come last.
pub fn sort_signatures(input: &PsbtInput, tap_leaf: &TapLeafScript) -> Result<Vec<Vec<u8>>, ScriptError> {
    let leaf_hash = tap_leaf.leaf_hash();

    let mut positioned = input
        .tap_script_sig
        .iter()
        .filter(|tss| tss.leaf_hash == leaf_hash)
        .map(|tss| {
            pubkey_position_in_script(&tss.pubkey, &tap_leaf.script).map(|position| (position, tss))
        })
        .collect::<Result<Vec<_>, _>>()?;

    positioned.sort_by(|(a, _), (b, _)| b.cmp(a));
    Ok(positioned
        .into_iter()
        .map(|(_, tss)| tss.signature.clone())
        .collect())
}
