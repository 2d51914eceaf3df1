//! # Taproot Field Validation
//!
//! Checks run by the PSBT container before it merges an update into an input
//! or output map. Both the current map (`existing`) and the update
//! (`incoming`) are borrowed; applying the merge is left to the caller.
//!
//! ## Rules
//! - taproot and non-taproot signing fields never share a map
//! - every leaf script must hash up to the declared merkle root
//! - an output's script must commit to its internal key and tap tree

use bitcoin::taproot::TapNodeHash;

use crate::error::{TaprootError, TaprootResult};
use crate::taptree::tap_tree_from_list;
use crate::types::{PsbtInput, PsbtOutput, TapLeafScript};
use crate::utils::{
    script::{is_p2tr, p2tr_output_key},
    taproot::tweak_key,
};
use crate::verifier::is_tap_leaf_in_tree;

/// Whether an input carries any taproot field, or spends a P2TR output
pub fn is_taproot_input(input: &PsbtInput) -> bool {
    input.tap_internal_key.is_some()
        || input.tap_merkle_root.is_some()
        || !input.tap_leaf_script.is_empty()
        || !input.tap_bip32_derivation.is_empty()
        || input
            .witness_utxo
            .as_ref()
            .is_some_and(|utxo| is_p2tr(&utxo.script_pubkey))
}

/// Whether an input carries legacy or segwit v0 signing fields
pub fn has_non_taproot_input_fields(input: &PsbtInput) -> bool {
    input.redeem_script.is_some()
        || input.witness_script.is_some()
        || !input.bip32_derivation.is_empty()
}

/// Whether an output carries any taproot field, or pays to a P2TR script
pub fn is_taproot_output(output: &PsbtOutput) -> bool {
    output.tap_internal_key.is_some()
        || output.tap_tree.is_some()
        || !output.tap_bip32_derivation.is_empty()
        || output.script.as_deref().is_some_and(is_p2tr)
}

/// Whether an output carries legacy or segwit v0 fields
pub fn has_non_taproot_output_fields(output: &PsbtOutput) -> bool {
    output.redeem_script.is_some()
        || output.witness_script.is_some()
        || !output.bip32_derivation.is_empty()
}

/// Validate an input update before `incoming` is merged onto `existing`.
///
/// `action` names the container operation for error messages
/// (`addInput`, `updateInput`).
pub fn check_taproot_input_fields(
    existing: &PsbtInput,
    incoming: &PsbtInput,
    action: &str,
) -> TaprootResult<()> {
    check_mixed_fields(
        (is_taproot_input(existing), has_non_taproot_input_fields(existing)),
        (is_taproot_input(incoming), has_non_taproot_input_fields(incoming)),
        action,
    )?;
    check_tap_leaves_in_tree(existing, incoming, action)
}

/// Validate an output update before `incoming` is merged onto `existing`.
pub fn check_taproot_output_fields(
    existing: &PsbtOutput,
    incoming: &PsbtOutput,
    action: &str,
) -> TaprootResult<()> {
    check_mixed_fields(
        (is_taproot_output(existing), has_non_taproot_output_fields(existing)),
        (is_taproot_output(incoming), has_non_taproot_output_fields(incoming)),
        action,
    )?;
    if let Some(leaves) = &incoming.tap_tree {
        tap_tree_from_list(leaves)?;
    }
    check_taproot_script_pubkey(existing, incoming, action)
}

// Each side is `(has taproot fields, has non-taproot fields)`.
fn check_mixed_fields(existing: (bool, bool), incoming: (bool, bool), action: &str) -> TaprootResult<()> {
    let (existing_taproot, existing_legacy) = existing;
    let (incoming_taproot, incoming_legacy) = incoming;

    let bad_taproot_update = existing_taproot && incoming_legacy;
    let bad_non_taproot_update = existing_legacy && incoming_taproot;
    let has_mixed_fields = incoming_taproot && incoming_legacy;

    if bad_taproot_update || bad_non_taproot_update || has_mixed_fields {
        log::warn!(
            "Rejected Psbt.{}: taproot and non-taproot fields on the same map",
            action
        );
        return Err(TaprootError::mixed_fields(action));
    }
    Ok(())
}

fn check_tap_leaves_in_tree(existing: &PsbtInput, incoming: &PsbtInput, action: &str) -> TaprootResult<()> {
    let in_tree = if let Some(root) = &incoming.tap_merkle_root {
        all_in_tree(&incoming.tap_leaf_script, root) && all_in_tree(&existing.tap_leaf_script, root)
    } else if let Some(root) = &existing.tap_merkle_root {
        all_in_tree(&incoming.tap_leaf_script, root)
    } else {
        true
    };

    if !in_tree {
        log::warn!("Rejected Psbt.{}: tapleaf not part of taptree", action);
        return Err(TaprootError::not_in_tree(action));
    }
    Ok(())
}

fn all_in_tree(leaves: &[TapLeafScript], root: &TapNodeHash) -> bool {
    leaves.iter().all(|leaf| is_tap_leaf_in_tree(leaf, Some(root)))
}

// The merged output script must pay to the internal key tweaked with the
// merged tree's root.
fn check_taproot_script_pubkey(existing: &PsbtOutput, incoming: &PsbtOutput, action: &str) -> TaprootResult<()> {
    let script = incoming.script.as_ref().or(existing.script.as_ref());
    let internal_key = incoming.tap_internal_key.or(existing.tap_internal_key);
    let tap_tree = incoming.tap_tree.as_ref().or(existing.tap_tree.as_ref());

    let (Some(script), Some(internal_key)) = (script, internal_key) else {
        return Ok(());
    };

    let merkle_root = tap_tree
        .map(|leaves| tap_tree_from_list(leaves)?.merkle_root())
        .transpose()?;
    let expected = tweak_key(internal_key, merkle_root).map(|(key, _)| key);

    if expected.is_none() || p2tr_output_key(script) != expected {
        log::warn!(
            "Rejected Psbt.{}: output script {} does not match internal key {}",
            action,
            script.to_hex_string(),
            internal_key
        );
        return Err(TaprootError::ScriptPubkeyMismatch {
            action: action.to_string(),
        });
    }
    Ok(())
}
