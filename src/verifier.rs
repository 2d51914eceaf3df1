//! # Merkle-path Verifier
//!
//! Checks that a tapleaf belongs to the tree committed to by a merkle root,
//! using the path carried in its control block.

use bitcoin::{
    hashes::Hash,
    taproot::{LeafVersion, TapLeafHash, TapNodeHash},
    Script,
};

use crate::config::taproot::{CONTROL_BLOCK_BASE_SIZE, CONTROL_BLOCK_NODE_SIZE};
use crate::error::TaprootResult;
use crate::types::{control_block_depth, TapLeafScript};
use crate::utils::taproot::{tap_branch_hash, tap_leaf_hash};

/// Fold the control block's merkle path onto a leaf hash, leaf to root.
pub fn root_hash_from_path(
    control_block: &[u8],
    leaf_hash: TapLeafHash,
) -> TaprootResult<TapNodeHash> {
    control_block_depth(control_block)?;

    let path = &control_block[CONTROL_BLOCK_BASE_SIZE..];
    let root = path
        .chunks_exact(CONTROL_BLOCK_NODE_SIZE)
        .fold(TapNodeHash::from(leaf_hash), |node, sibling| {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(sibling);
            tap_branch_hash(node, TapNodeHash::from_byte_array(bytes))
        });
    Ok(root)
}

/// Whether `script` at `leaf_version`, proven by `control_block`, hashes up to
/// `root`. An absent root places no constraint; a malformed control block
/// never verifies.
pub fn verify_leaf_in_tree(
    script: &Script,
    leaf_version: LeafVersion,
    control_block: &[u8],
    root: Option<&TapNodeHash>,
) -> bool {
    let Some(root) = root else {
        return true;
    };

    let leaf_hash = tap_leaf_hash(script, leaf_version);
    match root_hash_from_path(control_block, leaf_hash) {
        Ok(computed) => computed == *root,
        Err(e) => {
            log::debug!("Control block rejected for leaf {}: {}", leaf_hash, e);
            false
        }
    }
}

/// [`verify_leaf_in_tree`] for a PSBT leaf script entry
pub fn is_tap_leaf_in_tree(tap_leaf: &TapLeafScript, root: Option<&TapNodeHash>) -> bool {
    verify_leaf_in_tree(
        &tap_leaf.script,
        tap_leaf.leaf_version,
        &tap_leaf.control_block,
        root,
    )
}
