//! # Tap Tree Conversion
//!
//! Maps a binary [`TapTree`] to its BIP371 leaf list and back.
//!
//! The leaf list is the `(depth, leaf version, script)` of every leaf in a
//! depth-first walk that visits the left child before the right one. Rebuilding
//! inserts the leaves in list order, always trying the left side first, so the
//! reconstructed tree is the left-most shape consistent with the depths.
//!
//! For example, this tree:
//! ```text
//!         - N0 -
//!        /      \
//!       A       N1
//!              /  \
//!             B    C
//! ```
//! maps to `[(1, A), (2, B), (2, C)]`.

use bitcoin::{
    consensus::encode::{deserialize_partial, serialize},
    taproot::TapNodeHash,
    ScriptBuf,
};

use crate::config::taproot::MAX_TAPTREE_DEPTH;
use crate::error::{TaprootError, TaprootResult};
use crate::types::{ScriptLeaf, TapLeaf, TapTree};
use crate::utils::taproot::{leaf_version, tap_branch_hash, tap_leaf_hash};

/// Convert a binary tap tree to its BIP371 leaf list.
pub fn tap_tree_to_list(tree: &TapTree) -> TaprootResult<Vec<TapLeaf>> {
    let mut leaves = Vec::new();
    collect_leaves(tree, 0, &mut leaves)?;
    Ok(leaves)
}

fn collect_leaves(tree: &TapTree, depth: usize, leaves: &mut Vec<TapLeaf>) -> TaprootResult<()> {
    if depth > MAX_TAPTREE_DEPTH {
        return Err(TaprootError::DepthExceeded { depth });
    }

    match tree {
        TapTree::Leaf(leaf) => leaves.push(TapLeaf {
            depth: depth as u8,
            leaf_version: leaf.version,
            script: leaf.script.clone(),
        }),
        TapTree::Branch { left, right } => {
            if let Some(left) = left {
                collect_leaves(left, depth + 1, leaves)?;
            }
            if let Some(right) = right {
                collect_leaves(right, depth + 1, leaves)?;
            }
        }
    }
    Ok(())
}

/// Rebuild a binary tap tree from a BIP371 leaf list.
///
/// A single leaf at depth 0 is returned as a bare [`TapTree::Leaf`]. Fails
/// with [`TaprootError::InsertionFailed`] when a leaf finds no free slot at
/// its depth.
pub fn tap_tree_from_list(leaves: &[TapLeaf]) -> TaprootResult<TapTree> {
    if let [leaf] = leaves {
        if leaf.depth == 0 {
            return Ok(TapTree::Leaf(script_leaf(leaf)));
        }
    }

    let mut root: Option<Box<TapTree>> = None;
    for leaf in leaves {
        if !insert_leaf(leaf, &mut root, 0)? {
            log::debug!(
                "No slot at depth {} for tapleaf {}",
                leaf.depth,
                leaf.script.to_hex_string()
            );
            return Err(TaprootError::InsertionFailed);
        }
    }

    log::debug!("Rebuilt tap tree from {} leaves", leaves.len());
    root.map(|tree| *tree).ok_or(TaprootError::EmptyTapTree)
}

// Returns `Ok(false)` when `slot` has no room for the leaf.
fn insert_leaf(leaf: &TapLeaf, slot: &mut Option<Box<TapTree>>, depth: usize) -> TaprootResult<bool> {
    if depth > MAX_TAPTREE_DEPTH {
        return Err(TaprootError::DepthExceeded { depth });
    }

    if leaf.depth as usize == depth {
        if slot.is_some() {
            return Ok(false);
        }
        *slot = Some(Box::new(TapTree::Leaf(script_leaf(leaf))));
        return Ok(true);
    }

    match slot {
        Some(node) => match node.as_mut() {
            TapTree::Leaf(_) => Ok(false),
            TapTree::Branch { left, right } => {
                if insert_leaf(leaf, left, depth + 1)? {
                    return Ok(true);
                }
                insert_leaf(leaf, right, depth + 1)
            }
        },
        None => {
            let mut left = None;
            let mut right = None;
            let placed = insert_leaf(leaf, &mut left, depth + 1)?
                || insert_leaf(leaf, &mut right, depth + 1)?;
            if placed {
                *slot = Some(Box::new(TapTree::Branch { left, right }));
            }
            Ok(placed)
        }
    }
}

fn script_leaf(leaf: &TapLeaf) -> ScriptLeaf {
    ScriptLeaf {
        script: leaf.script.clone(),
        version: leaf.leaf_version,
    }
}

impl TapTree {
    /// Merkle root committed to by this tree.
    ///
    /// Every branch must have both children.
    pub fn merkle_root(&self) -> TaprootResult<TapNodeHash> {
        match self {
            TapTree::Leaf(leaf) => Ok(TapNodeHash::from(tap_leaf_hash(&leaf.script, leaf.version))),
            TapTree::Branch {
                left: Some(left),
                right: Some(right),
            } => Ok(tap_branch_hash(left.merkle_root()?, right.merkle_root()?)),
            TapTree::Branch { .. } => Err(TaprootError::IncompleteTapTree),
        }
    }
}

/// Serialize a leaf list as the `PSBT_OUT_TAP_TREE` value.
pub fn encode_tap_tree(leaves: &[TapLeaf]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for leaf in leaves {
        bytes.push(leaf.depth);
        bytes.push(leaf.leaf_version.to_consensus());
        bytes.extend(serialize(&leaf.script));
    }
    bytes
}

/// Parse a `PSBT_OUT_TAP_TREE` value into its leaf list.
pub fn decode_tap_tree(bytes: &[u8]) -> TaprootResult<Vec<TapLeaf>> {
    if bytes.is_empty() {
        return Err(TaprootError::decode("empty tap tree"));
    }

    let mut leaves = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let &[depth, version, ..] = rest else {
            return Err(TaprootError::decode("truncated tapleaf record"));
        };
        if depth as usize > MAX_TAPTREE_DEPTH {
            return Err(TaprootError::DepthExceeded {
                depth: depth as usize,
            });
        }
        let leaf_version = leaf_version(version)?;
        let (script, consumed): (ScriptBuf, usize) = deserialize_partial(&rest[2..])
            .map_err(|e| TaprootError::decode(format!("tapleaf script: {}", e)))?;

        leaves.push(TapLeaf {
            depth,
            leaf_version,
            script,
        });
        rest = &rest[2 + consumed..];
    }
    Ok(leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{three_leaf_scripts, three_leaf_spend_info};
    use bitcoin::taproot::LeafVersion;

    fn leaf(byte: u8) -> TapTree {
        TapTree::leaf(ScriptBuf::from_bytes(vec![byte]), LeafVersion::TapScript)
    }

    fn record(depth: u8, byte: u8) -> TapLeaf {
        TapLeaf {
            depth,
            leaf_version: LeafVersion::TapScript,
            script: ScriptBuf::from_bytes(vec![byte]),
        }
    }

    fn depths(leaves: &[TapLeaf]) -> Vec<u8> {
        leaves.iter().map(|l| l.depth).collect()
    }

    fn chain(depth: usize) -> TapTree {
        let mut tree = leaf(0x51);
        for _ in 0..depth {
            tree = TapTree::Branch {
                left: Some(Box::new(tree)),
                right: None,
            };
        }
        tree
    }

    #[test]
    fn test_tree_to_list_order() {
        let tree = TapTree::branch(leaf(0x51), TapTree::branch(leaf(0x52), leaf(0x53)));
        let leaves = tap_tree_to_list(&tree).unwrap();
        assert_eq!(leaves, vec![record(1, 0x51), record(2, 0x52), record(2, 0x53)]);
    }

    #[test]
    fn test_round_trip_shapes() {
        let shapes = vec![
            TapTree::branch(leaf(0x51), leaf(0x52)),
            TapTree::branch(leaf(0x51), TapTree::branch(leaf(0x52), leaf(0x53))),
            TapTree::branch(
                TapTree::branch(leaf(0x51), leaf(0x52)),
                TapTree::branch(leaf(0x53), leaf(0x54)),
            ),
            TapTree::branch(
                TapTree::branch(leaf(0x51), TapTree::branch(leaf(0x52), leaf(0x53))),
                leaf(0x54),
            ),
        ];

        for tree in shapes {
            let leaves = tap_tree_to_list(&tree).unwrap();
            let rebuilt = tap_tree_from_list(&leaves).unwrap();
            assert_eq!(rebuilt, tree);
            assert_eq!(tap_tree_to_list(&rebuilt).unwrap(), leaves);
        }
    }

    #[test]
    fn test_single_leaf_is_not_wrapped() {
        let tree = leaf(0x51);
        let leaves = tap_tree_to_list(&tree).unwrap();
        assert_eq!(leaves, vec![record(0, 0x51)]);

        let rebuilt = tap_tree_from_list(&leaves).unwrap();
        assert!(rebuilt.is_leaf());
        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn test_left_first_reconstruction() {
        let tree = tap_tree_from_list(&[record(2, 0x51), record(2, 0x52), record(1, 0x53)]).unwrap();
        assert_eq!(
            tree,
            TapTree::branch(TapTree::branch(leaf(0x51), leaf(0x52)), leaf(0x53))
        );

        let tree = tap_tree_from_list(&[record(1, 0x51), record(2, 0x52), record(2, 0x53)]).unwrap();
        assert_eq!(
            tree,
            TapTree::branch(leaf(0x51), TapTree::branch(leaf(0x52), leaf(0x53)))
        );
    }

    #[test]
    fn test_partial_tree_is_kept() {
        // the depth-1 leaf lands right of the unfinished left branch
        let tree = tap_tree_from_list(&[record(2, 0x51), record(1, 0x52)]).unwrap();
        assert_eq!(
            tree,
            TapTree::Branch {
                left: Some(Box::new(TapTree::Branch {
                    left: Some(Box::new(leaf(0x51))),
                    right: None,
                })),
                right: Some(Box::new(leaf(0x52))),
            }
        );
        assert_eq!(tree.merkle_root(), Err(TaprootError::IncompleteTapTree));
    }

    #[test]
    fn test_insertion_failures() {
        let too_many = [record(1, 0x51), record(1, 0x52), record(1, 0x53)];
        assert_eq!(tap_tree_from_list(&too_many), Err(TaprootError::InsertionFailed));

        let root_then_more = [record(0, 0x51), record(1, 0x52)];
        assert_eq!(tap_tree_from_list(&root_then_more), Err(TaprootError::InsertionFailed));

        let under_leaf = [record(1, 0x51), record(1, 0x52), record(2, 0x53)];
        assert_eq!(tap_tree_from_list(&under_leaf), Err(TaprootError::InsertionFailed));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(tap_tree_from_list(&[]), Err(TaprootError::EmptyTapTree));
    }

    #[test]
    fn test_depth_bound() {
        let leaves = tap_tree_to_list(&chain(MAX_TAPTREE_DEPTH)).unwrap();
        assert_eq!(depths(&leaves), vec![128]);
        assert!(tap_tree_from_list(&leaves).is_ok());

        assert_eq!(
            tap_tree_to_list(&chain(MAX_TAPTREE_DEPTH + 1)),
            Err(TaprootError::DepthExceeded { depth: 129 })
        );
        assert_eq!(
            tap_tree_from_list(&[record(129, 0x51)]),
            Err(TaprootError::DepthExceeded { depth: 129 })
        );
    }

    #[test]
    fn test_merkle_root_matches_builder() {
        let scripts = three_leaf_scripts();
        let tree = TapTree::branch(
            TapTree::leaf(scripts[0].clone(), LeafVersion::TapScript),
            TapTree::branch(
                TapTree::leaf(scripts[1].clone(), LeafVersion::TapScript),
                TapTree::leaf(scripts[2].clone(), LeafVersion::TapScript),
            ),
        );
        let expected = three_leaf_spend_info().merkle_root().unwrap();
        assert_eq!(tree.merkle_root().unwrap(), expected);

        let rebuilt = tap_tree_from_list(&tap_tree_to_list(&tree).unwrap()).unwrap();
        assert_eq!(rebuilt.merkle_root().unwrap(), expected);
    }

    #[test]
    fn test_encode_tap_tree() {
        let bytes = encode_tap_tree(&[record(1, 0x51), record(1, 0x52)]);
        assert_eq!(bytes, vec![0x01, 0xc0, 0x01, 0x51, 0x01, 0xc0, 0x01, 0x52]);
    }

    #[test]
    fn test_decode_tap_tree() {
        let scripts = three_leaf_scripts();
        let leaves = vec![
            TapLeaf { depth: 1, leaf_version: LeafVersion::TapScript, script: scripts[0].clone() },
            TapLeaf { depth: 2, leaf_version: LeafVersion::TapScript, script: scripts[1].clone() },
            TapLeaf { depth: 2, leaf_version: LeafVersion::TapScript, script: scripts[2].clone() },
        ];
        let decoded = decode_tap_tree(&encode_tap_tree(&leaves)).unwrap();
        assert_eq!(decoded, leaves);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(decode_tap_tree(&[]), Err(TaprootError::Decode { .. })));
        assert!(matches!(decode_tap_tree(&[0x01]), Err(TaprootError::Decode { .. })));
        assert!(matches!(
            decode_tap_tree(&[0x01, 0xc0, 0x05, 0x51]),
            Err(TaprootError::Decode { .. })
        ));
        assert_eq!(
            decode_tap_tree(&[0x81, 0xc0, 0x01, 0x51]),
            Err(TaprootError::DepthExceeded { depth: 129 })
        );
        assert_eq!(
            decode_tap_tree(&[0x01, 0xc1, 0x01, 0x51]),
            Err(TaprootError::InvalidLeafVersion { version: 0xc1 })
        );
    }

    #[test]
    fn test_tree_serde_round_trip() {
        let tree = TapTree::branch(leaf(0x51), TapTree::branch(leaf(0x52), leaf(0x53)));
        let json = serde_json::to_string(&tree).unwrap();
        let parsed: TapTree = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tree);
    }
}
