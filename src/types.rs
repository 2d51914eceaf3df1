//! # Taproot PSBT Data Model
//!
//! Value types for tap trees, BIP371 leaf records and the taproot-relevant
//! subset of PSBT input and output maps.
//!
//! The PSBT container owns these maps and applies updates; this crate only
//! borrows them to validate an update or derive a witness.

use bitcoin::{
    bip32::KeySource,
    secp256k1::{PublicKey, XOnlyPublicKey},
    taproot::{LeafVersion, TapLeafHash, TapNodeHash},
    ScriptBuf, TxOut,
};
use serde::{Deserialize, Serialize};

use crate::config::taproot::{
    CONTROL_BLOCK_BASE_SIZE, CONTROL_BLOCK_NODE_SIZE, MAX_TAPTREE_DEPTH,
};
use crate::error::{TaprootError, TaprootResult};

/// A script alternative stored at a leaf of a [`TapTree`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ScriptLeaf {
    /// Leaf script
    pub script: ScriptBuf,
    /// Leaf version committed to by the tagged leaf hash
    pub version: LeafVersion,
}

impl ScriptLeaf {
    /// Create a tapscript (`0xc0`) leaf
    pub fn tapscript(script: ScriptBuf) -> Self {
        Self {
            script,
            version: LeafVersion::TapScript,
        }
    }
}

/// Binary Merkle tree of tapscripts.
///
/// Branch children are optional so that partially built trees can be
/// represented while a BIP371 leaf list is being reconstructed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum TapTree {
    /// A single script alternative
    Leaf(ScriptLeaf),
    /// An internal node
    Branch {
        left: Option<Box<TapTree>>,
        right: Option<Box<TapTree>>,
    },
}

impl TapTree {
    /// Create a leaf node
    pub fn leaf(script: ScriptBuf, version: LeafVersion) -> Self {
        TapTree::Leaf(ScriptLeaf { script, version })
    }

    /// Create a branch with both children present
    pub fn branch(left: TapTree, right: TapTree) -> Self {
        TapTree::Branch {
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    /// Whether this node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self, TapTree::Leaf(_))
    }
}

/// BIP371 flat representation of one tree leaf.
///
/// A list of these in depth-first, left-then-right order encodes a whole tree.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TapLeaf {
    /// Number of branches between the root and this leaf
    pub depth: u8,
    /// Leaf version
    pub leaf_version: LeafVersion,
    /// Leaf script
    pub script: ScriptBuf,
}

/// A leaf script together with the control block proving its membership in
/// the committed tree (`PSBT_IN_TAP_LEAF_SCRIPT`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TapLeafScript {
    pub script: ScriptBuf,
    pub leaf_version: LeafVersion,
    /// Serialized control block: `33 + 32 * m` bytes
    pub control_block: Vec<u8>,
}

impl TapLeafScript {
    /// Create a leaf script entry, rejecting control blocks whose length does
    /// not describe a merkle path of at most 128 hashes.
    pub fn new(
        script: ScriptBuf,
        leaf_version: LeafVersion,
        control_block: Vec<u8>,
    ) -> TaprootResult<Self> {
        control_block_depth(&control_block)?;
        Ok(Self {
            script,
            leaf_version,
            control_block,
        })
    }

    /// Merkle path length encoded by the control block
    pub fn depth(&self) -> TaprootResult<usize> {
        control_block_depth(&self.control_block)
    }

    /// Tagged leaf hash of this entry's script and version
    pub fn leaf_hash(&self) -> TapLeafHash {
        crate::utils::taproot::tap_leaf_hash(&self.script, self.leaf_version)
    }
}

/// Number of merkle path hashes in a serialized control block.
pub fn control_block_depth(control_block: &[u8]) -> TaprootResult<usize> {
    let length = control_block.len();
    if length < CONTROL_BLOCK_BASE_SIZE
        || (length - CONTROL_BLOCK_BASE_SIZE) % CONTROL_BLOCK_NODE_SIZE != 0
    {
        return Err(TaprootError::InvalidControlBlock { length });
    }

    let depth = (length - CONTROL_BLOCK_BASE_SIZE) / CONTROL_BLOCK_NODE_SIZE;
    if depth > MAX_TAPTREE_DEPTH {
        return Err(TaprootError::DepthExceeded { depth });
    }
    Ok(depth)
}

/// Script-path signature (`PSBT_IN_TAP_SCRIPT_SIG`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TapScriptSig {
    /// Signer's x-only public key
    pub pubkey: XOnlyPublicKey,
    /// Hash of the leaf this signature commits to
    pub leaf_hash: TapLeafHash,
    /// 64-byte Schnorr signature, optionally followed by a sighash byte
    pub signature: Vec<u8>,
}

/// Legacy/segwit v0 key origin (`PSBT_IN_BIP32_DERIVATION`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Bip32Derivation {
    pub pubkey: PublicKey,
    pub key_source: KeySource,
}

/// Taproot key origin (`PSBT_IN_TAP_BIP32_DERIVATION`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TapBip32Derivation {
    pub pubkey: XOnlyPublicKey,
    /// Leaves the key appears in; empty for the internal key
    pub leaf_hashes: Vec<TapLeafHash>,
    pub key_source: KeySource,
}

/// Taproot-relevant subset of a PSBT input map, plus the legacy fields that
/// must never be combined with it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PsbtInput {
    pub witness_utxo: Option<TxOut>,
    pub redeem_script: Option<ScriptBuf>,
    pub witness_script: Option<ScriptBuf>,
    pub bip32_derivation: Vec<Bip32Derivation>,
    pub tap_internal_key: Option<XOnlyPublicKey>,
    pub tap_merkle_root: Option<TapNodeHash>,
    pub tap_leaf_script: Vec<TapLeafScript>,
    pub tap_bip32_derivation: Vec<TapBip32Derivation>,
    pub tap_script_sig: Vec<TapScriptSig>,
}

/// Taproot-relevant subset of a PSBT output map.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PsbtOutput {
    /// Output script from the unsigned transaction, when known
    pub script: Option<ScriptBuf>,
    pub redeem_script: Option<ScriptBuf>,
    pub witness_script: Option<ScriptBuf>,
    pub bip32_derivation: Vec<Bip32Derivation>,
    pub tap_internal_key: Option<XOnlyPublicKey>,
    /// BIP371 leaf list (`PSBT_OUT_TAP_TREE`)
    pub tap_tree: Option<Vec<TapLeaf>>,
    pub tap_bip32_derivation: Vec<TapBip32Derivation>,
}
