//! # Utility Functions
//!
//! Thin wrappers over the hashing, tweaking, script and witness primitives of
//! the `bitcoin` crate. The rest of the crate only reaches those primitives
//! through here.

/// Tagged hashes and key tweaking (BIP341)
pub mod taproot {
    use bitcoin::{
        secp256k1::{Parity, Secp256k1, XOnlyPublicKey},
        taproot::{LeafVersion, TapLeafHash, TapNodeHash, TapTweakHash},
        Script,
    };

    use crate::error::{TaprootError, TaprootResult};

    /// `TapLeaf` tagged hash of a script and its leaf version
    pub fn tap_leaf_hash(script: &Script, version: LeafVersion) -> TapLeafHash {
        TapLeafHash::from_script(script, version)
    }

    /// `TapBranch` tagged hash of two children, in lexicographic order
    pub fn tap_branch_hash(a: TapNodeHash, b: TapNodeHash) -> TapNodeHash {
        TapNodeHash::from_node_hashes(a, b)
    }

    /// Tweak an internal key with an optional merkle root.
    ///
    /// Returns `None` when the tweak lands on the point at infinity.
    pub fn tweak_key(
        internal_key: XOnlyPublicKey,
        merkle_root: Option<TapNodeHash>,
    ) -> Option<(XOnlyPublicKey, Parity)> {
        let secp = Secp256k1::verification_only();
        let tweak = TapTweakHash::from_key_and_tweak(internal_key, merkle_root).to_scalar();
        internal_key.add_tweak(&secp, &tweak).ok()
    }

    /// Parse a leaf version byte
    pub fn leaf_version(version: u8) -> TaprootResult<LeafVersion> {
        LeafVersion::from_consensus(version)
            .map_err(|_| TaprootError::InvalidLeafVersion { version })
    }
}

/// Script inspection helpers
pub mod script {
    use bitcoin::{
        script::{Error, Instruction},
        secp256k1::XOnlyPublicKey,
        Script,
    };

    /// Whether a script is a segwit v1 (P2TR) output script
    pub fn is_p2tr(script: &Script) -> bool {
        script.is_p2tr()
    }

    /// Output key committed to by a P2TR script
    pub fn p2tr_output_key(script: &Script) -> Option<XOnlyPublicKey> {
        if !script.is_p2tr() {
            return None;
        }
        XOnlyPublicKey::from_slice(&script.as_bytes()[2..34]).ok()
    }

    /// Byte offset of the push of `pubkey` within `script`.
    ///
    /// Returns `Ok(None)` if the key is never pushed, and an error if the
    /// script cannot be parsed up to that point.
    pub fn pubkey_position_in_script(
        pubkey: &XOnlyPublicKey,
        script: &Script,
    ) -> Result<Option<usize>, Error> {
        let target = pubkey.serialize();
        for item in script.instruction_indices() {
            let (offset, instruction) = item?;
            if let Instruction::PushBytes(bytes) = instruction {
                if bytes.as_bytes() == target.as_slice() {
                    return Ok(Some(offset));
                }
            }
        }
        Ok(None)
    }
}

/// Witness serialization
pub mod witness {
    use bitcoin::{consensus::encode::serialize, Witness};

    /// Serialize a witness stack: CompactSize item count followed by each
    /// length-prefixed item.
    pub fn witness_stack_to_script_witness(items: &[Vec<u8>]) -> Vec<u8> {
        serialize(&Witness::from_slice(items))
    }
}
