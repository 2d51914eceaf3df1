//! # Configuration Constants
//!
//! Protocol constants shared by the tree converter, the merkle-path verifier
//! and the finalizer.

/// BIP341 tap tree and control block parameters
pub mod taproot {
    /// Maximum depth of a tap tree, and so the maximum number of hashes in a
    /// control block's merkle path.
    pub const MAX_TAPTREE_DEPTH: usize = 128;

    /// Leaf version for BIP342 tapscript (`0xc0`).
    pub const LEAF_VERSION_TAPSCRIPT: u8 = 0xc0;

    /// Size of the control block prefix: one leaf version/parity byte followed
    /// by the 32-byte x-only internal key.
    pub const CONTROL_BLOCK_BASE_SIZE: usize = 33;

    /// Size of every merkle path element in a control block.
    pub const CONTROL_BLOCK_NODE_SIZE: usize = 32;

    /// Largest control block the protocol admits.
    pub const CONTROL_BLOCK_MAX_SIZE: usize =
        CONTROL_BLOCK_BASE_SIZE + CONTROL_BLOCK_NODE_SIZE * MAX_TAPTREE_DEPTH;
}

/// PSBT update action names used in validation error messages
pub mod psbt {
    /// `Psbt.addInput`
    pub const ACTION_ADD_INPUT: &str = "addInput";

    /// `Psbt.updateInput`
    pub const ACTION_UPDATE_INPUT: &str = "updateInput";

    /// `Psbt.addOutput`
    pub const ACTION_ADD_OUTPUT: &str = "addOutput";

    /// `Psbt.updateOutput`
    pub const ACTION_UPDATE_OUTPUT: &str = "updateOutput";
}
