//! # Error Types for Taproot PSBT Operations
//!
//! Every failure raised while converting tap trees, validating input and
//! output fields, tweaking keys or finalizing a script-path spend.

use thiserror::Error;

use crate::config::taproot::MAX_TAPTREE_DEPTH;

/// Main error type for all taproot operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaprootError {
    /// Tree, leaf record or control block deeper than the protocol allows
    #[error("Max taptree depth exceeded: {depth} > {max}", max = MAX_TAPTREE_DEPTH)]
    DepthExceeded { depth: usize },

    /// A BIP371 leaf list that cannot be rebuilt into a tree
    #[error("No room left to insert tapleaf in tree")]
    InsertionFailed,

    /// A BIP371 leaf list with no leaves
    #[error("Tap tree has no leaves")]
    EmptyTapTree,

    /// A tree with a missing branch child has no merkle root
    #[error("Tap tree has an empty branch, cannot compute merkle root")]
    IncompleteTapTree,

    /// Control block whose length is not `33 + 32 * m`
    #[error("Invalid control block length: {length}")]
    InvalidControlBlock { length: usize },

    /// Leaf version byte that is not a valid tapleaf version
    #[error("Invalid tapleaf version: {version:#04x}")]
    InvalidLeafVersion { version: u8 },

    /// Malformed BIP371 wire data
    #[error("Tap tree decoding failed: {message}")]
    Decode { message: String },

    /// An update mixing taproot and non-taproot fields
    #[error("Invalid arguments for Psbt.{action}. Cannot use both taproot and non-taproot fields.")]
    MixedFields { action: String },

    /// A tapleaf whose merkle path does not lead to the declared root
    #[error("Invalid arguments for Psbt.{action}. Tapleaf not part of taptree.")]
    TapleafNotInTree { action: String },

    /// An output script that does not commit to the internal key and tap tree
    #[error("Invalid arguments for Psbt.{action}. Output script does not match the tweaked internal key.")]
    ScriptPubkeyMismatch { action: String },

    /// Missing internal key or failed tweak arithmetic
    #[error("Cannot tweak tap internal key for input #{input_index}. Public key: {pubkey}")]
    TweakFailed { input_index: usize, pubkey: String },

    /// Finalization attempted without any script-path signature
    #[error("Can not finalize taproot input #{input_index}. No tapleaf script signature provided.")]
    NoSignature { input_index: usize },

    /// No tapleaf qualifies for finalization
    #[error("Can not finalize taproot input #{input_index}. Signature for tapleaf script not found.")]
    LeafNotFound { input_index: usize },

    /// Witness assembly failed for the selected tapleaf
    #[error("Can not finalize taproot input #{input_index}: {message}")]
    FinalizationFailed { input_index: usize, message: String },
}

/// Result type alias for taproot operations
pub type TaprootResult<T> = Result<T, TaprootError>;

impl TaprootError {
    /// Create a decoding error with a message
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a mixed fields error for a PSBT action
    pub fn mixed_fields(action: impl Into<String>) -> Self {
        Self::MixedFields {
            action: action.into(),
        }
    }

    /// Create a tapleaf-not-in-tree error for a PSBT action
    pub fn not_in_tree(action: impl Into<String>) -> Self {
        Self::TapleafNotInTree {
            action: action.into(),
        }
    }

    /// Wrap a witness assembly failure for an input
    pub fn finalization(input_index: usize, message: impl ToString) -> Self {
        Self::FinalizationFailed {
            input_index,
            message: message.to_string(),
        }
    }

    /// Check if this error comes from malformed tree or wire data rather than
    /// logically inconsistent PSBT state
    pub fn is_malformed_data(&self) -> bool {
        matches!(
            self,
            TaprootError::DepthExceeded { .. }
                | TaprootError::InsertionFailed
                | TaprootError::EmptyTapTree
                | TaprootError::IncompleteTapTree
                | TaprootError::InvalidControlBlock { .. }
                | TaprootError::InvalidLeafVersion { .. }
                | TaprootError::Decode { .. }
        )
    }

    /// Check if this error was raised while finalizing an input
    pub fn is_finalization(&self) -> bool {
        matches!(
            self,
            TaprootError::NoSignature { .. }
                | TaprootError::LeafNotFound { .. }
                | TaprootError::FinalizationFailed { .. }
        )
    }
}
