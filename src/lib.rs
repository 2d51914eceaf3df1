//! # bip371-taproot: Taproot PSBT Logic
//!
//! Taproot-specific layer of a PSBT toolkit: BIP371 tap tree conversion,
//! validation of taproot input and output fields, internal key tweaking and
//! script-path finalization.
//!
//! Every operation is a synchronous, pure function over borrowed PSBT maps;
//! the container applies updates and reports per-input failures.

pub mod config;
pub mod error;
pub mod finalizer;
pub mod taptree;
pub mod tweak;
pub mod types;
pub mod utils;
pub mod validator;
pub mod verifier;

#[cfg(test)]
mod test_fixtures;

// Re-export commonly used types
pub use error::{TaprootError, TaprootResult};
pub use finalizer::{serialize_taproot_signature, tap_script_finalizer};
pub use taptree::{decode_tap_tree, encode_tap_tree, tap_tree_from_list, tap_tree_to_list};
pub use tweak::tweak_internal_pubkey;
pub use types::{PsbtInput, PsbtOutput, ScriptLeaf, TapLeaf, TapLeafScript, TapScriptSig, TapTree};
pub use validator::{check_taproot_input_fields, check_taproot_output_fields, is_taproot_input};
pub use verifier::verify_leaf_in_tree;
