//! Internal key tweaking for taproot inputs.

use bitcoin::secp256k1::XOnlyPublicKey;

use crate::error::{TaprootError, TaprootResult};
use crate::types::PsbtInput;
use crate::utils::taproot::tweak_key;

/// Tweak the input's `tap_internal_key` with its `tap_merkle_root` (or with no
/// script tree when the root is absent) and return the x-only output key.
pub fn tweak_internal_pubkey(input_index: usize, input: &PsbtInput) -> TaprootResult<XOnlyPublicKey> {
    let internal_key = input.tap_internal_key;
    let output_key = internal_key.and_then(|key| tweak_key(key, input.tap_merkle_root));

    match output_key {
        Some((x, _parity)) => Ok(x),
        None => Err(TaprootError::TweakFailed {
            input_index,
            pubkey: internal_key
                .map(|key| hex::encode(key.serialize()))
                .unwrap_or_else(|| "undefined".to_string()),
        }),
    }
}
