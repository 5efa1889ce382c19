use napi::Result as NapiResult;
use napi_derive::napi;

use zinsplan_core::mezzanine::{self, GlobalConfig, TrancheInput, ZinsplanInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Zinsplan
// ---------------------------------------------------------------------------

/// Full run wrapped in the computation envelope; invalid input rejects.
#[napi]
pub fn calculate_zinsplan(input_json: String) -> NapiResult<String> {
    let input: ZinsplanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = mezzanine::calculate_zinsplan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Run for reactive UIs: calculation failures come back in the `error`
/// field of the result instead of rejecting. Only malformed JSON rejects.
#[napi]
pub fn recalculate(input_json: String) -> NapiResult<String> {
    let input: ZinsplanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let result = mezzanine::recalculate(&input);
    serde_json::to_string(&result).map_err(to_napi_error)
}

#[napi]
pub fn compute_tranche(tranche_json: String, global_json: String, index: u32) -> NapiResult<String> {
    let tranche: TrancheInput = serde_json::from_str(&tranche_json).map_err(to_napi_error)?;
    let global: GlobalConfig = serde_json::from_str(&global_json).map_err(to_napi_error)?;
    let result =
        mezzanine::compute_tranche(index as usize, &tranche, &global).map_err(to_napi_error)?;
    serde_json::to_string(&result).map_err(to_napi_error)
}

/// Default input document, used to seed a new form.
#[napi]
pub fn default_input() -> NapiResult<String> {
    serde_json::to_string(&ZinsplanInput::default()).map_err(to_napi_error)
}
