//! Re-exports of the commonly used builder types.

pub use crate::{
    builder::{CondensedTransaction, CondensingTxBuilder, SpentOutput},
    context::BuildContext,
    errors::{BuildError, BuildResult},
    signing::{finalize_witnesses, sign_inputs, verify_input_signature},
};
