//! Construction and signing of condensing transactions.
//!
//! A condensing transaction spends a batch of deposits (and the primary wallet's change output)
//! and pays a batch of withdrawals in one go. Its fee is split evenly between the deposits and
//! withdrawals it contains, and every withdrawal additionally pays a share to the committee.
//!
//! Every witness runs the exact same code on the exact same ledger entries, so the result must
//! only depend on its inputs.

pub mod builder;
pub mod context;
pub mod errors;
pub mod fees;
pub mod prelude;
pub mod signing;
