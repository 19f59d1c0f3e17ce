//! Re-exports of every fixture.

pub use crate::{bitcoin::*, bridge_fixtures::*};
