//! Shared test utilities for clipcast integration tests.
//!
//! This module provides:
//! - `TestHarness`, a fully wired in-memory tenant with scripted collaborators
//! - Fakes for every external collaborator trait
//! - Builders for artifacts and targets

pub mod builders;
pub mod fakes;
pub mod harness;

#[allow(unused_imports)]
pub use builders::*;
#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use harness::TestHarness;
