//! Integration tests for compscore.
//!
//! These tests validate end-to-end workflows that span multiple modules: the
//! library pipeline under different worker counts and the `compscore` binary.

mod helpers;
mod test_compound_command;
mod test_pipeline_concurrency;
