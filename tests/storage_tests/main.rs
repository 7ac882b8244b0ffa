//! Storage test binary

mod manager_tests;
mod manifest_tests;
mod snapshot_tests;
