pub mod common;

pub mod loader_tests;
pub mod manifest_tests;
pub mod validation_tests;
