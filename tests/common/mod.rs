//! Common test utilities for answer-dl end-to-end tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod site;
#[allow(dead_code)]
pub mod tree;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use site::*;
#[allow(unused_imports)]
pub use tree::*;
