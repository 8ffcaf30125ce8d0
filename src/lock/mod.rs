// ABOUTME: Lock module - lock identities and the distributed lock boundary.
// ABOUTME: Contains key derivation, the backend trait, the scoped client, and a memory backend.

mod backend;
mod client;
mod key;
mod memory;

pub use backend::*;
pub use client::*;
pub use key::*;
pub use memory::*;

#[cfg(test)]
mod key_test;
#[cfg(test)]
mod memory_test;
