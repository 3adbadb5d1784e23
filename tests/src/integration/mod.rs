//! Integration tests over the in-process lattice.

pub mod harness;

mod invocations;
mod lifecycle;
mod wire_contract;
