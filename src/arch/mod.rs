//! Architecture-specific code
//!
//! Register encodings are plain data and build on any host; only the
//! instructions that touch EL2 state are limited to bare-metal aarch64.

pub mod aarch64;
