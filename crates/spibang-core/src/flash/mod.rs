//! High-level flash operations
//!
//! This module provides the whole-chip routines the bitbang programmer
//! offers: chunked reads, page programming with busy polling, and
//! verification.

mod operations;

pub use operations::*;
