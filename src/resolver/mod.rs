//! C6 — Resolver (spec §4.6).
//!
//! One module per capability, each implementing the §2 read path
//! (L1 → L1′ → L2 → ordered providers through C4) and its policy table.

pub mod ai;
pub mod bars;
pub mod negative_cache;
pub mod news;
pub mod rate;
pub mod transcript;
