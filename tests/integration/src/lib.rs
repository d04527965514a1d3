//! Test-only crate: hosts the cross-crate scenario tests under `tests/`
//! (spec §8). No public API of its own.
