//! Purpose: Library crate behind the `kaggle-rotate` CLI and its tests.
//! Exports: `api` (stable surface), `core` (accounts, layout, publishing, errors), `notice`.
//! Role: Holds all account-rotation and kernel-staging logic; the binary only parses and prints.
//! Invariants: Core modules take paths and runners as explicit inputs; no hidden state.
pub mod api;
pub mod core;
pub mod notice;
