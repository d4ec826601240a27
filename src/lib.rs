//! Vision simulation presets: a small object graph of users, presets, text
//! settings, visual simulations and shared color pairs, with transactional
//! persistence, change notifications and a JSON exchange format.

#![forbid(unsafe_code)]

pub mod builder;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod display;
pub mod error;
pub mod library;
pub mod model;
pub mod naming;
pub mod store;
pub mod thumbnail;
pub mod transfer;

pub use error::{LibraryError, SaveFailure, StoreError, TransferError, Violation};
pub use library::{Alert, IconUpdate, PresetLibrary, ProfileUpdate, TextUpdate};
