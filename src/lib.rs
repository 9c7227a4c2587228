//! gistpipe - incremental build pipeline for live gist previews
//!
//! Edits flow through an [`edit::EditSession`], which renders snapshots
//! through a [`worker::BuildWorker`] owning a [`session::SessionManager`].
//! The session drives a bundler engine whose units are compiled by the
//! [`transpiler::TranspilerChain`] and cached in a two-tier
//! [`cache::ContentCache`].

pub mod cache;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod edit;
pub mod engine;
pub mod error;
pub mod gist;
pub mod session;
pub mod transpiler;
pub mod ui;
pub mod worker;

pub use error::{GistError, GistResult};
