//! Build session: one engine instance plus its publish target

pub mod manager;
pub mod publish;
pub mod state;

pub use manager::SessionManager;
pub use publish::{DirPublishTarget, MemoryPublishTarget, PublishTarget};
pub use state::{InitOutcome, SessionConfig, DEFAULT_BUNDLE_JS, DEFAULT_INDEX_HTML};
