pub mod content_resolver;
pub mod diagnostics;
pub mod episode_advancer;
pub mod position_store;
pub mod posting_agent;
pub mod staging;

pub use content_resolver::{ContentResolver, ItemNaming, Resolution};
pub use diagnostics::DiagnosticsRecorder;
pub use episode_advancer::{Advance, EpisodeAdvancer};
pub use position_store::PositionStore;
pub use posting_agent::{AgentSession, ComposeTimeouts, PostingAgent, SessionLauncher, SessionPoster};
pub use staging::StagedFile;
