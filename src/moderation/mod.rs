pub mod events;
pub mod matcher;
pub mod service;

pub use events::{CommunityEvent, Inbound};
pub use matcher::{ContentMatcher, PatternMatcher};
pub use service::{EventOutcome, MemberUpdate, ModerationService};
