pub mod apply;
pub mod error;
pub mod memory;
pub mod ports;

pub use apply::{ApplyConfig, PlanApplication, PlanApplier, StepOutcome};
pub use error::{PlatformError, PlatformErrorKind};
pub use memory::{InMemoryPlatform, PlatformOperation};
pub use ports::{Notice, NoticeTarget, PlatformPort, observe_member};
