pub mod policy;

pub use policy::{PLATFORM_MAX_RESTRICTION, RestrictionDirective, RestrictionPolicy, is_active};
