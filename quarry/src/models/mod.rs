pub mod mod_entry;
pub mod mod_version;

pub use mod_entry::{Mod, ModRecord};
pub use mod_version::{DependencyRecord, EntryHashRecord, ModVersion, ModVersionRecord};
