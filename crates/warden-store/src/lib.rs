//! Policy and resource storage backends for the warden decision engine.

pub mod loader;
pub mod memory;
pub mod traits;

pub use loader::{LoadError, PolicyFile, load_policy_file};
pub use memory::{InMemoryPolicyStore, InMemoryResourceStore, PolicySnapshot};
pub use traits::{PolicyStore, ResourceStore, StorageError};
