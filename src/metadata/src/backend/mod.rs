pub mod memory;

pub use memory::{InMemoryClient, InMemoryConnector, InMemoryMetadataService};
