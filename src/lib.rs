//! keymeter labels process metrics with the id of the keyspace the process
//! serves, resolving that id from the cluster metadata service at startup.

pub use common;
pub use metadata;
pub use registration;

pub mod standalone;
