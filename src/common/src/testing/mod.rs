//! Test utilities for keymeter.
//!
//! This module is only available when the `testing` feature is enabled or during tests:
//!
//! ```toml
//! [dependencies]
//! common = { path = "../common", features = ["testing"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use common::testing::TestConfigBuilder;
//!
//! let config = TestConfigBuilder::new()
//!     .cluster("127.0.0.1:2379")
//!     .with_keyspace("tenant_7")
//!     .build();
//! ```

mod config_builder;

pub use config_builder::TestConfigBuilder;
