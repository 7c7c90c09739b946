use std::ops::Deref;

use crate::MetadataClient;

/// Owns a connected client and closes it when dropped.
///
/// Dropping happens on every way out of the owning scope, early returns and
/// unwinding included, so callers never close the client by hand.
pub struct ScopedClient {
    client: Box<dyn MetadataClient>,
}

impl ScopedClient {
    pub fn new(client: Box<dyn MetadataClient>) -> Self {
        Self { client }
    }
}

impl Deref for ScopedClient {
    type Target = dyn MetadataClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl Drop for ScopedClient {
    fn drop(&mut self) {
        log::debug!("Closing metadata client");
        self.client.close();
    }
}
