use std::sync::Arc;

use crate::store::Store;

/// Shared application state: the document store behind its trait object.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}
