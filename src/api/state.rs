use std::sync::Arc;

use crate::analytics::QueryEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
}

impl AppState {
    pub fn new(engine: QueryEngine) -> Self {
        AppState {
            engine: Arc::new(engine),
        }
    }
}
