//! HTTP gateway between chat clients and the assistant provider
//!
//! Every route answers with a `{success, <payload>?, error?}` envelope.

mod handlers;

pub use handlers::create_router;

use crate::assistants::AssistantsService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub assistants: Arc<dyn AssistantsService>,
}

impl AppState {
    pub fn new(assistants: Arc<dyn AssistantsService>) -> Self {
        Self { assistants }
    }
}
