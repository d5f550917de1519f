//! HTTP API for calling browser tools

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::tools::{BrowserSessionManager, ToolRegistry};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub tools: Arc<ToolRegistry>,
    pub browser_sessions: Arc<BrowserSessionManager>,
}

impl AppState {
    pub fn new(browser_sessions: Arc<BrowserSessionManager>) -> Self {
        Self {
            tools: Arc::new(ToolRegistry::standard()),
            browser_sessions,
        }
    }
}
