//! Browser tools using Chrome `DevTools` Protocol
//!
//! Sessions are implicit: the first `browser_navigate` in a conversation
//! launches Chrome, and the listing tools read what it has captured since.

pub mod capture;
pub mod session;
mod tools;


pub use capture::{ConsoleMessage, NetworkEntry, NetworkRequest, NetworkResponse};
pub use session::{BrowserError, BrowserSessionManager};
pub use tools::{BrowserConsoleMessagesTool, BrowserNavigateTool, BrowserNetworkRequestsTool};
