//! browser_lens - paginated console and network inspection for headless Chrome
//!
//! The [`pagination`] module is the shared core: free-text filtering,
//! offset/limit paging and summary lines. The browser tools in [`tools`]
//! build on it, and [`api`] exposes the tools over HTTP.

pub mod api;
pub mod config;
pub mod pagination;
pub mod tools;
