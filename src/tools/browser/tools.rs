//! Browser tool implementations
//!
//! The listing tools share one pipeline: structured filters, then the
//! free-text filter, then pagination, then one line per record followed by
//! a summary block.

use super::capture::{ConsoleMessage, NetworkEntry};
use super::session::BrowserSession;
use crate::pagination::{
    filter_searchable, format_summary, paginate, PageMetadata, PageRequest, MAX_LIMIT,
};
use crate::tools::{Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Parse duration from string like "15s", "1m", "500ms"
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse().ok().map(Duration::from_millis)
    } else if let Some(s_val) = s.strip_suffix('s') {
        s_val.trim().parse().ok().map(Duration::from_secs)
    } else if let Some(m) = s.strip_suffix('m') {
        m.trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse().ok().map(Duration::from_secs)
    }
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const NO_SESSION: &str =
    "No browser session for this conversation. Use browser_navigate to open a page first.";

// ============================================================================
// Shared listing plumbing
// ============================================================================

fn listing_schema(extra: Value) -> Value {
    let mut properties = json!({
        "limit": {
            "type": "integer",
            "minimum": 1,
            "maximum": MAX_LIMIT,
            "description": "Maximum number of items to return (default: 50, max: 1000)"
        },
        "offset": {
            "type": "integer",
            "minimum": 0,
            "description": "Number of items to skip (default: 0)"
        },
        "filter": {
            "type": "string",
            "description": "Text to search for in the content"
        }
    });
    if let (Some(properties), Value::Object(extra)) = (properties.as_object_mut(), extra) {
        properties.extend(extra);
    }
    json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false
    })
}

fn validate_limit(limit: Option<usize>) -> Result<(), String> {
    match limit {
        Some(l) if !(1..=MAX_LIMIT).contains(&l) => {
            Err(format!("limit must be between 1 and {MAX_LIMIT}"))
        }
        _ => Ok(()),
    }
}

/// Records block (omitted when empty), then the separator and summary
fn render_listing(lines: &[String], metadata: &PageMetadata) -> ToolOutput {
    let mut blocks = Vec::with_capacity(2);
    if !lines.is_empty() {
        blocks.push(lines.join("\n"));
    }
    blocks.push(format!("\n---\n{}", format_summary(metadata)));

    ToolOutput::success(blocks.join("\n")).with_display(json!({ "pagination": metadata }))
}

async fn existing_session(ctx: &ToolContext) -> Result<Arc<RwLock<BrowserSession>>, ToolOutput> {
    ctx.existing_browser().await.map_err(|e| {
        tracing::debug!(error = %e, "Listing requested without a session");
        ToolOutput::error(NO_SESSION)
    })
}

// ============================================================================
// browser_navigate
// ============================================================================

#[derive(Debug, Deserialize)]
struct NavigateInput {
    url: String,
    #[serde(default)]
    timeout: Option<String>,
}

pub struct BrowserNavigateTool;

#[async_trait]
impl Tool for BrowserNavigateTool {
    fn name(&self) -> &'static str {
        "browser_navigate"
    }

    fn description(&self) -> String {
        "Navigate the browser to a specific URL and wait for page to load".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to navigate to"
                },
                "timeout": {
                    "type": "string",
                    "description": "Timeout as a duration string such as 500ms, 15s or 1m (default: 15s)"
                }
            },
            "required": ["url"]
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input: NavigateInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        let timeout = input
            .timeout
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(DEFAULT_TIMEOUT);

        let session: Arc<RwLock<BrowserSession>> = match ctx.browser().await {
            Ok(s) => s,
            Err(e) => return ToolOutput::error(format!("Failed to get browser: {e}")),
        };

        let mut guard = session.write().await;
        guard.last_activity = Instant::now();

        let result = tokio::select! {
            () = ctx.cancel.cancelled() => return ToolOutput::error("Navigation cancelled"),
            r = tokio::time::timeout(timeout, guard.page.goto(&input.url)) => r,
        };

        match result {
            Ok(Ok(_)) => {
                tracing::info!(conversation_id = %ctx.conversation_id, url = %input.url, "Navigated");
                ToolOutput::success("done")
            }
            Ok(Err(e)) => ToolOutput::error(format!("Navigation failed: {e}")),
            Err(_) => ToolOutput::error(format!("Timeout after {timeout:?} waiting for page load")),
        }
    }
}

// ============================================================================
// browser_console_messages
// ============================================================================

/// Console message types accepted by the `type` filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ConsoleTypeFilter {
    Log,
    Error,
    #[serde(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

impl ConsoleTypeFilter {
    fn matches(self, kind: &str) -> bool {
        match self {
            Self::Log => kind == "log",
            Self::Error => kind == "error",
            Self::Warn => kind == "warning" || kind == "warn",
            Self::Info => kind == "info",
            Self::Debug => kind == "debug",
            Self::Trace => kind == "trace",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConsoleMessagesInput {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    filter: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<ConsoleTypeFilter>,
}

impl ConsoleMessagesInput {
    fn parse(input: Value) -> Result<Self, String> {
        let input: Self = serde_json::from_value(input).map_err(|e| e.to_string())?;
        validate_limit(input.limit)?;
        Ok(input)
    }
}

fn list_console_messages(messages: Vec<ConsoleMessage>, input: &ConsoleMessagesInput) -> ToolOutput {
    let mut messages = messages;
    if let Some(kind) = input.kind {
        messages.retain(|m| kind.matches(&m.kind));
    }

    let messages = filter_searchable(messages, input.filter.as_deref());
    let page = paginate(messages, &PageRequest::new(input.limit, input.offset));

    let lines: Vec<String> = page.items.iter().map(ConsoleMessage::render).collect();
    render_listing(&lines, &page.metadata)
}

pub struct BrowserConsoleMessagesTool;

#[async_trait]
impl Tool for BrowserConsoleMessagesTool {
    fn name(&self) -> &'static str {
        "browser_console_messages"
    }

    fn description(&self) -> String {
        "Returns console messages captured from the current page, with optional type and text filters and pagination".to_string()
    }

    fn input_schema(&self) -> Value {
        listing_schema(json!({
            "type": {
                "type": "string",
                "enum": ["log", "error", "warn", "info", "debug", "trace"],
                "description": "Filter by message type"
            }
        }))
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input = match ConsoleMessagesInput::parse(input) {
            Ok(i) => i,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        let session = match existing_session(&ctx).await {
            Ok(s) => s,
            Err(output) => return output,
        };

        let snapshot = {
            let mut guard = session.write().await;
            guard.last_activity = Instant::now();
            let Ok(log) = guard.console.lock() else {
                return ToolOutput::error("Console buffer is unavailable");
            };
            log.snapshot()
        };

        list_console_messages(snapshot, &input)
    }
}

// ============================================================================
// browser_network_requests
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NetworkRequestsInput {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    url: Option<String>,
}

impl NetworkRequestsInput {
    fn parse(input: Value) -> Result<Self, String> {
        let input: Self = serde_json::from_value(input).map_err(|e| e.to_string())?;
        validate_limit(input.limit)?;
        if let Some(status) = input.status {
            if !(100..=599).contains(&status) {
                return Err("status must be between 100 and 599".to_string());
            }
        }
        Ok(input)
    }
}

fn list_network_requests(entries: Vec<NetworkEntry>, input: &NetworkRequestsInput) -> ToolOutput {
    let mut entries = entries;

    if let Some(method) = input.method.as_deref().filter(|m| !m.is_empty()) {
        let method = method.to_uppercase();
        entries.retain(|e| e.request.method.to_uppercase() == method);
    }

    if let Some(status) = input.status {
        entries.retain(|e| e.response.as_ref().is_some_and(|r| r.status == status));
    }

    if let Some(pattern) = input.url.as_deref().filter(|u| !u.is_empty()) {
        let pattern = pattern.to_lowercase();
        entries.retain(|e| e.request.url.to_lowercase().contains(&pattern));
    }

    let entries = filter_searchable(entries, input.filter.as_deref());
    let page = paginate(entries, &PageRequest::new(input.limit, input.offset));

    let lines: Vec<String> = page.items.iter().map(NetworkEntry::render).collect();
    render_listing(&lines, &page.metadata)
}

pub struct BrowserNetworkRequestsTool;

#[async_trait]
impl Tool for BrowserNetworkRequestsTool {
    fn name(&self) -> &'static str {
        "browser_network_requests"
    }

    fn description(&self) -> String {
        "Returns network requests made since the page was opened, with optional method, status, URL and text filters and pagination".to_string()
    }

    fn input_schema(&self) -> Value {
        listing_schema(json!({
            "method": {
                "type": "string",
                "description": "Filter by HTTP method (GET, POST, etc.)"
            },
            "status": {
                "type": "integer",
                "minimum": 100,
                "maximum": 599,
                "description": "Filter by HTTP status code"
            },
            "url": {
                "type": "string",
                "description": "Filter by URL pattern"
            }
        }))
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input = match NetworkRequestsInput::parse(input) {
            Ok(i) => i,
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        let session = match existing_session(&ctx).await {
            Ok(s) => s,
            Err(output) => return output,
        };

        let snapshot = {
            let mut guard = session.write().await;
            guard.last_activity = Instant::now();
            let Ok(log) = guard.network.lock() else {
                return ToolOutput::error("Network buffer is unavailable");
            };
            log.snapshot()
        };

        list_network_requests(snapshot, &input)
    }
}

#[cfg(test)]
mod listing_tests {
    use super::*;
    use crate::tools::browser::capture::{NetworkRequest, NetworkResponse};

    fn console(kind: &str, text: &str) -> ConsoleMessage {
        ConsoleMessage::new(kind, text)
    }

    fn entry(method: &str, url: &str, response: Option<(u16, &str)>) -> NetworkEntry {
        NetworkEntry {
            request: NetworkRequest {
                method: method.to_string(),
                url: url.to_string(),
            },
            response: response.map(|(status, text)| NetworkResponse {
                status,
                status_text: text.to_string(),
            }),
        }
    }

    fn sample_console() -> Vec<ConsoleMessage> {
        vec![
            console("log", "app booted"),
            console("error", "Failed to load resource"),
            console("warning", "deprecated API"),
            console("info", "user signed in"),
            console("error", "Uncaught TypeError: x is undefined"),
        ]
    }

    fn sample_network() -> Vec<NetworkEntry> {
        vec![
            entry("GET", "http://localhost/", Some((200, "OK"))),
            entry("GET", "http://localhost/app.js", Some((200, "OK"))),
            entry("POST", "http://localhost/api/login", Some((401, "Unauthorized"))),
            entry("get", "http://cdn.example.com/Logo.png", Some((404, "Not Found"))),
            entry("PUT", "http://localhost/api/profile", None),
        ]
    }

    fn console_input(value: Value) -> ConsoleMessagesInput {
        ConsoleMessagesInput::parse(value).unwrap()
    }

    fn network_input(value: Value) -> NetworkRequestsInput {
        NetworkRequestsInput::parse(value).unwrap()
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("15s"), Some(Duration::from_secs(15)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn test_console_all_messages() {
        let out = list_console_messages(sample_console(), &ConsoleMessagesInput::default());
        assert!(out.success);
        assert_eq!(
            out.output,
            "[LOG] app booted\n\
             [ERROR] Failed to load resource\n\
             [WARNING] deprecated API\n\
             [INFO] user signed in\n\
             [ERROR] Uncaught TypeError: x is undefined\n\
             \n---\nShowing 1-5 of 5 items"
        );
    }

    #[test]
    fn test_console_type_filter() {
        let out = list_console_messages(sample_console(), &console_input(json!({"type": "error"})));
        assert!(out.output.starts_with("[ERROR] Failed to load resource\n[ERROR] Uncaught"));
        assert!(out.output.ends_with("Showing 1-2 of 2 items"));
    }

    #[test]
    fn test_console_warn_matches_warning() {
        for kind in ["warn", "warning"] {
            let out = list_console_messages(sample_console(), &console_input(json!({"type": kind})));
            assert!(out.output.starts_with("[WARNING] deprecated API"), "{kind}: {}", out.output);
            assert!(out.output.ends_with("Showing 1-1 of 1 items"));
        }
    }

    #[test]
    fn test_console_text_filter_searches_type_too() {
        // "error" matches the type prefix of both errors, not the text
        let out = list_console_messages(sample_console(), &console_input(json!({"filter": "ERROR"})));
        assert!(out.output.ends_with("Showing 1-2 of 2 items"), "{}", out.output);

        let out = list_console_messages(sample_console(), &console_input(json!({"filter": "typeerror"})));
        assert!(out.output.contains("Uncaught TypeError"));
        assert!(out.output.ends_with("Showing 1-1 of 1 items"));
    }

    #[test]
    fn test_console_filters_before_pagination() {
        let out = list_console_messages(
            sample_console(),
            &console_input(json!({"type": "error", "limit": 1})),
        );
        assert!(out.output.starts_with("[ERROR] Failed to load resource\n"));
        assert!(
            out.output.ends_with("Showing 1-1 of 2 items (use offset: 1 for more)"),
            "{}",
            out.output
        );

        let next = list_console_messages(
            sample_console(),
            &console_input(json!({"type": "error", "limit": 1, "offset": 1})),
        );
        assert!(next.output.starts_with("[ERROR] Uncaught TypeError"));
        assert!(next.output.ends_with("Showing 2-2 of 2 items"));
    }

    #[test]
    fn test_console_empty_result() {
        let out = list_console_messages(Vec::new(), &ConsoleMessagesInput::default());
        assert!(out.success);
        assert_eq!(out.output, "\n---\nNo items found");
        assert_eq!(
            out.display_data,
            Some(json!({"pagination": {"total": 0, "limit": 50, "offset": 0, "hasMore": false}}))
        );
    }

    #[test]
    fn test_console_pages_through_many() {
        let messages: Vec<_> = (0..120).map(|i| console("log", &format!("tick {i}"))).collect();

        let first = list_console_messages(messages.clone(), &ConsoleMessagesInput::default());
        assert_eq!(first.output.lines().filter(|l| l.starts_with("[LOG]")).count(), 50);
        assert!(first
            .output
            .ends_with("Showing 1-50 of 120 items (use offset: 50 for more)"));

        let last = list_console_messages(messages, &console_input(json!({"offset": 100})));
        assert_eq!(last.output.lines().filter(|l| l.starts_with("[LOG]")).count(), 20);
        assert!(last.output.starts_with("[LOG] tick 100\n"));
        assert!(last.output.ends_with("Showing 101-120 of 120 items"));
    }

    #[test]
    fn test_console_input_validation() {
        assert!(ConsoleMessagesInput::parse(json!({"limit": 0})).is_err());
        assert!(ConsoleMessagesInput::parse(json!({"limit": 1001})).is_err());
        assert!(ConsoleMessagesInput::parse(json!({"limit": 1000})).is_ok());
        assert!(ConsoleMessagesInput::parse(json!({"offset": -1})).is_err());
        assert!(ConsoleMessagesInput::parse(json!({"type": "verbose"})).is_err());
        assert!(ConsoleMessagesInput::parse(json!({"colour": "red"})).is_err());
    }

    #[test]
    fn test_network_all_requests() {
        let out = list_network_requests(sample_network(), &NetworkRequestsInput::default());
        assert_eq!(
            out.output,
            "[GET] http://localhost/ => [200] OK\n\
             [GET] http://localhost/app.js => [200] OK\n\
             [POST] http://localhost/api/login => [401] Unauthorized\n\
             [GET] http://cdn.example.com/Logo.png => [404] Not Found\n\
             [PUT] http://localhost/api/profile\n\
             \n---\nShowing 1-5 of 5 items"
        );
    }

    #[test]
    fn test_network_method_filter_ignores_case() {
        let out = list_network_requests(sample_network(), &network_input(json!({"method": "get"})));
        assert!(out.output.ends_with("Showing 1-3 of 3 items"), "{}", out.output);
        assert!(out.output.contains("Logo.png"));
    }

    #[test]
    fn test_network_status_filter_skips_pending() {
        let out = list_network_requests(sample_network(), &network_input(json!({"status": 200})));
        assert!(out.output.ends_with("Showing 1-2 of 2 items"));
        assert!(!out.output.contains("profile"));
    }

    #[test]
    fn test_network_url_filter_is_substring() {
        let out = list_network_requests(sample_network(), &network_input(json!({"url": "/API/"})));
        assert!(out.output.starts_with("[POST] http://localhost/api/login"));
        assert!(out.output.ends_with("Showing 1-2 of 2 items"));
    }

    #[test]
    fn test_network_text_filter_covers_status_text() {
        let out = list_network_requests(sample_network(), &network_input(json!({"filter": "not found"})));
        assert!(out.output.starts_with("[GET] http://cdn.example.com/Logo.png"));
        assert!(out.output.ends_with("Showing 1-1 of 1 items"));

        let out = list_network_requests(sample_network(), &network_input(json!({"filter": "401"})));
        assert!(out.output.ends_with("Showing 1-1 of 1 items"));
    }

    #[test]
    fn test_network_combined_filters() {
        let out = list_network_requests(
            sample_network(),
            &network_input(json!({"method": "GET", "url": "localhost", "filter": "app"})),
        );
        assert_eq!(
            out.output,
            "[GET] http://localhost/app.js => [200] OK\n\n---\nShowing 1-1 of 1 items"
        );
    }

    #[test]
    fn test_network_no_matches() {
        let out = list_network_requests(sample_network(), &network_input(json!({"status": 500})));
        assert_eq!(out.output, "\n---\nNo items found");
    }

    #[test]
    fn test_network_input_validation() {
        assert!(NetworkRequestsInput::parse(json!({"status": 99})).is_err());
        assert!(NetworkRequestsInput::parse(json!({"status": 600})).is_err());
        assert!(NetworkRequestsInput::parse(json!({"status": 599})).is_ok());
        assert!(NetworkRequestsInput::parse(json!({"limit": 0})).is_err());
    }
}
