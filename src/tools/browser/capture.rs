//! Console and network records captured from CDP events
//!
//! The session owns one [`ConsoleLog`] and one [`NetworkLog`] per page.
//! Listing tools only ever read snapshots of them.

use crate::pagination::SearchText;
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, ObjectPreview, ObjectPreviewSubtype, RemoteObject,
};
use std::collections::VecDeque;

/// Maximum bytes stored per console arg in the capture buffer.
/// Memory protection only; tools render messages as captured.
pub(crate) const MAX_CAPTURE_ARG_BYTES: usize = 10_000;

/// Console message captured from the page
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    /// Lower-case message type: `log`, `error`, `warning`, `info`, `debug`, `trace`, ...
    pub kind: String,
    pub text: String,
}

impl ConsoleMessage {
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
        }
    }

    /// `[ERROR] something broke`
    pub fn render(&self) -> String {
        format!("[{}] {}", self.kind.to_uppercase(), self.text)
    }
}

impl SearchText for ConsoleMessage {
    fn search_text(&self) -> String {
        format!("{} {}", self.kind, self.text)
    }
}

/// CDP wire name of a console call type (`warning`, `startGroupCollapsed`, ...)
pub(crate) fn console_kind(kind: &ConsoleApiCalledType) -> String {
    kind.as_ref().to_string()
}

/// Text for one console argument.
///
/// Primitives print their value; objects fall back to their preview, then
/// the description, then the unserializable literal (`undefined`, `NaN`).
/// Stored text is capped at [`MAX_CAPTURE_ARG_BYTES`].
pub(crate) fn extract_console_arg_text(arg: &RemoteObject) -> String {
    let text = arg
        .value
        .as_ref()
        .map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .or_else(|| arg.preview.as_ref().map(preview_text))
        .or_else(|| arg.description.clone())
        .or_else(|| arg.unserializable_value.as_ref().map(|u| u.inner().clone()))
        .unwrap_or_else(|| "[unknown]".to_string());
    truncate_unicode_safe(text, MAX_CAPTURE_ARG_BYTES)
}

/// `[1, 2, 3]` for arrays, `{a: 1, b: 2}` otherwise
fn preview_text(preview: &ObjectPreview) -> String {
    let is_array = matches!(preview.subtype, Some(ObjectPreviewSubtype::Array));
    let mut parts: Vec<String> = preview
        .properties
        .iter()
        .map(|property| {
            let value = property.value.as_deref().unwrap_or("…");
            if is_array {
                value.to_string()
            } else {
                format!("{}: {value}", property.name)
            }
        })
        .collect();
    if preview.overflow {
        parts.push("…".to_string());
    }

    let body = parts.join(", ");
    if is_array {
        format!("[{body}]")
    } else {
        format!("{{{body}}}")
    }
}

/// Cut `s` to at most `max_bytes` on a char boundary and mark the cut with `…`
pub(crate) fn truncate_unicode_safe(mut s: String, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s.push('…');
    s
}

/// Bounded console buffer; the oldest message is dropped when full
#[derive(Debug)]
pub struct ConsoleLog {
    messages: VecDeque<ConsoleMessage>,
    capacity: usize,
}

impl ConsoleLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, message: ConsoleMessage) {
        if self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Messages in capture order
    pub fn snapshot(&self) -> Vec<ConsoleMessage> {
        self.messages.iter().cloned().collect()
    }

    /// Forget everything; called when the main frame navigates
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequest {
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkResponse {
    pub status: u16,
    pub status_text: String,
}

/// A request and, once it arrived, its response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEntry {
    pub request: NetworkRequest,
    pub response: Option<NetworkResponse>,
}

impl NetworkEntry {
    /// `[GET] https://example.com/ => [200] OK`
    pub fn render(&self) -> String {
        let mut line = format!("[{}] {}", self.request.method.to_uppercase(), self.request.url);
        if let Some(response) = &self.response {
            line.push_str(&format!(" => [{}] {}", response.status, response.status_text));
        }
        line
    }
}

impl SearchText for NetworkEntry {
    fn search_text(&self) -> String {
        let (status, status_text) = match &self.response {
            Some(r) => (r.status.to_string(), r.status_text.as_str()),
            None => (String::new(), ""),
        };
        format!(
            "{} {} {} {}",
            self.request.method, self.request.url, status, status_text
        )
    }
}

#[derive(Debug)]
struct TrackedEntry {
    request_id: String,
    entry: NetworkEntry,
}

/// Requests in the order the page issued them, keyed by CDP request id.
///
/// A redirect reuses its request id: the redirect response closes the
/// previous hop and the new location becomes a fresh entry.
#[derive(Debug)]
pub struct NetworkLog {
    entries: VecDeque<TrackedEntry>,
    capacity: usize,
}

impl NetworkLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Record `Network.requestWillBeSent`
    pub fn record_request(
        &mut self,
        request_id: &str,
        request: NetworkRequest,
        redirect_response: Option<NetworkResponse>,
    ) {
        if let Some(response) = redirect_response {
            self.record_response(request_id, response);
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(TrackedEntry {
            request_id: request_id.to_string(),
            entry: NetworkEntry {
                request,
                response: None,
            },
        });
    }

    /// Record `Network.responseReceived`; unknown ids are ignored
    pub fn record_response(&mut self, request_id: &str, response: NetworkResponse) {
        if let Some(tracked) = self
            .entries
            .iter_mut()
            .rev()
            .find(|t| t.request_id == request_id)
        {
            tracked.entry.response = Some(response);
        }
    }

    /// Entries in issue order
    pub fn snapshot(&self) -> Vec<NetworkEntry> {
        self.entries.iter().map(|t| t.entry.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
