//! Browser session management
//!
//! One headless Chrome per conversation, launched on first use and
//! dropped after sitting idle. Each session keeps capture buffers for
//! console messages and network requests fed by CDP event listeners.

use super::capture::{
    console_kind, extract_console_arg_text, ConsoleLog, ConsoleMessage, NetworkLog,
    NetworkRequest, NetworkResponse,
};
use crate::config::Config;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    cdp::browser_protocol::network::{
        EnableParams as NetworkEnableParams, EventRequestWillBeSent, EventResponseReceived,
        Response as CdpResponse,
    },
    cdp::browser_protocol::page::EventFrameNavigated,
    cdp::js_protocol::runtime::EventConsoleApiCalled,
    fetcher::{BrowserFetcher, BrowserFetcherOptions},
    Page,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Cleanup check interval (60 seconds)
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Browser operation failed: {0}")]
    OperationFailed(String),

    #[error("Session not found for conversation: {0}")]
    SessionNotFound(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        BrowserError::OperationFailed(e.to_string())
    }
}

/// Settings a session needs at launch
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub chrome_executable: Option<PathBuf>,
    pub max_console_messages: usize,
    pub max_network_requests: usize,
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            chrome_executable: config.chrome_executable.clone(),
            max_console_messages: config.max_console_messages,
            max_network_requests: config.max_network_requests,
        }
    }
}

/// Per-conversation browser instance
pub struct BrowserSession {
    #[allow(dead_code)] // Browser must stay alive
    browser: Browser,
    handler_task: JoinHandle<()>,
    capture_task: Option<JoinHandle<()>>,
    pub page: Page,
    /// Console messages (separate lock so capture never waits on tools)
    pub console: Arc<StdMutex<ConsoleLog>>,
    /// Requests issued by the page, with responses as they arrive
    pub network: Arc<StdMutex<NetworkLog>>,
    /// Last activity timestamp (for idle timeout)
    pub last_activity: Instant,
}

fn user_data_dir(conversation_id: &str) -> PathBuf {
    std::env::temp_dir().join(format!("browser-lens-chrome-{conversation_id}"))
}

fn to_network_response(response: &CdpResponse) -> NetworkResponse {
    let status = u16::try_from(response.status).unwrap_or_else(|_| {
        tracing::warn!(status = response.status, url = %response.url, "Response status out of range");
        0
    });
    NetworkResponse {
        status,
        status_text: response.status_text.clone(),
    }
}

impl BrowserSession {
    /// Directory where the fetcher caches downloaded Chrome binaries
    fn fetcher_cache_dir() -> PathBuf {
        let base = std::env::var("HOME").map_or_else(|_| PathBuf::from("/tmp"), PathBuf::from);
        base.join(".cache/browser-lens/chromium")
    }

    fn browser_config(
        conversation_id: &str,
        executable: Option<&Path>,
    ) -> Result<BrowserConfig, BrowserError> {
        let user_data_dir = user_data_dir(conversation_id);

        // Stale profile dirs leave a SingletonLock behind
        let _ = std::fs::remove_dir_all(&user_data_dir);

        let mut builder = BrowserConfig::builder()
            .new_headless_mode()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer")
            .user_data_dir(&user_data_dir);

        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(BrowserError::LaunchFailed)
    }

    async fn launch_and_init(
        conversation_id: &str,
        executable: Option<&Path>,
        options: &SessionOptions,
    ) -> Result<Self, BrowserError> {
        let config = Self::browser_config(conversation_id, executable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!("CDP handler error: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        Ok(Self {
            browser,
            handler_task,
            capture_task: None,
            page,
            console: Arc::new(StdMutex::new(ConsoleLog::with_capacity(
                options.max_console_messages,
            ))),
            network: Arc::new(StdMutex::new(NetworkLog::with_capacity(
                options.max_network_requests,
            ))),
            last_activity: Instant::now(),
        })
    }

    /// Create a new browser session.
    ///
    /// Uses the configured executable if there is one. Otherwise tries
    /// system Chrome, then downloads a compatible Chromium via
    /// `BrowserFetcher` and caches it for future runs.
    async fn new(conversation_id: &str, options: &SessionOptions) -> Result<Self, BrowserError> {
        if let Some(path) = &options.chrome_executable {
            return Self::launch_and_init(conversation_id, Some(path), options).await;
        }

        match Self::launch_and_init(conversation_id, None, options).await {
            Ok(session) => return Ok(session),
            Err(e) => {
                tracing::info!("System Chrome not available ({e}), trying fetcher...");
            }
        }

        let cache_dir = Self::fetcher_cache_dir();
        tracing::info!("Downloading Chrome to {cache_dir:?} (first run only)...");

        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            BrowserError::LaunchFailed(format!(
                "Failed to create cache dir {}: {e}",
                cache_dir.display()
            ))
        })?;

        let fetcher_opts = BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .map_err(|e| BrowserError::LaunchFailed(format!("Fetcher config error: {e}")))?;

        let fetcher = BrowserFetcher::new(fetcher_opts);
        let info = fetcher
            .fetch()
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("Chrome download failed: {e:#}")))?;

        tracing::info!("Using Chrome at {:?}", info.executable_path);

        Self::launch_and_init(conversation_id, Some(&info.executable_path), options).await
    }

    /// Start console and network capture (called after session is wrapped in Arc<RwLock>)
    ///
    /// One task drains every stream so events are applied in a fixed
    /// priority: a main-frame navigation empties both buffers before any
    /// request or console message queued behind it is recorded.
    pub async fn setup_capture_listeners(session: Arc<RwLock<Self>>) -> Result<(), BrowserError> {
        let (mut navigations, mut console_events, mut requests, mut responses, console, network) = {
            let guard = session.read().await;
            guard.page.execute(NetworkEnableParams::default()).await?;
            (
                guard.page.event_listener::<EventFrameNavigated>().await?,
                guard.page.event_listener::<EventConsoleApiCalled>().await?,
                guard.page.event_listener::<EventRequestWillBeSent>().await?,
                guard.page.event_listener::<EventResponseReceived>().await?,
                guard.console.clone(),
                guard.network.clone(),
            )
        };

        let capture_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    Some(event) = navigations.next() => {
                        if event.frame.parent_id.is_none() {
                            tracing::debug!(url = %event.frame.url, "Main frame navigated, resetting capture");
                            if let Ok(mut log) = console.lock() {
                                log.clear();
                            }
                            if let Ok(mut log) = network.lock() {
                                log.clear();
                            }
                        }
                    }
                    // Requests before responses so a request is always known when its response lands
                    Some(event) = requests.next() => {
                        let request = NetworkRequest {
                            method: event.request.method.clone(),
                            url: event.request.url.clone(),
                        };
                        tracing::debug!(method = %request.method, url = %request.url, "Request captured");
                        let redirect = event.redirect_response.as_ref().map(to_network_response);
                        if let Ok(mut log) = network.lock() {
                            log.record_request(event.request_id.inner(), request, redirect);
                        }
                    }
                    Some(event) = responses.next() => {
                        let response = to_network_response(&event.response);
                        if let Ok(mut log) = network.lock() {
                            log.record_response(event.request_id.inner(), response);
                        }
                    }
                    Some(event) = console_events.next() => {
                        let kind = console_kind(&event.r#type);
                        let text = event
                            .args
                            .iter()
                            .map(extract_console_arg_text)
                            .collect::<Vec<_>>()
                            .join(" ");
                        tracing::debug!(kind = %kind, text = %text, "Console event captured");
                        if let Ok(mut log) = console.lock() {
                            log.push(ConsoleMessage::new(kind, text));
                        }
                    }
                    else => break,
                }
            }
        });

        session.write().await.capture_task = Some(capture_task);

        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(task) = &self.capture_task {
            task.abort();
        }
        self.handler_task.abort();
    }
}

/// Global manager for all browser sessions
pub struct BrowserSessionManager {
    sessions: RwLock<HashMap<String, Arc<RwLock<BrowserSession>>>>,
    options: SessionOptions,
    idle_timeout: Duration,
}

impl BrowserSessionManager {
    /// Create a session manager and start its idle cleanup task
    pub fn new(config: &Config) -> Arc<Self> {
        let manager = Arc::new(Self::with_config(config));

        // Weak reference so the task never keeps the manager alive
        let manager_weak = Arc::downgrade(&manager);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(CLEANUP_INTERVAL).await;
                if let Some(manager) = manager_weak.upgrade() {
                    manager.cleanup_idle_sessions().await;
                } else {
                    tracing::debug!("BrowserSessionManager dropped, cleanup task exiting");
                    break;
                }
            }
        });

        manager
    }

    /// Manager without the background cleanup task
    pub fn with_config(config: &Config) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            options: SessionOptions::from(config),
            idle_timeout: config.idle_timeout,
        }
    }

    /// Get a session for a conversation (creates if needed)
    /// Returns Arc to the session - caller manages locking
    pub async fn get_session(
        &self,
        conversation_id: &str,
    ) -> Result<Arc<RwLock<BrowserSession>>, BrowserError> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(conversation_id) {
                return Ok(session.clone());
            }
        }

        let mut sessions = self.sessions.write().await;

        // Double-check after acquiring write lock
        if let Some(session) = sessions.get(conversation_id) {
            return Ok(session.clone());
        }

        tracing::info!(conversation_id, "Creating new browser session");
        let session = BrowserSession::new(conversation_id, &self.options).await?;
        let session_arc = Arc::new(RwLock::new(session));

        // A session without capture would report empty listings as success
        if let Err(e) = BrowserSession::setup_capture_listeners(session_arc.clone()).await {
            tracing::warn!(conversation_id, error = %e, "Failed to set up capture listeners");
            return Err(BrowserError::OperationFailed(format!(
                "capture setup failed: {e}"
            )));
        }

        sessions.insert(conversation_id.to_string(), session_arc.clone());

        Ok(session_arc)
    }

    /// Existing session only; never launches Chrome
    pub async fn existing_session(
        &self,
        conversation_id: &str,
    ) -> Result<Arc<RwLock<BrowserSession>>, BrowserError> {
        self.sessions
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| BrowserError::SessionNotFound(conversation_id.to_string()))
    }

    /// Kill a specific session. Returns whether one existed.
    pub async fn kill_session(&self, conversation_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(conversation_id);
        let Some(session) = removed else {
            return false;
        };

        tracing::info!(conversation_id, "Killing browser session");
        // Dropping the session closes the browser
        drop(session);

        let dir = user_data_dir(conversation_id);
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to clean up browser data dir");
        }
        true
    }

    /// Kill all sessions (called on shutdown)
    pub async fn shutdown_all(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        if count > 0 {
            tracing::info!(count, "Shutting down all browser sessions");
            sessions.clear();
        }
    }

    /// Drop sessions idle for longer than the configured timeout.
    /// Sessions locked by a running tool are busy, not idle.
    async fn cleanup_idle_sessions(&self) {
        let idle_timeout = self.idle_timeout;
        self.sessions.write().await.retain(|conversation_id, session| {
            let idle = session
                .try_read()
                .is_ok_and(|guard| guard.last_activity.elapsed() > idle_timeout);
            if idle {
                tracing::info!(conversation_id = %conversation_id, "Cleaning up idle browser session");
            }
            !idle
        });
    }
}

impl Default for BrowserSessionManager {
    fn default() -> Self {
        Self::with_config(&Config::default())
    }
}

impl Drop for BrowserSessionManager {
    fn drop(&mut self) {
        tracing::info!("BrowserSessionManager dropped - all sessions will be closed");
    }
}
