//! Headless rendering as a fetch capability
//!
//! Listing pages only show their ads after scripts run. The crawl does not care
//! how a page was obtained, so rendering is exposed as another [`Fetcher`]: a
//! [`RenderingFetcher`] wraps any [`Renderer`] and turns each request into one
//! render context that is always released, including when the fetch future is
//! dropped by cancellation.

use super::fetcher::{FetchFailure, FetchOutcome, FetchRequest, Fetcher};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Rendering failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("navigation timed out after {0} ms")]
    Timeout(u64),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

/// Result of navigating to a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResult {
    /// The final URL after any redirects
    pub final_url: String,
    pub status: u16,
}

/// A browser engine that can create rendering contexts
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Opens a fresh context (tab)
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, RenderError>;
}

/// A single browser context
#[async_trait]
pub trait RenderContext: Send + Sync {
    async fn navigate(&mut self, url: &str, timeout_ms: u64)
        -> Result<NavigationResult, RenderError>;

    /// Serialized DOM after scripts ran
    async fn get_html(&self) -> Result<String, RenderError>;

    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

/// Owns a context for the duration of one fetch
///
/// [`ContextGuard::release`] closes it on the normal path. If the guard is
/// dropped first (panic or cancellation), the close is spawned onto the
/// current runtime.
struct ContextGuard {
    context: Option<Box<dyn RenderContext>>,
}

impl ContextGuard {
    fn new(context: Box<dyn RenderContext>) -> Self {
        Self {
            context: Some(context),
        }
    }

    fn context(&mut self) -> Option<&mut Box<dyn RenderContext>> {
        self.context.as_mut()
    }

    async fn release(mut self) {
        if let Some(context) = self.context.take() {
            if let Err(e) = context.close().await {
                warn!("Failed to close render context: {}", e);
            }
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = context.close().await {
                        warn!("Failed to close abandoned render context: {}", e);
                    }
                });
            }
            Err(_) => warn!("Render context dropped outside a runtime; not closed"),
        }
    }
}

/// [`Fetcher`] that renders pages through an injected [`Renderer`]
pub struct RenderingFetcher<R> {
    renderer: R,
    timeout: Duration,
}

impl<R: Renderer> RenderingFetcher<R> {
    pub fn new(renderer: R, timeout: Duration) -> Self {
        Self { renderer, timeout }
    }

    async fn render(&self, context: &mut Box<dyn RenderContext>, url: &Url) -> FetchOutcome {
        let timeout_ms = self.timeout.as_millis() as u64;
        let navigation = match context.navigate(url.as_str(), timeout_ms).await {
            Ok(navigation) => navigation,
            Err(e) => return render_failure(e),
        };

        match navigation.status {
            429 => return FetchOutcome::RateLimited { retry_after: None },
            500..=599 => {
                return FetchOutcome::TransientError {
                    cause: FetchFailure::ServerError(navigation.status),
                }
            }
            400..=499 => {
                return FetchOutcome::FatalError {
                    cause: FetchFailure::ClientError {
                        status: navigation.status,
                        message: "navigation returned a client error".to_string(),
                    },
                }
            }
            _ => {}
        }

        let body = match context.get_html().await {
            Ok(body) => body,
            Err(e) => return render_failure(e),
        };
        let final_url = Url::parse(&navigation.final_url).unwrap_or_else(|_| url.clone());

        FetchOutcome::Success {
            status: navigation.status,
            headers: HeaderMap::new(),
            body,
            content_type: "text/html".to_string(),
            final_url,
        }
    }
}

#[async_trait]
impl<R: Renderer> Fetcher for RenderingFetcher<R> {
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let context = match self.renderer.new_context().await {
            Ok(context) => context,
            Err(e) => return render_failure(e),
        };
        let mut guard = ContextGuard::new(context);

        let url = request.full_url();
        debug!("Rendering {}", url);
        let outcome = match guard.context() {
            Some(context) => self.render(context, &url).await,
            None => FetchOutcome::FatalError {
                cause: FetchFailure::Render("render context already released".to_string()),
            },
        };

        guard.release().await;
        outcome
    }
}

fn render_failure(e: RenderError) -> FetchOutcome {
    match e {
        RenderError::Timeout(_) => FetchOutcome::TransientError {
            cause: FetchFailure::Timeout,
        },
        RenderError::Navigation(_) => FetchOutcome::TransientError {
            cause: FetchFailure::Render(e.to_string()),
        },
        RenderError::Unavailable(_) => FetchOutcome::FatalError {
            cause: FetchFailure::Render(e.to_string()),
        },
    }
}
