use crate::error::{LoadError, Result, SetupError};
use crate::page::{Anchor, collapse_whitespace};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Launches rendering sessions. One session is acquired per crawl run.
#[async_trait]
pub trait Renderer: Send + Sync {
    type Session: RenderSession;

    async fn launch(&self) -> std::result::Result<Self::Session, SetupError>;
}

/// A single page-rendering session, reused for every page of a run.
#[async_trait]
pub trait RenderSession: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Resolves once network and render activity for the current page settle.
    async fn wait_for_idle(&mut self) -> Result<()>;

    async fn extract_text(&self) -> Result<String>;

    /// Anchors of the current page with `href` already absolute.
    async fn extract_links(&self) -> Result<Vec<Anchor>>;

    async fn title(&self) -> Result<String>;

    /// Releases the session. Called exactly once, after traversal.
    async fn close(&mut self) {}
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: "Rufus/0.1 (https://github.com/trapdoorsec/rufus)".to_string(),
            timeout: Duration::from_secs(30),
            max_redirects: 5,
        }
    }
}

/// Renderer backed by plain HTTP fetches and static HTML parsing.
pub struct HttpRenderer {
    config: RendererConfig,
}

impl HttpRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }
}

impl Default for HttpRenderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    type Session = HttpSession;

    async fn launch(&self) -> std::result::Result<HttpSession, SetupError> {
        let client = Client::builder()
            .user_agent(&self.config.user_agent)
            .timeout(self.config.timeout)
            .connect_timeout(self.config.timeout / 2)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(self.config.max_redirects))
            .cookie_store(true)
            .build()?;

        debug!("HTTP rendering session launched");
        Ok(HttpSession {
            client,
            timeout: self.config.timeout,
            current: None,
        })
    }
}

#[derive(Debug, Clone)]
struct RenderedPage {
    text: String,
    title: String,
    anchors: Vec<Anchor>,
}

pub struct HttpSession {
    client: Client,
    timeout: Duration,
    current: Option<RenderedPage>,
}

impl HttpSession {
    fn current(&self) -> Result<&RenderedPage> {
        self.current.as_ref().ok_or(LoadError::NotLoaded)
    }

    fn transport_error(&self, e: reqwest::Error) -> LoadError {
        if e.is_timeout() {
            LoadError::Timeout(self.timeout)
        } else {
            LoadError::HttpError(e)
        }
    }
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.current = None;
        let target = Url::parse(url).map_err(|e| LoadError::InvalidUrl(format!("{}: {}", url, e)))?;

        debug!("Fetching {}", target);
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }

        // A missing content type is treated as HTML
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        if let Some(ref ct) = content_type
            && !ct.contains("html")
        {
            return Err(LoadError::UnsupportedContent(ct.clone()));
        }

        // Links resolve against the post-redirect location
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        self.current = Some(render_html(&body, &final_url)?);
        Ok(())
    }

    async fn wait_for_idle(&mut self) -> Result<()> {
        // The body has been read in full by the time navigate returns
        self.current().map(|_| ())
    }

    async fn extract_text(&self) -> Result<String> {
        Ok(self.current()?.text.clone())
    }

    async fn extract_links(&self) -> Result<Vec<Anchor>> {
        Ok(self.current()?.anchors.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.current()?.title.clone())
    }

    async fn close(&mut self) {
        self.current = None;
        debug!("HTTP rendering session closed");
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| LoadError::ParseError(format!("{:?}", e)))
}

fn render_html(html: &str, page_url: &Url) -> Result<RenderedPage> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title")?)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default();

    let text = match document.select(&selector("body")?).next() {
        Some(body) => visible_text(body),
        None => visible_text(document.root_element()),
    };

    let mut anchors = Vec::new();
    for element in document.select(&selector("a[href]")?) {
        if let Some(href) = element.value().attr("href")
            && let Some(absolute_url) = resolve_url(page_url, href)
        {
            let link_text = collapse_whitespace(&element.text().collect::<String>());
            let parent_text = element
                .parent()
                .and_then(ElementRef::wrap)
                .map(|parent| collapse_whitespace(&parent.text().collect::<String>()))
                .unwrap_or_default();
            anchors.push(Anchor {
                href: absolute_url,
                link_text,
                parent_text,
            });
        }
    }

    Ok(RenderedPage {
        text,
        title,
        anchors,
    })
}

const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Text a reader would see: one line per non-empty text node, skipping
/// script-like elements.
fn visible_text(root: ElementRef) -> String {
    let hidden: HashSet<&str> = HIDDEN_ELEMENTS.into_iter().collect();
    let mut lines = Vec::new();

    for node in root.descendants() {
        if let Some(text) = node.value().as_text() {
            let is_hidden = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|el| hidden.contains(el.value().name()));
            if is_hidden {
                continue;
            }
            let line = collapse_whitespace(text);
            if !line.is_empty() {
                lines.push(line);
            }
        }
    }

    lines.join("\n")
}

/// Resolves `href` against `base`, dropping the fragment. Returns `None` for
/// in-page and non-navigational links.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);

    Some(resolved.to_string())
}
