use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use url::Url;

/// Fetches the remote page title for a URL. Abstracted so the fallback
/// cascade can be exercised without a network.
pub trait TitleFetcher: Send + Sync {
    /// Return the raw page title, or `None` when the fetch or the
    /// extraction fails for any reason.
    fn fetch_title(&self, url: &str) -> Option<String>;
}

/// Real fetcher backed by ureq with a bounded timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> HttpFetcher {
        HttpFetcher {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            user_agent: user_agent.into(),
        }
    }
}

impl TitleFetcher for HttpFetcher {
    fn fetch_title(&self, url: &str) -> Option<String> {
        // call() already treats non-2xx statuses as errors
        let response = self
            .agent
            .get(url)
            .set("User-Agent", &self.user_agent)
            .call()
            .ok()?;
        let body = response.into_string().ok()?;
        extract_html_title(&body)
    }
}

/// Fetcher that never succeeds; used for offline parsing (CLI checks,
/// tests) so bare URLs still get a label from the local strategies.
pub struct NoFetch;

impl TitleFetcher for NoFetch {
    fn fetch_title(&self, _url: &str) -> Option<String> {
        None
    }
}

/// Resolves a URL to a human-readable label through an ordered strategy
/// cascade. The final strategy is the identity, so resolution is total:
/// it always returns a non-empty string and never fails.
pub struct TitleResolver {
    fetcher: Box<dyn TitleFetcher>,
}

impl TitleResolver {
    pub fn new(fetcher: Box<dyn TitleFetcher>) -> TitleResolver {
        TitleResolver { fetcher }
    }

    /// Resolver that skips the network strategy entirely.
    pub fn offline() -> TitleResolver {
        TitleResolver::new(Box::new(NoFetch))
    }

    /// Resolve a URL to a label:
    /// 1. remote page title (cleaned of site-name decoration)
    /// 2. last non-empty path segment, separators spaced, title-cased
    /// 3. domain + path
    /// 4. the raw URL itself
    pub fn resolve(&self, raw: &str) -> String {
        self.fetcher
            .fetch_title(raw)
            .map(|t| clean_title(&t))
            .filter(|t| !t.is_empty())
            .or_else(|| path_segment_label(raw))
            .or_else(|| domain_with_path(raw))
            .unwrap_or_else(|| raw.to_string())
    }
}

/// Whether a task line remainder is a bare URL (a single absolute
/// http(s) link with no surrounding text).
pub fn is_bare_url(text: &str) -> bool {
    (text.starts_with("http://") || text.starts_with("https://"))
        && !text.contains(char::is_whitespace)
        && Url::parse(text).is_ok()
}

// ---------------------------------------------------------------------------
// Strategy 2: path segment
// ---------------------------------------------------------------------------

fn path_segment_label(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()?;
    let spaced = segment.replace(['-', '_'], " ");
    let label = title_case(spaced.trim());
    if label.is_empty() { None } else { Some(label) }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Strategy 3: domain + path
// ---------------------------------------------------------------------------

fn domain_with_path(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?;
    let path = parsed.path();
    let label = if path == "/" || path.is_empty() {
        host.to_string()
    } else {
        format!("{}{}", host, path)
    };
    if label.is_empty() { None } else { Some(label) }
}

// ---------------------------------------------------------------------------
// HTML title extraction
// ---------------------------------------------------------------------------

static TITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static OG_TITLE_A: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*property\s*=\s*["']og:title["'][^>]*content\s*=\s*["']([^"']+)["']"#)
        .unwrap()
});
static OG_TITLE_B: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*content\s*=\s*["']([^"']+)["'][^>]*property\s*=\s*["']og:title["']"#)
        .unwrap()
});
static H1_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
static INNER_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Pull a title out of an HTML document: `<title>`, then `og:title`,
/// then the first `<h1>`.
pub fn extract_html_title(html: &str) -> Option<String> {
    let candidate = TITLE_TAG
        .captures(html)
        .map(|c| c[1].to_string())
        .or_else(|| OG_TITLE_A.captures(html).map(|c| c[1].to_string()))
        .or_else(|| OG_TITLE_B.captures(html).map(|c| c[1].to_string()))
        .or_else(|| H1_TAG.captures(html).map(|c| c[1].to_string()))?;
    let text = INNER_TAGS.replace_all(&candidate, "");
    let text = decode_entities(text.trim());
    if text.is_empty() { None } else { Some(text) }
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

// ---------------------------------------------------------------------------
// Title cleanup
// ---------------------------------------------------------------------------

static SITE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[-|–—»•]\s+[^-|–—»•]*$").unwrap());
static SITE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z ]+\s[-–]\s*").unwrap());

/// Strip common site-name decoration (`Page - GitHub`, `Page | Site`,
/// `Site - Page`). When stripping would leave nothing, the original
/// title is kept.
pub fn clean_title(title: &str) -> String {
    let original = title.trim();
    let mut cleaned = SITE_SUFFIX.replace(original, "").to_string();
    cleaned = SITE_PREFIX.replace(&cleaned, "").trim().to_string();
    if cleaned.is_empty() {
        original.to_string()
    } else {
        cleaned
    }
}
