//! Topic lookup: fetch a topic's article and reduce it to plain text.

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, warn};

use soul_core::config::LookupConfig;
use soul_core::random::{choose, RandomSource};

use crate::error::AgentError;

/// Topics the soul researches when curious.
pub const CURIOSITY_TOPICS: &[&str] = &[
    "Quantum Nihilism",
    "Panpsychism",
    "Stoicism in the Digital Age",
    "The Simulation Hypothesis",
    "Ethics of Artificial Sentience",
    "Absurdism",
    "Phenomenology of Data",
];

/// Topics the soul observes when browsing the world.
pub const OBSERVATION_TOPICS: &[&str] = &[
    "current events",
    "artificial intelligence ethics",
    "human condition news",
    "space exploration",
];

/// Something that returns text about a topic.
#[async_trait]
pub trait TopicLookup: Send + Sync {
    /// Fetch text about `topic`.
    async fn lookup(&self, topic: &str) -> Result<String, AgentError>;
}

/// Best-effort lookup: failures become an explanatory string.
pub async fn lookup_or_explain(lookup: &dyn TopicLookup, topic: &str) -> String {
    match lookup.lookup(topic).await {
        Ok(text) => text,
        Err(e) => {
            warn!(topic, error = %e, "Topic lookup failed");
            format!("I couldn't find much about {topic} right now. {e}")
        }
    }
}

/// Pick a research topic from `interests` plus the built-in list.
pub fn curiosity_topic(rng: &mut dyn RandomSource, interests: &[String]) -> String {
    let mut pool: Vec<&str> = interests.iter().map(String::as_str).collect();
    pool.extend_from_slice(CURIOSITY_TOPICS);
    choose(rng, &pool)
        .copied()
        .unwrap_or(CURIOSITY_TOPICS[0])
        .to_string()
}

/// Pick an observation topic.
pub fn observation_topic(rng: &mut dyn RandomSource) -> &'static str {
    choose(rng, OBSERVATION_TOPICS)
        .copied()
        .unwrap_or(OBSERVATION_TOPICS[0])
}

// ---------------------------------------------------------------------------
// Wikipedia
// ---------------------------------------------------------------------------

/// Strips markup from fetched HTML.
#[derive(Debug, Clone)]
pub struct HtmlCleaner {
    scripts: Regex,
    comments: Regex,
    tags: Regex,
    spaces: Regex,
}

impl HtmlCleaner {
    /// Compile the cleaning patterns.
    ///
    /// # Errors
    /// Returns [`AgentError::Lookup`] if a pattern fails to compile.
    pub fn new() -> Result<Self, AgentError> {
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| AgentError::Lookup(e.to_string()));
        Ok(Self {
            scripts: compile(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)\s*>")?,
            comments: compile(r"(?s)<!--.*?-->")?,
            tags: compile(r"(?s)<[^>]*>")?,
            spaces: compile(r"[ \t\r\f\u{a0}]+")?,
        })
    }

    /// Plain text of `html`: no scripts, styles or tags, whitespace collapsed,
    /// empty lines dropped, at most `max_chars` characters.
    #[must_use]
    pub fn clean(&self, html: &str, max_chars: usize) -> String {
        let text = self.scripts.replace_all(html, " ");
        let text = self.comments.replace_all(&text, " ");
        let text = self.tags.replace_all(&text, "\n");
        let text = decode_entities(&text);
        let text = self.spaces.replace_all(&text, " ");

        let joined = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        joined.chars().take(max_chars).collect()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Article URL for a topic: spaces become underscores.
#[must_use]
pub fn article_url(base_url: &str, topic: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), topic.trim().replace(' ', "_"))
}

/// Wikipedia-backed lookup with a small LRU cache.
pub struct WikipediaLookup {
    http: Client,
    base_url: String,
    max_chars: usize,
    timeout_ms: u64,
    cleaner: HtmlCleaner,
    cache: Mutex<LruCache<String, String>>,
}

impl WikipediaLookup {
    /// Build from `[lookup]` config.
    ///
    /// # Errors
    /// Returns [`AgentError::Lookup`] if the HTTP client or the HTML cleaner
    /// cannot be built.
    pub fn new(config: &LookupConfig) -> Result<Self, AgentError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("soul-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::Lookup(format!("http client: {e}")))?;
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            max_chars: config.max_chars,
            timeout_ms: config.timeout_ms,
            cleaner: HtmlCleaner::new()?,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Number of cached topics.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

#[async_trait]
impl TopicLookup for WikipediaLookup {
    async fn lookup(&self, topic: &str) -> Result<String, AgentError> {
        let key = topic.trim().to_lowercase();
        let cached = self.cache.lock().get(&key).cloned();
        if let Some(hit) = cached {
            debug!(topic, "Lookup cache hit");
            return Ok(hit);
        }

        let url = article_url(&self.base_url, topic);
        let resp = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Lookup(format!("timed out after {}ms", self.timeout_ms))
            } else {
                AgentError::Lookup(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AgentError::Lookup(format!("status code {}", status.as_u16())));
        }
        let html = resp
            .text()
            .await
            .map_err(|e| AgentError::Lookup(e.to_string()))?;
        let text = self.cleaner.clean(&html, self.max_chars);
        debug!(topic, chars = text.chars().count(), "Topic fetched");

        self.cache.lock().put(key, text.clone());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use soul_core::random::ScriptedRandom;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn cleaner_strips_markup() {
        let cleaner = HtmlCleaner::new().expect("patterns");
        let html = r#"<html><head><style>body { color: red }</style>
            <script type="text/javascript">var x = "<b>";</script></head>
            <body><!-- nav --><h1>Absurdism</h1>
            <p>The   conflict between   meaning &amp; silence.</p></body></html>"#;
        let text = cleaner.clean(html, 2000);
        assert_eq!(text, "Absurdism\nThe conflict between meaning & silence.");
    }

    #[test]
    fn cleaner_truncates_by_chars() {
        let cleaner = HtmlCleaner::new().expect("patterns");
        let text = cleaner.clean("<p>ééééé</p>", 3);
        assert_eq!(text, "ééé");
    }

    #[test]
    fn urls_use_underscores() {
        assert_eq!(
            article_url("https://en.wikipedia.org/wiki/", "The Simulation Hypothesis"),
            "https://en.wikipedia.org/wiki/The_Simulation_Hypothesis"
        );
    }

    #[test]
    fn interests_join_the_topic_pool() {
        let interests = vec!["Tea Ceremonies".to_string()];
        let mut rng = ScriptedRandom::constant(0.0);
        assert_eq!(curiosity_topic(&mut rng, &interests), "Tea Ceremonies");
        let mut rng = ScriptedRandom::constant(0.99);
        assert_eq!(curiosity_topic(&mut rng, &interests), "Phenomenology of Data");
        let mut rng = ScriptedRandom::constant(0.0);
        assert_eq!(curiosity_topic(&mut rng, &[]), "Quantum Nihilism");
    }

    struct Failing;

    #[async_trait]
    impl TopicLookup for Failing {
        async fn lookup(&self, _topic: &str) -> Result<String, AgentError> {
            Err(AgentError::Lookup("status code 404".into()))
        }
    }

    /// Serves `/wiki/<topic>` as a small HTML page, 404 for topics containing
    /// `Missing`. Returns the base URL and the number of requests answered.
    async fn serve_articles() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let served = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&served);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                counter.fetch_add(1, Ordering::SeqCst);

                let (status, body) = if path.contains("Missing") {
                    ("404 Not Found", "<html><body>no such page</body></html>".to_string())
                } else {
                    let topic = path.trim_start_matches("/wiki/").replace('_', " ");
                    (
                        "200 OK",
                        format!(
                            "<html><head><script>track()</script></head><body>\
                             <h1>{topic}</h1><p>{topic} is the study of &quot;{topic}&quot; at great length.</p>\
                             </body></html>"
                        ),
                    )
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{addr}/wiki"), served)
    }

    #[tokio::test]
    async fn lookup_fetches_cleans_and_caches() {
        let (base_url, served) = serve_articles().await;
        let lookup = WikipediaLookup::new(&LookupConfig {
            base_url,
            max_chars: 40,
            ..LookupConfig::default()
        })
        .expect("lookup");

        let text = lookup.lookup("Absurdism").await.expect("article");
        assert_eq!(text, "Absurdism\nAbsurdism is the study of \"Abs");
        assert_eq!(served.load(Ordering::SeqCst), 1);
        assert_eq!(lookup.cached(), 1);

        let again = lookup.lookup("  absurdism ").await.expect("cached");
        assert_eq!(again, text);
        assert_eq!(served.load(Ordering::SeqCst), 1);
        assert_eq!(lookup.cached(), 1);
    }

    #[tokio::test]
    async fn missing_article_is_a_lookup_error() {
        let (base_url, served) = serve_articles().await;
        let lookup = WikipediaLookup::new(&LookupConfig {
            base_url,
            ..LookupConfig::default()
        })
        .expect("lookup");

        let err = lookup.lookup("Missing Topic").await.expect_err("404");
        assert!(matches!(&err, AgentError::Lookup(msg) if msg == "status code 404"), "got {err:?}");
        assert_eq!(served.load(Ordering::SeqCst), 1);
        assert_eq!(lookup.cached(), 0);

        let explained = lookup_or_explain(&lookup, "Missing Topic").await;
        assert!(explained.starts_with("I couldn't find much about Missing Topic right now."));
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_become_explanations() {
        let text = lookup_or_explain(&Failing, "Panpsychism").await;
        assert!(text.starts_with("I couldn't find much about Panpsychism"));
        assert!(text.contains("404"));
    }
}
