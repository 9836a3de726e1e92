//! Google result-page scraper.
//!
//! Rank collection walks the paginated result list: scan the current page's
//! result container, then follow the next-page link until the domain shows
//! up, the scan limit is reached or the pagination ends. Page markup is
//! matched structurally, so layout changes degrade to an empty scan rather
//! than an error.

use async_trait::async_trait;
use reqwest::Client;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::models::{EntityId, RANK_NOT_FOUND};
use crate::progress::ProgressSink;

use super::{EngineError, RankOutcome, ScrapeOptions, SearchEngine};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Organic result hrefs come wrapped as `/url?q=<target>`; anything else in
/// the container (ads, nav, spelling suggestions) misses the marker.
const RESULT_MARKER: &str = "/url?q=http";
const RESULT_WRAPPER_LEN: usize = "/url?q=".len();

struct Selectors {
    main: Selector,
    footer: Selector,
    div: Selector,
    anchor: Selector,
}

impl Selectors {
    fn new() -> Result<Self, EngineError> {
        Ok(Self {
            main: parse_selector("#main")?,
            footer: parse_selector("footer")?,
            div: parse_selector("div")?,
            anchor: parse_selector("a")?,
        })
    }
}

fn parse_selector(css: &str) -> Result<Selector, EngineError> {
    Selector::parse(css).map_err(|err| EngineError::Selector(err.to_string()))
}

/// Scrapes one Google property. The same implementation serves any regional
/// variant; only the id, naming and base URL differ.
pub struct GoogleEngine {
    id: EntityId,
    name: String,
    description: String,
    base_url: String,
    options: ScrapeOptions,
    client: Client,
    selectors: Selectors,
}

impl GoogleEngine {
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        description: impl Into<String>,
        base_url: &str,
        options: ScrapeOptions,
    ) -> Result<Self, EngineError> {
        Url::parse(base_url)?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.request_timeout)
            .build()?;
        Ok(Self {
            id,
            name: name.into(),
            description: description.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
            client,
            selectors: Selectors::new()?,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, EngineError> {
        debug!(url, "fetching results page");
        let response = self.client.get(url).send().await?;
        // Non-success pages flow through the parser and scan to nothing.
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "results page received");
        Ok(body)
    }

    /// Scans one result page. `scanned` carries the cumulative candidate
    /// count from earlier pages; the returned count continues it.
    fn scan_page(&self, html: &str, domain: &str, scanned: i32, limit: i32) -> PageScan {
        let document = Html::parse_document(html);
        let mut count = scanned;
        let mut hit = None;

        if let Some(container) = document.select(&self.selectors.main).next() {
            for node in container.children() {
                if hit.is_some() || count >= limit {
                    break;
                }
                if let Some(candidate) = candidate_url(node) {
                    count += 1;
                    if starts_with_ignore_case(&candidate, domain) {
                        hit = Some(RankOutcome { rank: count, page_url: candidate });
                    }
                }
            }
        } else {
            warn!(engine = self.name.as_str(), "result container missing from page, nothing to scan");
        }

        let next_path = if hit.is_none() && count < limit {
            self.next_page_path(&document)
        } else {
            None
        };

        PageScan { hit, scanned: count, next_path }
    }

    /// Relative href of the next-page link: third div of the page footer,
    /// preferring its third anchor and falling back towards the first.
    fn next_page_path(&self, document: &Html) -> Option<String> {
        let footer = document.select(&self.selectors.footer).next()?;
        let block = footer.select(&self.selectors.div).nth(2)?;
        let anchor = nth_anchor(&block, &self.selectors.anchor, 2)
            .or_else(|| nth_anchor(&block, &self.selectors.anchor, 1))
            .or_else(|| nth_anchor(&block, &self.selectors.anchor, 0))?;
        let href = anchor.value().attr("href")?;
        if href.is_empty() {
            None
        } else {
            Some(href.to_string())
        }
    }
}

struct PageScan {
    /// Position and matched result URL, when the domain showed up on this page.
    hit: Option<RankOutcome>,
    /// Cumulative candidates seen once this page is done.
    scanned: i32,
    /// Where to continue, when the crawl should go on.
    next_path: Option<String>,
}

fn nth_anchor<'a>(block: &ElementRef<'a>, anchor: &Selector, index: usize) -> Option<ElementRef<'a>> {
    block.select(anchor).nth(index)
}

/// Unwraps the target URL of an organic result row. A row qualifies only
/// when the node is an element whose first-child chain is three elements
/// deep, ending in an anchor wrapped with the result marker.
fn candidate_url(node: ego_tree::NodeRef<'_, Node>) -> Option<String> {
    if !node.value().is_element() {
        return None;
    }
    let anchor = element_child(element_child(element_child(node)?)?)?;
    let href = anchor.value().as_element()?.attr("href")?;
    starts_with_ignore_case(href, RESULT_MARKER)
        .then(|| href[RESULT_WRAPPER_LEN..].to_string())
}

fn element_child(node: ego_tree::NodeRef<'_, Node>) -> Option<ego_tree::NodeRef<'_, Node>> {
    let child = node.first_child()?;
    child.value().is_element().then_some(child)
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[async_trait]
impl SearchEngine for GoogleEngine {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn rank_query(
        &self,
        domain: &str,
        phrase: &str,
        progress: &dyn ProgressSink,
    ) -> Result<RankOutcome, EngineError> {
        let limit = self.options.scan_limit;
        let mut url = format!("{}/search?q={}", self.base_url, urlencoding::encode(phrase));
        let mut scanned = 0;
        let mut outcome = RankOutcome {
            rank: RANK_NOT_FOUND,
            page_url: String::new(),
        };

        debug!(engine = self.name.as_str(), domain, phrase, "rank query started");
        loop {
            let body = self.fetch(&url).await?;
            let scan = self.scan_page(&body, domain, scanned, limit);
            scanned = scan.scanned;

            if let Some(hit) = scan.hit {
                debug!(engine = self.name.as_str(), domain, rank = hit.rank, "domain found");
                outcome = hit;
                break;
            }
            let Some(path) = scan.next_path else {
                debug!(engine = self.name.as_str(), domain, scanned, "pagination ended before the domain showed up");
                break;
            };
            progress.update(scanned);
            tokio::time::sleep(self.options.page_delay).await;
            url = format!("{}{}", self.base_url, path);
        }

        progress.update(limit);
        Ok(outcome)
    }
}
