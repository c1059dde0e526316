pub mod fetch;

use lazy_regex::lazy_regex;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, warn};

use crate::command::{Command, Intent};
pub use fetch::{HttpFetcher, PageFetcher};

const SEARCH_BASE: &str = "http://www.google.co.jp/search?hl=ja&source=hp&q=";
const IMAGE_SUFFIX: &str = "&tbm=isch&tbs=ift:jpg";
const VIDEO_SUFFIX: &str = "&tbm=vid";
const NEWS_SUFFIX: &str = "&tbm=nws";
const WIKI_BASE: &str = "https://ja.wikipedia.org/wiki/";

/// Query-component escaping: unreserved characters stay, space becomes `+`.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static RE_FIRST_IMG_SRC: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r#"<img.+?src="(.+?)".+?>"#);

fn query_escape(q: &str) -> String {
    // A literal '%' is escaped to %25, so every %20 left here came from a space.
    utf8_percent_encode(q, QUERY_COMPONENT)
        .to_string()
        .replace("%20", "+")
}

pub fn search_url(q: &str) -> String {
    format!("{SEARCH_BASE}{}", query_escape(q))
}

pub fn image_search_url(q: &str) -> String {
    search_url(q) + IMAGE_SUFFIX
}

pub fn video_search_url(q: &str) -> String {
    search_url(q) + VIDEO_SUFFIX
}

pub fn news_search_url(q: &str) -> String {
    search_url(q) + NEWS_SUFFIX
}

/// Wikipedia article URL. The title is appended verbatim, without escaping.
pub fn wiki_url(title: &str) -> String {
    format!("{WIKI_BASE}{title}")
}

/// First `src` attribute of the first `<img>` tag in `html`, if any.
pub fn resolve_first_image_url(html: &str) -> Option<String> {
    RE_FIRST_IMG_SRC
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|src| !src.is_empty())
        .map(str::to_string)
}

/// Build the reply text for a parsed command.
///
/// Image searches try to scrape a direct image URL from the results page and
/// fall back to the image-search URL when the fetch fails or nothing matches.
pub async fn build_reply(command: &Command, fetcher: &dyn PageFetcher) -> String {
    let q = command.query.as_str();
    match command.intent {
        Intent::WebSearch | Intent::DefinitionLookup => search_url(q),
        Intent::VideoSearch => video_search_url(q),
        Intent::NewsSearch => news_search_url(q),
        Intent::EncyclopediaLookup => wiki_url(q),
        Intent::ImageSearch => resolve_image(q, fetcher).await,
    }
}

async fn resolve_image(q: &str, fetcher: &dyn PageFetcher) -> String {
    let url = image_search_url(q);

    match fetcher.fetch(&url).await {
        Ok(body) => match resolve_first_image_url(&body) {
            Some(src) => {
                debug!(query = %q, src = %src, "Resolved direct image URL");
                src
            }
            None => {
                debug!(query = %q, "No <img> tag in results page");
                url
            }
        },
        Err(e) => {
            warn!(error = %e, url = %url, "Image page fetch failed, replying with search URL");
            url
        }
    }
}
