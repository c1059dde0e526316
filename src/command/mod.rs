use std::fmt;

/// Marker that turns any message into a definition lookup ("X とは?").
pub const DEFINITION_MARKER: &str = "とは?";

const IMAGE_ALIASES: &[&str] = &["img", "IMG", "I", "画像"];
const VIDEO_ALIASES: &[&str] = &["mov", "MOV", "M", "動画"];
const SEARCH_ALIASES: &[&str] = &["search", "S", "ggr", "検索", "ググる"];
const NEWS_ALIASES: &[&str] = &["news", "News", "ニュース"];
const WIKI_ALIASES: &[&str] = &[
    "wikipedia",
    "wiki",
    "Wikipedia",
    "Wiki",
    "W",
    "ウィキペディア",
    "ウィキ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    DefinitionLookup,
    ImageSearch,
    VideoSearch,
    WebSearch,
    NewsSearch,
    EncyclopediaLookup,
}

impl Intent {
    /// Resolve a leading command token. Matching is case-sensitive.
    fn from_alias(token: &str) -> Option<Self> {
        [
            (IMAGE_ALIASES, Intent::ImageSearch),
            (VIDEO_ALIASES, Intent::VideoSearch),
            (SEARCH_ALIASES, Intent::WebSearch),
            (NEWS_ALIASES, Intent::NewsSearch),
            (WIKI_ALIASES, Intent::EncyclopediaLookup),
        ]
        .into_iter()
        .find(|(aliases, _)| aliases.contains(&token))
        .map(|(_, intent)| intent)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Intent::DefinitionLookup => "definition",
            Intent::ImageSearch => "image",
            Intent::VideoSearch => "video",
            Intent::WebSearch => "search",
            Intent::NewsSearch => "news",
            Intent::EncyclopediaLookup => "wikipedia",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub intent: Intent,
    pub query: String,
}

impl Command {
    fn new(intent: Intent, query: impl Into<String>) -> Self {
        Self { intent, query: query.into() }
    }
}

/// Classify a chat message. `None` means the message gets no reply.
///
/// The definition marker wins over everything else. Otherwise the text is
/// split on single spaces and the first token must be a known alias followed
/// by at least one more token. Wikipedia lookups take only the second token;
/// every other intent rejoins the remaining tokens with single spaces.
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();

    if let Some(idx) = text.find(DEFINITION_MARKER) {
        return Some(Command::new(Intent::DefinitionLookup, &text[..idx]));
    }

    let tokens: Vec<&str> = text.split(' ').collect();
    if tokens.len() < 2 {
        return None;
    }

    let intent = Intent::from_alias(tokens[0])?;
    let query = match intent {
        Intent::EncyclopediaLookup => tokens[1].to_string(),
        _ => tokens[1..].join(" "),
    };

    Some(Command::new(intent, query))
}
