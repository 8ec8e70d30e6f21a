use scraper::{ElementRef, Html, Selector};

pub const UNKNOWN_TITLE: &str = "unknown title";
pub const UNKNOWN_GAME: &str = "unknown game";
pub const UNKNOWN_LENGTH: &str = "?";
pub const UNKNOWN_QUEUE_LENGTH: &str = "unknown queue length";

const REQUEST_PREFIX: &str = "This song was requested by";

/// Fields pulled out of the "currently playing" row. `None` means the element
/// was missing or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NowPlayingFragment {
    pub title: Option<String>,
    pub album: Option<String>,
    pub requester: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongEntry {
    pub title: String,
    pub album: String,
    pub requester: String,
    pub length: String,
}

impl Default for SongEntry {
    fn default() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            album: UNKNOWN_GAME.to_string(),
            requester: String::new(),
            length: UNKNOWN_LENGTH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueView {
    pub history: Vec<SongEntry>,
    pub queue: Vec<SongEntry>,
    pub queue_summary: String,
}

impl Default for QueueView {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            queue: Vec::new(),
            queue_summary: UNKNOWN_QUEUE_LENGTH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageData {
    pub now_playing: NowPlayingFragment,
    pub history: Vec<SongEntry>,
    pub queue: Vec<SongEntry>,
    pub queue_summary: String,
}

impl PageData {
    pub fn into_queue_view(self) -> QueueView {
        QueueView {
            history: self.history,
            queue: self.queue,
            queue_summary: self.queue_summary,
        }
    }
}

/// Turns one HTML document into [`PageData`]. Parsing never fails: missing
/// structure degrades to defaults and empty lists.
pub trait PageParser: Send + Sync {
    fn parse_page(&self, document: &str) -> PageData;
}

impl<T: PageParser + ?Sized> PageParser for Box<T> {
    fn parse_page(&self, document: &str) -> PageData {
        (**self).parse_page(document)
    }
}

pub struct SelectorPageParser {
    row: Selector,
    title: Selector,
    album: Selector,
    requester: Selector,
    length: Selector,
    article: Selector,
    summary: Selector,
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

impl Default for SelectorPageParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectorPageParser {
    pub fn new() -> Self {
        Self {
            row: selector("tr.song"),
            title: selector("td div.title"),
            album: selector("td div.album"),
            requester: selector("td i"),
            length: selector("td.length"),
            article: selector("article"),
            summary: selector("summary"),
        }
    }

    fn text_of(&self, scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
        scope
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
    }

    fn requester_of(&self, row: ElementRef<'_>) -> Option<String> {
        row.select(&self.requester).find_map(|el| {
            let text = el.text().collect::<String>();
            if text.trim().is_empty() {
                el.value().attr("title").and_then(clean_requester)
            } else {
                clean_requester(&text)
            }
        })
    }

    fn fragment(&self, row: ElementRef<'_>) -> NowPlayingFragment {
        NowPlayingFragment {
            title: self.text_of(row, &self.title),
            album: self.text_of(row, &self.album),
            requester: self.requester_of(row),
        }
    }

    fn song_entry(&self, row: ElementRef<'_>) -> SongEntry {
        let defaults = SongEntry::default();
        SongEntry {
            title: self.text_of(row, &self.title).unwrap_or(defaults.title),
            album: self.text_of(row, &self.album).unwrap_or(defaults.album),
            requester: self.requester_of(row).unwrap_or(defaults.requester),
            length: self.text_of(row, &self.length).unwrap_or(defaults.length),
        }
    }

    fn entries(&self, section: Option<ElementRef<'_>>) -> Vec<SongEntry> {
        section
            .map(|section| {
                section
                    .select(&self.row)
                    .map(|row| self.song_entry(row))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn top_level_articles<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document
            .select(&self.article)
            .filter(|article| {
                !article
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|parent| parent.value().name() == "article")
            })
            .take(2)
            .collect()
    }
}

impl PageParser for SelectorPageParser {
    fn parse_page(&self, document: &str) -> PageData {
        let document = Html::parse_document(document);

        let now_playing = document
            .select(&self.row)
            .next()
            .map(|row| self.fragment(row))
            .unwrap_or_default();

        let mut sections = self.top_level_articles(&document).into_iter();
        let history_section = sections.next();
        let queue_section = sections.next();

        let queue_summary = queue_section
            .and_then(|section| self.text_of(section, &self.summary))
            .unwrap_or_else(|| UNKNOWN_QUEUE_LENGTH.to_string());

        PageData {
            now_playing,
            history: self.entries(history_section),
            queue: self.entries(queue_section),
            queue_summary,
        }
    }
}

fn clean_requester(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let name = trimmed
        .strip_prefix(REQUEST_PREFIX)
        .unwrap_or(trimmed)
        .trim_start()
        .trim_start_matches(':')
        .trim();
    (!name.is_empty()).then(|| name.to_string())
}
