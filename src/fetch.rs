use std::time::Duration;

use crate::{
    error::FetchError,
    page::{NowPlayingFragment, PageData, PageParser, QueueView, SongEntry},
};

pub const METADATA_PAGE_URL: &str = "https://viviwebsite.net";
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub trait PageSource: Send + Sync {
    fn fetch(&self) -> Result<String, FetchError>;
}

impl<T: PageSource + ?Sized> PageSource for Box<T> {
    fn fetch(&self) -> Result<String, FetchError> {
        (**self).fetch()
    }
}

pub struct HttpPageSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpPageSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vgm-radio-widget/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn metadata_page() -> Result<Self, FetchError> {
        Self::new(METADATA_PAGE_URL, FETCH_TIMEOUT)
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self) -> Result<String, FetchError> {
        let response = self.client.get(self.url.as_str()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.text()?)
    }
}

pub type DynFetcher = MetadataFetcher<Box<dyn PageSource>, Box<dyn PageParser>>;

pub struct MetadataFetcher<S, P> {
    source: S,
    parser: P,
}

impl<S: PageSource, P: PageParser> MetadataFetcher<S, P> {
    pub fn new(source: S, parser: P) -> Self {
        Self { source, parser }
    }

    pub fn fetch_page(&self) -> Result<PageData, FetchError> {
        let document = self.source.fetch()?;
        Ok(self.parser.parse_page(&document))
    }

    pub fn fetch_now_playing(&self) -> Result<NowPlayingFragment, FetchError> {
        self.fetch_page().map(|page| page.now_playing)
    }

    pub fn fetch_queue_view(&self) -> Result<QueueView, FetchError> {
        self.fetch_page().map(PageData::into_queue_view)
    }

    pub fn fetch_history(&self) -> Result<Vec<SongEntry>, FetchError> {
        self.fetch_page().map(|page| page.history)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;

    /// Serves canned documents in order; an exhausted script fails with a 503.
    pub struct ScriptedSource {
        responses: Mutex<VecDeque<Result<String, reqwest::StatusCode>>>,
    }

    impl ScriptedSource {
        pub fn new(responses: Vec<Result<&str, reqwest::StatusCode>>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
            }
        }
    }

    impl PageSource for ScriptedSource {
        fn fetch(&self) -> Result<String, FetchError> {
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(reqwest::StatusCode::SERVICE_UNAVAILABLE));
            next.map_err(FetchError::Status)
        }
    }
}
