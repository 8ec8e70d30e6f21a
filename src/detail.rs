use log::warn;

use crate::{
    fetch::{MetadataFetcher, PageSource},
    page::{PageParser, QueueView, SongEntry},
};

const NO_REQUEST: &str = "no request";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailView {
    Full(QueueView),
    /// The full request failed; a second fetch could only deliver the history.
    HistoryOnly {
        history: Vec<SongEntry>,
        reason: String,
    },
    Unavailable {
        reason: String,
    },
}

impl DetailView {
    pub fn history(&self) -> &[SongEntry] {
        match self {
            DetailView::Full(view) => &view.history,
            DetailView::HistoryOnly { history, .. } => history,
            DetailView::Unavailable { .. } => &[],
        }
    }

    pub fn queue(&self) -> Option<&QueueView> {
        match self {
            DetailView::Full(view) => Some(view),
            _ => None,
        }
    }

    pub fn notice(&self) -> Option<String> {
        match self {
            DetailView::Full(_) => None,
            DetailView::HistoryOnly { reason, .. } => {
                Some(format!("Queue unavailable, showing history only ({reason})"))
            }
            DetailView::Unavailable { reason } => {
                Some(format!("Queue and history could not be loaded ({reason})"))
            }
        }
    }
}

pub fn load_detail<S: PageSource, P: PageParser>(fetcher: &MetadataFetcher<S, P>) -> DetailView {
    let first_err = match fetcher.fetch_queue_view() {
        Ok(view) => return DetailView::Full(view),
        Err(err) => err,
    };
    warn!("queue view fetch failed: {first_err}");

    match fetcher.fetch_history() {
        Ok(history) => DetailView::HistoryOnly {
            history,
            reason: first_err.to_string(),
        },
        Err(err) => {
            warn!("history fallback fetch failed: {err}");
            DetailView::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}

pub fn format_entry(ordinal: usize, entry: &SongEntry) -> String {
    let requester = if entry.requester.is_empty() {
        NO_REQUEST
    } else {
        entry.requester.as_str()
    };
    format!(
        "{ordinal}. {} | {} | {requester} | {}",
        entry.title, entry.album, entry.length
    )
}

pub fn history_heading(view: &DetailView) -> String {
    format!("History ({})", view.history().len())
}

pub fn queue_heading(queue: &QueueView) -> String {
    format!("Queue ({}) - {}", queue.queue.len(), queue.queue_summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fetch::testing::ScriptedSource, page::SelectorPageParser};

    const HISTORY_ONLY_PAGE: &str = r#"
        <article><table>
          <tr class="song"><td><div class="title">Aria</div></td><td class="length">3:12</td></tr>
        </table></article>
    "#;

    fn fetcher(
        responses: Vec<Result<&str, reqwest::StatusCode>>,
    ) -> MetadataFetcher<ScriptedSource, SelectorPageParser> {
        MetadataFetcher::new(ScriptedSource::new(responses), SelectorPageParser::new())
    }

    #[test]
    fn full_view_when_fetch_succeeds() {
        let view = load_detail(&fetcher(vec![Ok(HISTORY_ONLY_PAGE)]));
        let queue = view.queue().expect("full view");
        assert_eq!(queue.history.len(), 1);
        assert_eq!(queue.history[0].title, "Aria");
        assert_eq!(queue.history[0].length, "3:12");
        assert!(queue.queue.is_empty());
        assert_eq!(queue_heading(queue), "Queue (0) - unknown queue length");
        assert_eq!(view.notice(), None);
    }

    #[test]
    fn falls_back_to_history_on_first_failure() {
        let view = load_detail(&fetcher(vec![
            Err(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            Ok(HISTORY_ONLY_PAGE),
        ]));
        assert!(matches!(view, DetailView::HistoryOnly { .. }));
        assert_eq!(view.history().len(), 1);
        assert!(view.queue().is_none());
        assert!(view.notice().unwrap().contains("history only"));
    }

    #[test]
    fn second_failure_is_reported_not_swallowed() {
        let view = load_detail(&fetcher(vec![
            Err(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            Err(reqwest::StatusCode::BAD_GATEWAY),
        ]));
        assert!(matches!(view, DetailView::Unavailable { .. }));
        assert!(view.history().is_empty());
        assert!(view.notice().unwrap().contains("502"));
    }

    #[test]
    fn entry_uses_placeholder_for_missing_requester() {
        let entry = SongEntry {
            title: "Aria".into(),
            length: "3:12".into(),
            ..SongEntry::default()
        };
        assert_eq!(
            format_entry(1, &entry),
            "1. Aria | unknown game | no request | 3:12"
        );

        let requested = SongEntry {
            requester: "Celes".into(),
            ..entry
        };
        assert_eq!(
            format_entry(2, &requested),
            "2. Aria | unknown game | Celes | 3:12"
        );
    }
}
