use std::time::Duration;

use futures::stream::{self, Stream, TryStreamExt};
use tracing::debug;

use crate::error::{with_deadline, ReportError, Result};
use crate::store::LogStore;

enum Cursor {
    Start,
    After(String),
    Done,
}

/// Lazily lists every key under `prefix`, one page at a time.
///
/// Pages are requested strictly in order since each request carries the
/// previous page's marker. The stream ends once a page comes back without a
/// marker; the first failed page request ends it with that error.
pub fn enumerate_keys<'a, S: LogStore>(
    store: &'a S,
    prefix: &'a str,
    deadline: Duration,
) -> impl Stream<Item = Result<String>> + 'a {
    stream::try_unfold(Cursor::Start, move |cursor| async move {
        let marker = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::After(marker) => Some(marker),
        };
        let page = with_deadline("list objects", deadline, store.list_page(prefix, marker.as_deref())).await?;
        debug!("listed {} keys under {} (marker {:?})", page.keys.len(), prefix, marker);

        let next = match page.next_marker {
            Some(m) if !m.is_empty() => Cursor::After(m),
            _ => Cursor::Done,
        };
        let keys = stream::iter(page.keys.into_iter().map(Ok::<String, ReportError>));
        Ok::<_, ReportError>(Some((keys, next)))
    })
    .try_flatten()
}
