//! Paginated bucket listing exposed as a stream of keys.

use futures::stream::{self, Stream, TryStreamExt};

use super::{ObjectStore, StoreError, StoreResult};

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Streams every key in the bucket, fetching pages lazily.
///
/// Each call starts again from the first page. The stream ends after the page
/// that carries no continuation token, and yields the first listing error.
pub fn object_keys<S>(store: &S) -> impl Stream<Item = StoreResult<String>> + Send + '_
where
    S: ObjectStore + ?Sized,
{
    stream::try_unfold(Cursor::Start, move |cursor| async move {
        let continuation = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
        };

        let page = store.list_objects(continuation).await?;
        let next = match page.next_continuation {
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };

        let keys = stream::iter(page.keys.into_iter().map(Ok::<String, StoreError>));
        Ok::<_, StoreError>(Some((keys, next)))
    })
    .try_flatten()
}
