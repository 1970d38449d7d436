use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::request::RequestOptions;
use crate::ApiClient;

const DEFAULT_ITEM_KEYS: [&str; 3] = ["values", "results", "data"];
const DEFAULT_NEXT_POINTERS: [&str; 4] = ["/next", "/_links/next", "/links/next", "/metadata/next"];

/// One fetched page and the cursor for the page after it.
#[derive(Debug, Clone)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

#[async_trait]
pub trait Paginator<T>: Sync {
    /// Position of a page: a start offset, a next link, ...
    type Cursor: Clone + PartialEq + fmt::Debug + Send + Sync;

    /// Cursor naming the first page, if it has one. A link back to it ends
    /// the walk like any other repeated cursor.
    fn first_cursor(&self) -> Option<Self::Cursor> {
        None
    }

    /// Fetches the page at `cursor`, or the first page when `None`.
    async fn fetch_page(&self, cursor: Option<Self::Cursor>) -> Result<Page<T, Self::Cursor>>;

    /// Walks every page and returns the flattened items.
    fn fetch_all<'a>(&'a self) -> BoxFuture<'a, Result<Vec<T>>>
    where
        T: Send + 'a,
        Self: Sized,
    {
        collect_pages(self, None).boxed()
    }

    fn stream<'a>(&'a self) -> Pin<Box<dyn Stream<Item = Result<Vec<T>>> + Send + 'a>>
    where
        T: Send + 'a,
    {
        Box::pin(async_stream::stream! {
            let mut cursor = None;
            let mut seen: Vec<Self::Cursor> = self.first_cursor().into_iter().collect();

            loop {
                match self.fetch_page(cursor.clone()).await {
                    Ok(page) => {
                        let next = advance(&mut seen, page.next);
                        yield Ok(page.items);

                        match next {
                            Some(next) => cursor = Some(next),
                            None => break,
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        })
    }
}

/// Records `next` and returns it, unless that page was already consumed.
fn advance<C: PartialEq + Clone + fmt::Debug>(seen: &mut Vec<C>, next: Option<C>) -> Option<C> {
    let next = next?;
    if seen.contains(&next) {
        warn!(cursor = ?next, "Pagination cursor repeated; stopping walk");
        return None;
    }
    seen.push(next.clone());
    Some(next)
}

pub async fn collect_pages<T, P: Paginator<T>>(paginator: &P, limit: Option<usize>) -> Result<Vec<T>>
where
    T: Send,
{
    let mut stream = paginator.stream();
    let mut all_items = Vec::new();

    while let Some(result) = stream.next().await {
        let items = result?;
        all_items.extend(items);

        if let Some(limit) = limit {
            if all_items.len() >= limit {
                all_items.truncate(limit);
                break;
            }
        }
    }

    debug!(total_items = all_items.len(), "Finished pagination");
    Ok(all_items)
}

/// Offset walk driven by `isLastPage` / `nextPageStart`
/// (Bitbucket Server, Service Desk, Jira Agile).
pub struct OffsetPaginator<'a, T> {
    client: &'a ApiClient,
    path: String,
    options: RequestOptions,
    start_param: &'static str,
    items_key: Option<&'static str>,
    advance_by_count: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> OffsetPaginator<'a, T> {
    pub fn new(client: &'a ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            options: RequestOptions::default(),
            start_param: "start",
            items_key: None,
            advance_by_count: false,
            _marker: PhantomData,
        }
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Query parameter carrying the offset (`start`, `startAt`, ...).
    pub fn start_param(mut self, name: &'static str) -> Self {
        self.start_param = name;
        self
    }

    pub fn page_size(mut self, limit: u32) -> Self {
        self.options = self.options.with_query_replaced("limit", limit);
        self
    }

    /// Envelope key (or JSON pointer) holding the items.
    pub fn items_key(mut self, key: &'static str) -> Self {
        self.items_key = Some(key);
        self
    }

    /// For envelopes without `nextPageStart` (Jira Agile `startAt`/`isLast`):
    /// the next offset is the current one plus the items received.
    pub fn advance_by_count(mut self) -> Self {
        self.advance_by_count = true;
        self
    }
}

#[async_trait]
impl<'a, T> Paginator<T> for OffsetPaginator<'a, T>
where
    T: DeserializeOwned + Send,
{
    type Cursor = u64;

    fn first_cursor(&self) -> Option<u64> {
        Some(0)
    }

    async fn fetch_page(&self, cursor: Option<u64>) -> Result<Page<T, u64>> {
        let start = cursor.unwrap_or(0);
        let options = self.options.with_query_replaced(self.start_param, start);

        debug!(path = %self.path, start, "Fetching page");
        let mut envelope: Value = self.client.get_with(&self.path, &options).await?;

        let Some(items) = take_items(&mut envelope, self.items_key) else {
            debug!(path = %self.path, start, "Page carries no values; nothing to collect");
            return Ok(Page {
                items: Vec::new(),
                next: None,
            });
        };

        let is_last = envelope
            .get("isLastPage")
            .or_else(|| envelope.get("isLast"))
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let next_start = envelope.get("nextPageStart").and_then(Value::as_u64).or_else(|| {
            (self.advance_by_count && !items.is_empty()).then(|| start + items.len() as u64)
        });

        let next = if is_last {
            None
        } else {
            match next_start {
                Some(next) if next > start => Some(next),
                Some(next) => {
                    warn!(path = %self.path, start, next, "nextPageStart does not advance; stopping walk");
                    None
                }
                None => {
                    warn!(
                        path = %self.path,
                        start,
                        "Page is not the last one but has no nextPageStart; returning partial results"
                    );
                    None
                }
            }
        };

        Ok(Page {
            items: parse_items(items)?,
            next,
        })
    }
}

/// Link-following walk driven by a `next` URL (Bitbucket Cloud, Confluence
/// `_links.next`, Tempo `metadata.next`, admin API `links.next`).
pub struct CursorPaginator<'a, T> {
    client: &'a ApiClient,
    path: String,
    options: RequestOptions,
    items_key: Option<&'static str>,
    next_pointer: Option<&'static str>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> CursorPaginator<'a, T> {
    pub fn new(client: &'a ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            options: RequestOptions::default(),
            items_key: None,
            next_pointer: None,
            _marker: PhantomData,
        }
    }

    /// Options for the first request; later requests take their query from the link.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn items_key(mut self, key: &'static str) -> Self {
        self.items_key = Some(key);
        self
    }

    /// JSON pointer to the next link, e.g. `/_links/next`.
    pub fn next_pointer(mut self, pointer: &'static str) -> Self {
        self.next_pointer = Some(pointer);
        self
    }
}

#[async_trait]
impl<'a, T> Paginator<T> for CursorPaginator<'a, T>
where
    T: DeserializeOwned + Send,
{
    /// Cursors are paths relative to the base URL, query included.
    type Cursor = String;

    fn first_cursor(&self) -> Option<String> {
        let context = self.client.context();
        let url = context.endpoint(&self.path, &self.options.query).ok()?;
        Some(context.relative_path(url.as_str()))
    }

    async fn fetch_page(&self, cursor: Option<String>) -> Result<Page<T, String>> {
        let mut envelope: Value = match &cursor {
            None => {
                debug!(path = %self.path, "Fetching first page");
                self.client.get_with(&self.path, &self.options).await?
            }
            Some(path) => {
                debug!(path = %path, "Following next link");
                let options = RequestOptions {
                    query: Vec::new(),
                    ..self.options.clone()
                };
                self.client.get_with(path, &options).await?
            }
        };

        let context = self.client.context();
        let next = next_link(&envelope, self.next_pointer).and_then(|link| {
            if context.shares_origin(&link) {
                Some(context.relative_path(&link))
            } else {
                warn!(path = %self.path, link = %link, "Next link leaves the configured site; stopping walk");
                None
            }
        });
        let items = take_items(&mut envelope, self.items_key).unwrap_or_default();

        Ok(Page {
            items: parse_items(items)?,
            next,
        })
    }
}

fn take_items(envelope: &mut Value, key: Option<&str>) -> Option<Vec<Value>> {
    let slot = match key {
        Some(pointer) if pointer.starts_with('/') => envelope.pointer_mut(pointer),
        Some(key) => envelope.get_mut(key),
        None => {
            let key = DEFAULT_ITEM_KEYS
                .iter()
                .find(|k| envelope.get(**k).is_some())?;
            envelope.get_mut(*key)
        }
    }?;

    match slot.take() {
        Value::Array(items) => Some(items),
        _ => Some(Vec::new()),
    }
}

fn next_link(envelope: &Value, pointer: Option<&str>) -> Option<String> {
    let link = match pointer {
        Some(pointer) => envelope.pointer(pointer),
        None => DEFAULT_NEXT_POINTERS
            .iter()
            .find_map(|p| envelope.pointer(p).filter(|v| !v.is_null())),
    }?;

    let href = match link {
        Value::String(s) => s.as_str(),
        Value::Object(_) => link.get("href")?.as_str()?,
        _ => return None,
    };

    if href.is_empty() {
        None
    } else {
        Some(href.to_string())
    }
}

fn parse_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| ApiError::Decode(format!("unexpected item shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_items_default_keys() {
        let mut env = json!({"values": [1, 2], "isLastPage": true});
        assert_eq!(take_items(&mut env, None), Some(vec![json!(1), json!(2)]));

        let mut env = json!({"results": [3]});
        assert_eq!(take_items(&mut env, None), Some(vec![json!(3)]));

        let mut env = json!({"size": 0});
        assert_eq!(take_items(&mut env, None), None);
    }

    #[test]
    fn test_take_items_pointer() {
        let mut env = json!({"_embedded": {"addons": [{"key": "a"}]}});
        assert_eq!(
            take_items(&mut env, Some("/_embedded/addons")),
            Some(vec![json!({"key": "a"})])
        );
    }

    #[test]
    fn test_next_link_shapes() {
        assert_eq!(
            next_link(&json!({"next": "https://x/2.0/r?page=2"}), None),
            Some("https://x/2.0/r?page=2".to_string())
        );
        assert_eq!(
            next_link(&json!({"_links": {"next": "/rest/api/content?start=25"}}), None),
            Some("/rest/api/content?start=25".to_string())
        );
        assert_eq!(
            next_link(&json!({"metadata": {"count": 1, "next": "https://api.tempo.io/core/3/worklogs?offset=50"}}), None),
            Some("https://api.tempo.io/core/3/worklogs?offset=50".to_string())
        );
        assert_eq!(
            next_link(&json!({"_links": {"next": {"href": "/rest/2/addons?offset=10"}}}), None),
            Some("/rest/2/addons?offset=10".to_string())
        );
        assert_eq!(next_link(&json!({"next": null, "links": {}}), None), None);
        assert_eq!(next_link(&json!({"next": ""}), None), None);
    }

    #[test]
    fn test_advance_rejects_repeats() {
        let mut seen = Vec::new();
        assert_eq!(advance(&mut seen, Some(25u64)), Some(25));
        assert_eq!(advance(&mut seen, Some(50u64)), Some(50));
        assert_eq!(advance(&mut seen, Some(25u64)), None);
        assert_eq!(advance::<u64>(&mut seen, None), None);
    }
}
