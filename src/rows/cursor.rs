//! Generic bounded pagination cursor.
//!
//! Each entity adapter supplies only how to fetch the next page and how to
//! project one item; the engine supplies iteration, the fetch ceiling and
//! row-limit enforcement uniformly.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::rows::{Cell, Rows};
use crate::store::Page;

/// Hard ceiling on page fetches per cursor. A backend that keeps returning
/// pages without ever signaling exhaustion is a fatal error, not a retry.
pub const MAX_LOAD_ATTEMPTS: u32 = 100;

/// Loading and projection strategy for one entity kind.
#[async_trait]
pub trait PageSource: Send {
    type Item: Send + Sync;

    /// Output column names, in projection order.
    fn columns(&self) -> Vec<String>;

    /// Fetch the page after `page_token` (`None` for the first page).
    async fn load(&mut self, page_token: Option<&str>) -> Result<Page<Self::Item>>;

    /// Project one backend item into output cells.
    fn pick(&self, item: &Self::Item) -> Vec<Cell>;
}

/// Pull-based cursor over a [`PageSource`].
///
/// Pages advance monotonically; an exhausted page is never re-fetched. A row
/// limit of zero means unlimited. Once the limit is reached no further page
/// fetch is issued.
pub struct Cursor<S: PageSource> {
    source: S,
    columns: Vec<String>,
    page: Option<Page<S::Item>>,
    seek: usize,
    count: i64,
    limit: i64,
    fetches: u32,
}

impl<S: PageSource> Cursor<S> {
    pub fn new(source: S) -> Cursor<S> {
        Cursor::with_limit(source, 0)
    }

    pub fn with_limit(source: S, limit: i64) -> Cursor<S> {
        let columns = source.columns();
        Cursor {
            source,
            columns,
            page: None,
            seek: 0,
            count: 0,
            limit,
            fetches: 0,
        }
    }

    /// Box the cursor for the object-safe row contract.
    pub fn boxed(self) -> Box<dyn Rows>
    where
        S: 'static,
    {
        Box::new(self)
    }
}

#[async_trait]
impl<S: PageSource> Rows for Cursor<S> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next(&mut self) -> Result<Option<Vec<Cell>>> {
        loop {
            if self.limit > 0 && self.count >= self.limit {
                return Ok(None);
            }
            if let Some(page) = &self.page {
                if self.seek < page.items.len() {
                    let row = self.source.pick(&page.items[self.seek]);
                    self.seek += 1;
                    self.count += 1;
                    return Ok(Some(row));
                }
                if !page.has_more {
                    return Ok(None);
                }
            }
            if self.fetches >= MAX_LOAD_ATTEMPTS {
                return Err(Error::ExcessiveLoad(MAX_LOAD_ATTEMPTS));
            }
            self.fetches += 1;
            let token = self.page.as_ref().and_then(|p| p.page_token.clone());
            let page = self.source.load(token.as_deref()).await?;
            if page.items.is_empty() {
                return Ok(None);
            }
            self.seek = 0;
            self.page = Some(page);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted source: yields the prepared pages in order, then repeats the
    /// last one forever if `sticky` is set.
    struct ScriptedSource {
        pages: Vec<Page<i64>>,
        served: usize,
        sticky: bool,
        loads: u32,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Page<i64>>) -> ScriptedSource {
            ScriptedSource {
                pages,
                served: 0,
                sticky: false,
                loads: 0,
            }
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        type Item = i64;

        fn columns(&self) -> Vec<String> {
            vec!["n".to_string()]
        }

        async fn load(&mut self, _page_token: Option<&str>) -> Result<Page<i64>> {
            self.loads += 1;
            let idx = self.served.min(self.pages.len().saturating_sub(1));
            if self.served >= self.pages.len() && !self.sticky {
                return Ok(Page::empty());
            }
            self.served += 1;
            Ok(self.pages[idx].clone())
        }

        fn pick(&self, item: &i64) -> Vec<Cell> {
            vec![Cell::Int(*item)]
        }
    }

    fn page(items: Vec<i64>, has_more: bool, token: &str) -> Page<i64> {
        Page {
            total: items.len() as i64,
            items,
            has_more,
            page_token: Some(token.to_string()),
        }
    }

    #[tokio::test]
    async fn test_terminates_when_has_more_clears() {
        let source = ScriptedSource::new(vec![
            page(vec![1, 2], true, "p1"),
            page(vec![3], false, "p2"),
        ]);
        let mut cursor = Cursor::new(source);
        let mut rows = Vec::new();
        // Two pages: all rows arrive within N+1 = 3 yields plus the final None.
        while let Some(row) = cursor.next().await.unwrap() {
            rows.push(row);
        }
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec![Cell::Int(3)]);
    }

    #[tokio::test]
    async fn test_empty_page_terminates() {
        let source = ScriptedSource::new(vec![]);
        let mut cursor = Cursor::new(source);
        assert_eq!(cursor.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_misbehaving_backend_hits_ceiling() {
        let mut source = ScriptedSource::new(vec![page(vec![1], true, "again")]);
        source.sticky = true;
        let mut cursor = Cursor::new(source);
        let mut yielded = 0;
        let err = loop {
            match cursor.next().await {
                Ok(Some(_)) => yielded += 1,
                Ok(None) => panic!("cursor terminated without error"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, Error::ExcessiveLoad(MAX_LOAD_ATTEMPTS)));
        // one row per fetched page, exactly 100 fetches served
        assert_eq!(yielded, MAX_LOAD_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn test_limit_stops_without_further_fetch() {
        let source = ScriptedSource::new(vec![
            page(vec![1, 2], true, "p1"),
            page(vec![3, 4, 5], false, "p2"),
        ]);
        let mut cursor = Cursor::with_limit(source, 2);
        assert!(cursor.next().await.unwrap().is_some());
        assert!(cursor.next().await.unwrap().is_some());
        assert_eq!(cursor.next().await.unwrap(), None);
        assert_eq!(cursor.source.loads, 1);
    }

    #[tokio::test]
    async fn test_limit_spanning_pages() {
        let source = ScriptedSource::new(vec![
            page(vec![1, 2], true, "p1"),
            page(vec![3, 4, 5], false, "p2"),
        ]);
        let mut cursor = Cursor::with_limit(source, 3);
        let mut rows = Vec::new();
        while let Some(row) = cursor.next().await.unwrap() {
            rows.push(row);
        }
        assert_eq!(rows.len(), 3);
    }
}
