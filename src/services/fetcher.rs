use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::Document;

/// Only articles are counted; the type filter is not configurable.
pub const DOCUMENT_TYPE: &str = "article";

/// Optional filters for a full list fetch.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub updated_after: Option<String>,
    pub location: Option<String>,
}

/// Query for a single page of the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page_cursor: Option<String>,
    pub updated_after: Option<String>,
    pub location: Option<String>,
}

impl ListQuery {
    /// Query pairs in the order the endpoint receives them.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs: Vec<(&'static str, &str)> = vec![("type", DOCUMENT_TYPE)];
        if let Some(cursor) = &self.page_cursor {
            pairs.push(("pageCursor", cursor.as_str()));
        }
        if let Some(updated_after) = &self.updated_after {
            pairs.push(("updatedAfter", updated_after.as_str()));
        }
        if let Some(location) = &self.location {
            pairs.push(("location", location.as_str()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListPage {
    pub results: Vec<Document>,
    #[serde(rename = "nextPageCursor", default)]
    pub next_page_cursor: Option<String>,
}

/// Fetches one page of documents.
#[async_trait]
pub trait ListTransport: Send + Sync {
    async fn list_page(&self, token: &str, query: &ListQuery) -> Result<ListPage>;
}

/// Waits between requests.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

#[async_trait]
impl<T: ListTransport + ?Sized> ListTransport for Arc<T> {
    async fn list_page(&self, token: &str, query: &ListQuery) -> Result<ListPage> {
        (**self).list_page(token, query).await
    }
}

#[async_trait]
impl<P: Pause + ?Sized> Pause for Arc<P> {
    async fn pause(&self, duration: Duration) {
        (**self).pause(duration).await
    }
}

pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Pulls the complete document list, one page at a time.
pub struct DocumentFetcher<T, P = TokioPause> {
    transport: T,
    pause: P,
    delay: Duration,
}

impl<T: ListTransport, P: Pause> DocumentFetcher<T, P> {
    pub fn with_pause(transport: T, pause: P, delay: Duration) -> Self {
        Self {
            transport,
            pause,
            delay,
        }
    }

    /// Fetch every matching document, following `nextPageCursor` until the
    /// server stops returning one.
    ///
    /// Without a token this returns an empty list and never touches the
    /// network. Pages are requested strictly one after another and the
    /// configured delay is observed before each request, the first one
    /// included. Any failed page aborts the whole fetch.
    pub async fn fetch_documents(
        &self,
        token: Option<&str>,
        filter: &ListFilter,
    ) -> Result<Vec<Document>> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Vec::new());
        };

        let mut documents = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let query = ListQuery {
                page_cursor: cursor.take(),
                updated_after: filter.updated_after.clone(),
                location: filter.location.clone(),
            };
            tracing::debug!("Requesting document list page with {:?}", query.pairs());

            self.pause.pause(self.delay).await;

            let page = self.transport.list_page(token, &query).await?;
            pages += 1;
            tracing::debug!("Page {} returned {} documents", pages, page.results.len());
            documents.extend(page.results);

            match page.next_page_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        tracing::info!("Fetched {} documents in {} pages", documents.len(), pages);
        Ok(documents)
    }
}
