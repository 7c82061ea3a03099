use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};

use super::fetcher::{ListPage, ListQuery, ListTransport};

const USER_AGENT_STRING: &str = concat!("readwise-stats/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Reader document list endpoint.
pub struct ReadwiseClient {
    client: Client,
    list_url: Url,
}

impl ReadwiseClient {
    pub fn new(list_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT_STRING)
            .build()?;
        Self::with_client(client, list_url)
    }

    pub fn with_client(client: Client, list_url: &str) -> Result<Self> {
        let list_url = Url::parse(list_url)?;
        Ok(Self { client, list_url })
    }

    /// Full request URL for a page query.
    pub fn page_url(&self, query: &ListQuery) -> Url {
        let mut url = self.list_url.clone();
        url.query_pairs_mut().extend_pairs(query.pairs());
        url
    }
}

#[async_trait]
impl ListTransport for ReadwiseClient {
    async fn list_page(&self, token: &str, query: &ListQuery) -> Result<ListPage> {
        let response = self
            .client
            .get(self.page_url(query))
            .header(AUTHORIZATION, format!("Token {}", token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("Readwise list request failed with {}", status);
            return Err(AppError::ReadwiseApi(format!("HTTP {}: {}", status, error_text)));
        }

        let page: ListPage = response.json().await?;
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use crate::config::READWISE_LIST_URL;

    /// Serves one canned response on a local port and hands back the raw
    /// request head it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{}/api/v3/list/", addr), handle)
    }

    fn local_client(url: &str) -> ReadwiseClient {
        let client = Client::builder().no_proxy().build().unwrap();
        ReadwiseClient::with_client(client, url).unwrap()
    }

    fn header<'a>(request: &'a str, name: &str) -> Option<&'a str> {
        request
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
    }

    #[tokio::test]
    async fn sends_token_header_and_decodes_page() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"count":1,"nextPageCursor":"c2","results":[{"id":"a","location":"archive"}]}"#,
        )
        .await;
        let client = local_client(&url);

        let page = client
            .list_page(
                "tok",
                &ListQuery {
                    page_cursor: Some("c1".to_string()),
                    updated_after: None,
                    location: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(page.next_page_cursor.as_deref(), Some("c2"));
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, "a");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/v3/list/?type=article&pageCursor=c1 HTTP/1.1\r\n"));
        assert_eq!(header(&request, "authorization"), Some("Token tok"));
    }

    #[tokio::test]
    async fn error_status_becomes_api_error() {
        let (url, server) = serve_once("429 Too Many Requests", r#"{"detail":"slow down"}"#).await;
        let client = local_client(&url);

        let err = client
            .list_page(
                "tok",
                &ListQuery {
                    page_cursor: None,
                    updated_after: None,
                    location: None,
                },
            )
            .await
            .unwrap_err();

        match err {
            AppError::ReadwiseApi(message) => {
                assert!(message.starts_with("HTTP 429"), "{}", message);
                assert!(message.contains("slow down"), "{}", message);
            }
            other => panic!("expected ReadwiseApi, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[test]
    fn first_page_url_has_only_the_type_filter() {
        let client = ReadwiseClient::new(READWISE_LIST_URL).unwrap();
        let url = client.page_url(&ListQuery {
            page_cursor: None,
            updated_after: None,
            location: None,
        });
        assert_eq!(url.as_str(), "https://readwise.io/api/v3/list/?type=article");
    }

    #[test]
    fn cursor_and_filters_are_encoded() {
        let client = ReadwiseClient::new(READWISE_LIST_URL).unwrap();
        let url = client.page_url(&ListQuery {
            page_cursor: Some("01abc".to_string()),
            updated_after: Some("2026-01-01T00:00:00+00:00".to_string()),
            location: Some("archive".to_string()),
        });
        assert_eq!(
            url.as_str(),
            "https://readwise.io/api/v3/list/?type=article&pageCursor=01abc\
             &updatedAfter=2026-01-01T00%3A00%3A00%2B00%3A00&location=archive"
        );
    }

    #[test]
    fn page_without_cursor_field_is_last() {
        let page: ListPage = serde_json::from_str(r#"{"count": 1, "results": []}"#).unwrap();
        assert!(page.next_page_cursor.is_none());
        let page: ListPage =
            serde_json::from_str(r#"{"results": [], "nextPageCursor": null}"#).unwrap();
        assert!(page.next_page_cursor.is_none());
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(ReadwiseClient::new("not a url").is_err());
    }
}
