use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, Request, Response};

/// Executes prepared HTTP requests. Implemented by [`super::BasicClient`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// Sends a bare GET for `url`. The status is not checked.
    async fn get(&self, url: &str) -> Result<Response> {
        let url = url
            .parse()
            .with_context(|| format!("invalid feed URL '{url}'"))?;
        self.execute(Request::new(Method::GET, url))
            .await
            .context("request failed")
    }
}
