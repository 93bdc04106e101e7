use async_trait::async_trait;
use reqwest::{Client, Request, Response};

/// Sends a fully built request. `reqwest::Client` is the production transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error>;
}

#[async_trait]
impl HttpTransport for Client {
    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        Client::execute(self, request).await
    }
}
