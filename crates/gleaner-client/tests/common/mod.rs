#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use gleaner_client::ReqwestFetcher;
use tokio::net::TcpListener;

pub const SAMPLE_PAGE: &str = "<html><head><title>Sample</title></head><body><p>Hello world</p></body></html>";

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A fetcher that ignores proxy settings from the environment.
pub fn local_fetcher() -> ReqwestFetcher {
    let client = reqwest::Client::builder()
        .no_proxy()
        .connect_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    ReqwestFetcher::with_client(client)
}

/// A localhost URL nothing is listening on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}
