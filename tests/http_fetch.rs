mod common;

use std::collections::HashMap;
use std::net::TcpListener;

use sumverify::{FetchError, HttpFetcher, VerifyConfig};

use common::serve;

#[test]
fn fetch_url_returns_body() {
    let mut routes = HashMap::new();
    routes.insert("/a.zip".to_string(), b"archive bytes".to_vec());
    let (base, handle) = serve(routes, 1);

    let fetcher = HttpFetcher::new(&VerifyConfig::default()).unwrap();
    let archive = fetcher.fetch_url(&format!("{}/a.zip", base)).unwrap();
    handle.join().unwrap();

    assert_eq!(archive.bytes, b"archive bytes");
    assert!(archive.url.ends_with("/a.zip"));
}

#[test]
fn non_success_status_is_error() {
    let (base, handle) = serve(HashMap::new(), 1);

    let fetcher = HttpFetcher::new(&VerifyConfig::default()).unwrap();
    let err = fetcher.fetch_url(&format!("{}/missing.zip", base)).unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[test]
fn oversized_archive_is_rejected() {
    let mut routes = HashMap::new();
    routes.insert("/big.zip".to_string(), vec![0u8; 4096]);
    let (base, handle) = serve(routes, 1);

    let config = VerifyConfig {
        max_archive_bytes: 1024,
        ..VerifyConfig::default()
    };
    let fetcher = HttpFetcher::new(&config).unwrap();
    let err = fetcher.fetch_url(&format!("{}/big.zip", base)).unwrap_err();
    handle.join().unwrap();

    assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
}

#[test]
fn connection_refused_is_transport_error() {
    // Bind then drop to get a port with nothing listening
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();

    let fetcher = HttpFetcher::new(&VerifyConfig::default()).unwrap();
    let err = fetcher.fetch_url(&format!("http://127.0.0.1:{}/x.zip", port)).unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. }));
}
