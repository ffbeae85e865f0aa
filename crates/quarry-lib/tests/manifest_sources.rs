use quarry_lib::manifest::{read_source, MANIFEST_NAMESPACE};
use quarry_lib::net::HttpFetcher;
use quarry_lib::{Manifest, ManifestError, Packing};
use reqwest::Client;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn base_manifest() -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns="{MANIFEST_NAMESPACE}">
  <name>Minecraft</name>
  <id><root>base</root><value>minecraft</value></id>
  <versions>
    <version>
      <url>http://files.example/minecraft.jar</url>
      <ver>1.6.4</ver>
      <packing>base</packing>
    </version>
  </versions>
</manifest>"#
    )
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn reads_manifest_over_http() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifests/minecraft.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(base_manifest()))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Client::new());
    let doc = read_source(&format!("{}/manifests/minecraft.xml", server.uri()), &fetcher)
        .await
        .expect("manifest fetched");
    let manifest = Manifest::from_document(&doc).expect("manifest decoded");

    assert_eq!(manifest.id.to_string(), "base:minecraft");
    assert_eq!(manifest.url, None);
    assert_eq!(manifest.versions.len(), 1);
    assert_eq!(manifest.versions[0].packing, Packing::Base);
}

#[tokio::test]
async fn reads_manifest_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("minecraft.xml");
    std::fs::write(&file, base_manifest()).unwrap();

    let fetcher = HttpFetcher::new(Client::new());
    let doc = read_source(file.to_str().unwrap(), &fetcher).await.unwrap();
    assert_eq!(doc.name, "manifest");
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let fetcher = HttpFetcher::new(Client::new());
    let err = read_source("/definitely/not/here.xml", &fetcher)
        .await
        .unwrap_err();
    assert!(matches!(err, ManifestError::Io { .. }));
}
