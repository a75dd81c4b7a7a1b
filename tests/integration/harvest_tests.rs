//! Integration tests for the harvester
//!
//! These tests use wiremock to serve sitemaps and product pages and run the
//! full harvest cycle end-to-end against an on-disk database.

use catalogue_harvester::config::{Config, RetryConfig};
use catalogue_harvester::harvest::{run_harvest, Harvester};
use catalogue_harvester::storage::{SqliteStorage, Storage};
use std::collections::HashSet;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, sitemap_paths: &[&str], dir: &Path) -> Config {
    let mut config = Config::default();
    config.harvest.sitemaps = sitemap_paths
        .iter()
        .map(|p| format!("{}{}", base_url, p))
        .collect();
    config.harvest.max_concurrent_requests = 4;
    config.retry = RetryConfig {
        max_attempts: 5,
        delay_ms: 5,
    };
    config.output.database_path = dir.join("pages.db").to_string_lossy().into_owned();
    config.output.export_path = dir.join("pages.csv").to_string_lossy().into_owned();
    config
}

fn sitemap(base_url: &str, paths: &[&str]) -> String {
    let entries: String = paths
        .iter()
        .map(|p| format!("<url><loc>{}{}</loc></url>", base_url, p))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

fn product_page(part_no: &str, compatibility: &[(&str, &str)]) -> String {
    let rows: String = compatibility
        .iter()
        .map(|(adaptable, orig)| {
            format!(
                r#"<tr class="att_val_22"><td><a>{}</a></td><td><span>{}</span></td></tr>"#,
                adaptable, orig
            )
        })
        .collect();
    format!(
        r#"<html><body><div id="catalog-tab-article">
        <table><tr class="rowodd"><td>Part-no.</td><td>{}</td></tr></table>
        <table class="produkt_passend_table">{}</table>
        </div></body></html>"#,
        part_no, rows
    )
}

async fn mount_page(server: &MockServer, page_path: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, page_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == page_path)
        .count()
}

/// Mounts two sitemaps: /p2 is listed by both, /p3 has no data, /p4 always fails
async fn mount_catalogue(server: &MockServer) {
    let base_url = server.uri();
    mount_page(server, "/sitemap_a.xml", 200, sitemap(&base_url, &["/p1", "/p2"])).await;
    mount_page(
        server,
        "/sitemap_b.xml",
        200,
        sitemap(&base_url, &["/p2", "/p3", "/p4"]),
    )
    .await;

    mount_page(
        server,
        "/p1",
        200,
        product_page("ABC-123", &[("Linde H20", "0009424607"), ("Linde H25", "")]),
    )
    .await;
    mount_page(server, "/p2", 200, product_page("XYZ-9", &[])).await;
    mount_page(
        server,
        "/p3",
        200,
        "<html><body><p>Product not found</p></body></html>".to_string(),
    )
    .await;
    mount_page(server, "/p4", 503, String::new()).await;
}

#[tokio::test]
async fn test_full_harvest() {
    let mock_server = MockServer::start().await;
    mount_catalogue(&mock_server).await;
    let base_url = mock_server.uri();

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &["/sitemap_a.xml", "/sitemap_b.xml"], dir.path());

    let harvester = Harvester::new(config).expect("Failed to create harvester");
    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(report.sitemaps_requested, 2);
    assert_eq!(report.sitemaps_fetched, 2);
    assert_eq!(report.links_found, 5);
    assert_eq!(report.skipped_existing, 0);
    assert_eq!(report.stored, 2);
    // /p2 is fetched twice; the second insert is a no-op
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.empty, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cancelled, 0);

    // Redundant fetches within one run are expected
    assert_eq!(requests_to(&mock_server, "/p2").await, 2);
    // The failing page is retried up to the attempt cap
    assert_eq!(requests_to(&mock_server, "/p4").await, 5);

    let storage = SqliteStorage::new(&dir.path().join("pages.db")).unwrap();
    let records = storage.load_all_records().unwrap();
    assert_eq!(records.len(), 2);

    let p1 = records
        .iter()
        .find(|r| r.url == format!("{}/p1", base_url))
        .expect("p1 stored");
    assert_eq!(p1.part_no, "ABC-123");
    assert_eq!(p1.adaptable_for, "Linde H20, Linde H25");
    assert_eq!(p1.orig_part_no, "0009424607");

    let p2 = records
        .iter()
        .find(|r| r.url == format!("{}/p2", base_url))
        .expect("p2 stored");
    assert_eq!(p2.part_no, "XYZ-9");
    assert_eq!(p2.adaptable_for, "");

    for record in &records {
        assert!(
            !record.part_no.is_empty()
                || !record.adaptable_for.is_empty()
                || !record.orig_part_no.is_empty()
        );
    }
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_catalogue(&mock_server).await;
    let base_url = mock_server.uri();

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &["/sitemap_a.xml", "/sitemap_b.xml"], dir.path());

    let first = Harvester::new(config.clone()).unwrap().run().await.unwrap();
    assert_eq!(first.stored, 2);

    let before: Vec<_> = SqliteStorage::new(&dir.path().join("pages.db"))
        .unwrap()
        .load_all_records()
        .unwrap();

    let second = Harvester::new(config).unwrap().run().await.unwrap();
    assert_eq!(second.stored, 0);
    assert_eq!(second.duplicates, 0);
    // /p1 once, /p2 twice
    assert_eq!(second.skipped_existing, 3);

    // Stored pages are not fetched again
    assert_eq!(requests_to(&mock_server, "/p1").await, 1);
    assert_eq!(requests_to(&mock_server, "/p2").await, 2);

    let after = SqliteStorage::new(&dir.path().join("pages.db"))
        .unwrap()
        .load_all_records()
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_failed_sitemap_does_not_abort_siblings() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/missing.xml", 404, String::new()).await;
    mount_page(&mock_server, "/sitemap.xml", 200, sitemap(&base_url, &["/p1"])).await;
    mount_page(&mock_server, "/p1", 200, product_page("P-1", &[])).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &["/missing.xml", "/sitemap.xml"], dir.path());

    let report = Harvester::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.sitemaps_requested, 2);
    assert_eq!(report.sitemaps_fetched, 1);
    assert_eq!(report.links_found, 1);
    assert_eq!(report.stored, 1);
    assert!(report.has_failures());
    assert_eq!(requests_to(&mock_server, "/missing.xml").await, 5);
}

#[tokio::test]
async fn test_broken_pages_are_isolated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let paths = ["/ok1", "/broken", "/garbage", "/ok2"];
    mount_page(&mock_server, "/sitemap.xml", 200, sitemap(&base_url, &paths)).await;
    mount_page(&mock_server, "/ok1", 200, product_page("OK-1", &[])).await;
    mount_page(&mock_server, "/broken", 500, String::new()).await;
    mount_page(
        &mock_server,
        "/garbage",
        200,
        "<<<<not html at all \u{0} </td></tr>".to_string(),
    )
    .await;
    mount_page(&mock_server, "/ok2", 200, product_page("OK-2", &[("A", "B")])).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&base_url, &["/sitemap.xml"], dir.path());
    config.harvest.max_concurrent_requests = 1;

    let report = Harvester::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.stored, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.empty, 1);

    let storage = SqliteStorage::new(&dir.path().join("pages.db")).unwrap();
    let urls: HashSet<_> = storage.existing_urls().unwrap();
    assert!(urls.contains(&format!("{}/ok1", base_url)));
    assert!(urls.contains(&format!("{}/ok2", base_url)));
}

#[tokio::test]
async fn test_run_harvest_exports_store() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/sitemap.xml", 200, sitemap(&base_url, &["/p1"])).await;
    mount_page(
        &mock_server,
        "/p1",
        200,
        product_page("P1", &[("A", "O1"), ("B", "O2")]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &["/sitemap.xml"], dir.path());

    let report = run_harvest(config).await.expect("Harvest failed");
    assert_eq!(report.stored, 1);

    let content = std::fs::read_to_string(dir.path().join("pages.csv")).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "url,part_no,adaptable_for,orig_part_no");
    assert_eq!(lines[1], format!(r#"{}/p1,P1,"A, B","O1, O2""#, base_url));
}

#[tokio::test]
async fn test_empty_sitemap_harvests_nothing() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_page(&mock_server, "/sitemap.xml", 200, sitemap(&base_url, &[])).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&base_url, &["/sitemap.xml"], dir.path());

    let report = Harvester::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.sitemaps_fetched, 1);
    assert_eq!(report.links_found, 0);
    assert_eq!(report.stored, 0);
    assert!(!report.has_failures());
}
