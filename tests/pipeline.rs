//! Crawl, index and search against a mock site

use futures::future::join_all;
use lemmasearch::config::Config;
use lemmasearch::index::IndexingService;
use lemmasearch::lemma::Lemmatizer;
use lemmasearch::search::SearchEngine;
use lemmasearch::store::{NewPage, SiteStatus, Store};
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    config: Config,
    service: IndexingService,
    search: SearchEngine,
    _tmp: TempDir,
}

async fn harness(server: &MockServer) -> Harness {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.init_paths(Some(tmp.path().to_path_buf()));
    config.crawl.requests_per_second = 0;
    config.crawl.retry_backoff_ms = 1;

    let store = Store::connect(&config).await.unwrap();
    store.register_site(&server.uri(), "Mock").await.unwrap();

    let service = IndexingService::from_config(&config, store.clone())
        .await
        .unwrap();
    let search = SearchEngine::new(
        store,
        Lemmatizer::from_config(&config.lemma).unwrap(),
        config.search.clone(),
    );
    Harness {
        config,
        service,
        search,
        _tmp: tmp,
    }
}

async fn page(server: &MockServer, route: &str, title: &str, body: &str) {
    let html = format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    );
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.into_bytes(), "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_index_search() {
    let server = MockServer::start().await;
    let links: String = ["/a", "/b", "/f1", "/f2", "/f3", "/f4", "/f5", "/f6"]
        .iter()
        .map(|l| format!("<a href=\"{}\">link</a>", l))
        .collect();
    page(&server, "/", "Home", &links).await;
    page(&server, "/a", "Alpha", "test test test").await;
    page(&server, "/b", "Beta", "test").await;
    for i in 1..=6 {
        page(&server, &format!("/f{}", i), "Filler", "страница").await;
    }

    let h = harness(&server).await;
    let site = h.service.store().list_sites().await.unwrap().remove(0);
    let report = h.service.run_indexing(site.id).await.unwrap();
    assert_eq!(report.status, SiteStatus::Indexed);
    assert_eq!(report.pages_indexed, 9);

    let store = h.service.store();
    let test = &store.find_lemmas("test", None).await.unwrap()[0];
    assert_eq!(test.frequency, 2);

    let a = store
        .get_page_by_url(&format!("{}/a", server.uri()))
        .await
        .unwrap()
        .unwrap();
    let b = store
        .get_page_by_url(&format!("{}/b", server.uri()))
        .await
        .unwrap()
        .unwrap();
    let rank_a = store.get_index(a.id, test.id).await.unwrap().unwrap().rank;
    let rank_b = store.get_index(b.id, test.id).await.unwrap().unwrap().rank;
    assert!(rank_a >= rank_b);

    let response = h.search.search("test", None, 0, 10).await.unwrap();
    assert_eq!(response.total_count, 2);
    let uris: Vec<&str> = response.results.iter().map(|r| r.uri.as_str()).collect();
    assert!(uris.contains(&"/a"));
    assert!(uris.contains(&"/b"));
    assert!(response.results.iter().all(|r| r.site == server.uri()));

    let filtered = h
        .search
        .search("test", Some(server.uri().as_str()), 0, 10)
        .await
        .unwrap();
    assert_eq!(filtered.total_count, 2);

    // Filler lemma sits on 6 of 9 pages, above the ceiling of 2
    let response = h.search.search("страница", None, 0, 10).await.unwrap();
    assert_eq!(response.total_count, 0);
}

#[tokio::test]
async fn test_single_page_corpus_returns_nothing() {
    let server = MockServer::start().await;
    page(&server, "/", "Only", "test").await;

    let h = harness(&server).await;
    let site = h.service.store().list_sites().await.unwrap().remove(0);
    h.service.run_indexing(site.id).await.unwrap();

    assert_eq!(h.service.store().count_pages(None).await.unwrap(), 1);
    let response = h.search.search("test", None, 0, 10).await.unwrap();
    assert_eq!(response.total_count, 0);
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn test_concurrent_page_indexing_keeps_exact_frequency() {
    let server = MockServer::start().await;
    for i in 0..8 {
        page(&server, &format!("/cat{}", i), "Кот", "кот и кошка").await;
    }

    let h = harness(&server).await;
    let urls: Vec<String> = (0..8).map(|i| format!("{}/cat{}", server.uri(), i)).collect();
    let results = join_all(urls.iter().map(|u| h.service.engine().index_page(u))).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let cat = &h.service.store().find_lemmas("кот", None).await.unwrap()[0];
    assert_eq!(cat.frequency, 8);
}

#[tokio::test]
async fn test_delete_keeps_lemma_frequency() {
    let server = MockServer::start().await;
    page(&server, "/p", "Город", "город").await;

    let h = harness(&server).await;
    let url = format!("{}/p", server.uri());
    let indexed = h.service.engine().index_page(&url).await.unwrap();

    let store = h.service.store();
    let city = store.find_lemmas("город", None).await.unwrap().remove(0);
    let record = h
        .service
        .engine()
        .delete_by_page(indexed.id, Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(record.url, url);
    assert_eq!(record.status, "DELETED");

    assert!(store.get_page(indexed.id).await.unwrap().is_none());
    assert!(store.indices_for_page(indexed.id).await.unwrap().is_empty());
    let after = store.find_lemmas("город", None).await.unwrap().remove(0);
    assert_eq!(after.frequency, city.frequency);
}

#[tokio::test]
async fn test_page_weights_match_region_sum() {
    let server = MockServer::start().await;
    let h = harness(&server).await;
    let processor = h.service.engine().processor();

    let html = "<html><head><title>Лес</title></head><body>лес и город</body></html>";
    let regions = processor.process(html);
    let combined = lemmasearch::parse::combine(regions.title.clone(), regions.body.clone());
    assert_eq!(processor.page_weights(html), combined);

    let forest = combined["лес"];
    let expected = h.config.fields.title_weight + h.config.fields.body_weight;
    assert!((forest - expected).abs() < 1e-9);
    assert!((combined["город"] - h.config.fields.body_weight).abs() < 1e-9);
}

#[tokio::test]
async fn test_region_upserts_sum_like_combined_map() {
    let server = MockServer::start().await;
    let h = harness(&server).await;
    let engine = h.service.engine();
    let store = h.service.store();
    let site_id = store.list_sites().await.unwrap()[0].id;

    let html = "<html><head><title>Лес город</title></head><body>лес лес и собака</body></html>";
    let regions = engine.processor().process(html);
    let combined = lemmasearch::parse::combine(regions.title.clone(), regions.body.clone());

    let url = |p: &str| format!("{}/{}", server.uri(), p);
    let split = store
        .upsert_page(&NewPage::new(site_id, url("split"), 200, html))
        .await
        .unwrap();
    let whole = store
        .upsert_page(&NewPage::new(site_id, url("whole"), 200, html))
        .await
        .unwrap();

    engine
        .persist_weights(site_id, split.id, regions.title.clone())
        .await
        .unwrap();
    engine
        .persist_weights(site_id, split.id, regions.body.clone())
        .await
        .unwrap();
    engine
        .persist_weights(site_id, whole.id, combined.clone())
        .await
        .unwrap();

    for (lemma, weight) in &combined {
        let row = store.find_lemmas(lemma, Some(site_id)).await.unwrap().remove(0);
        let split_rank = store.get_index(split.id, row.id).await.unwrap().unwrap().rank;
        let whole_rank = store.get_index(whole.id, row.id).await.unwrap().unwrap().rank;
        assert!((split_rank - whole_rank).abs() < 1e-9, "{}", lemma);
        assert!((whole_rank - weight).abs() < 1e-9, "{}", lemma);
    }
}
