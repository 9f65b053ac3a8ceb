// tests/ingest_fallthrough.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use asset_ingest::ingest::providers::ContentProvider;
use asset_ingest::ingest::providers::ProviderChain;
use asset_ingest::ingest::store::MemoryStore;
use asset_ingest::ingest::types::ProviderUsed;
use asset_ingest::{ImportOptions, Importer, ItemResult, ItemStatus, TenantScope};
use common::{body, importer, live, Reply, ScriptedProvider};

#[tokio::test(start_paused = true)]
async fn fallback_content_is_used_and_tagged() {
    let primary = Arc::new(
        ScriptedProvider::new("scrape", Reply::Fail("429 rate limited")).rate_limited(),
    );
    let second = Arc::new(ScriptedProvider::new("reader", Reply::Fail("403")));
    let third = Arc::new(ScriptedProvider::new("direct", Reply::Text(body(180))));
    let store = Arc::new(MemoryStore::new());
    let imp = importer(&[primary.clone(), second.clone(), third.clone()], &store);
    let tenant = TenantScope::new("acme");

    let report = imp
        .run_import_batch(vec![live("https://blog.test/x")], &tenant, ImportOptions::default())
        .await
        .unwrap();

    assert!(matches!(
        report.items[0],
        ItemResult::Imported { provider: ProviderUsed::Fallback(2), .. }
    ));
    assert_eq!(store.records(&tenant)[0].content, body(180));
    assert_eq!(store.records(&tenant)[0].provider.as_deref(), Some("fallback-2"));
}

#[tokio::test(start_paused = true)]
async fn failing_primary_is_still_tried_for_every_item() {
    let primary = Arc::new(ScriptedProvider::new("scrape", Reply::Fail("boom")));
    let fallback = Arc::new(ScriptedProvider::new("reader", Reply::Text(body(150))));
    let store = Arc::new(MemoryStore::new());
    let imp = importer(&[primary.clone(), fallback.clone()], &store);

    let batch = (0..6).map(|i| live(&format!("https://blog.test/{i}"))).collect();
    let report = imp
        .run_import_batch(batch, &TenantScope::new("acme"), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 6);
    // one attempt per item, no retries
    assert_eq!(primary.call_count(), 6);
    assert_eq!(fallback.call_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn timeout_counts_as_provider_failure() {
    let slow = Arc::new(ScriptedProvider::new("scrape", Reply::Hang));
    let fast = Arc::new(ScriptedProvider::new("reader", Reply::Text(body(150))));
    let store = Arc::new(MemoryStore::new());
    let chain = ProviderChain::new(
        vec![
            slow.clone() as Arc<dyn ContentProvider>,
            fast.clone() as Arc<dyn ContentProvider>,
        ],
        Duration::from_secs(2),
    );
    let imp = Importer::new(chain, store.clone(), store.clone());

    let report = imp
        .run_import_batch(
            vec![live("https://blog.test/slow")],
            &TenantScope::new("acme"),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    assert!(matches!(
        report.items[0],
        ItemResult::Imported { provider: ProviderUsed::Fallback(1), .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn last_provider_timeout_fails_the_item() {
    let slow = Arc::new(ScriptedProvider::new("scrape", Reply::Hang));
    let store = Arc::new(MemoryStore::new());
    let chain = ProviderChain::new(
        vec![slow as Arc<dyn ContentProvider>],
        Duration::from_secs(2),
    );
    let imp = Importer::new(chain, store.clone(), store.clone());

    let report = imp
        .run_import_batch(
            vec![live("https://blog.test/slow")],
            &TenantScope::new("acme"),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    let detail = report.items[0].detail().unwrap();
    assert!(detail.contains("timed out"), "{detail}");
}

#[tokio::test(start_paused = true)]
async fn one_bad_item_does_not_sink_the_batch() {
    let bad = "https://blog.test/3";
    let primary = Arc::new(
        ScriptedProvider::new("scrape", Reply::Text(body(200)))
            .rate_limited()
            .on(bad, Reply::Fail("500")),
    );
    let fallback = Arc::new(ScriptedProvider::new("reader", Reply::Text(body(200))).on(bad, Reply::Fail("404")));
    let store = Arc::new(MemoryStore::new());
    let imp = importer(&[primary, fallback], &store);

    let batch = (1..=10).map(|i| live(&format!("https://blog.test/{i}"))).collect();
    let report = imp
        .run_import_batch(batch, &TenantScope::new("acme"), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(report.total(), 10);
    assert_eq!(report.succeeded(), 9);
    assert_eq!(report.failed(), 1);
    let failed = report.find(bad);
    assert_eq!(failed[0].status(), ItemStatus::Failed);
    let detail = failed[0].detail().unwrap();
    assert!(detail.contains("scrape: 500") && detail.contains("reader: 404"), "{detail}");
}

#[tokio::test(start_paused = true)]
async fn provider_warning_imports_with_warning() {
    let primary = Arc::new(ScriptedProvider::new(
        "scrape",
        Reply::Warn(body(220), "paywall detected"),
    ));
    let store = Arc::new(MemoryStore::new());
    let imp = importer(&[primary], &store);

    let report = imp
        .run_import_batch(
            vec![live("https://blog.test/pw")],
            &TenantScope::new("acme"),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.succeeded_with_warning(), 1);
    assert_eq!(report.items[0].detail(), Some("paywall detected"));
}
