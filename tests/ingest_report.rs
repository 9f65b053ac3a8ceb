// tests/ingest_report.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use asset_ingest::ingest::pipeline::PipelineSettings;
use asset_ingest::ingest::store::{AssetSink, MemoryStore};
use asset_ingest::ingest::types::{Fetched, ProviderUsed, RetrievalOutcome};
use asset_ingest::{ImportCandidate, ImportOptions, IngestError, ItemStatus, TenantScope};
use common::{body, chain, importer, live, Reply, ScriptedProvider};

#[tokio::test(start_paused = true)]
async fn counts_always_add_up() {
    let provider = Arc::new(ScriptedProvider::new("reader", Reply::Text(body(150))));
    let store = Arc::new(MemoryStore::new());
    let imp = importer(&[provider.clone()], &store);

    for n in 1..=100usize {
        let tenant = TenantScope::new(format!("t{n}"));
        let mut batch = Vec::with_capacity(n);
        for i in 0..n {
            let cand = match i % 5 {
                0 => live(&format!("https://ok.test/{i}")).with_content(body(150)),
                1 => live(&format!("https://short.test/{i}")).with_content("tiny"),
                2 => live(&format!("https://ok.test/{}", i - 2)),
                3 => live(&format!("not a uri {i}")),
                _ => {
                    let uri = format!("https://known.test/{i}");
                    let seed = RetrievalOutcome::fetched(Fetched::text("old"), ProviderUsed::Primary);
                    store
                        .create_record(&ImportCandidate::new(uri.clone(), "old"), &seed, &tenant)
                        .await
                        .unwrap();
                    live(&uri)
                }
            };
            batch.push(cand);
        }

        let report = imp
            .run_import_batch(batch, &tenant, ImportOptions { allow_live_retrieval: false })
            .await
            .unwrap();

        assert_eq!(report.total(), n, "one result per input (n={n})");
        assert_eq!(
            report.total(),
            report.succeeded() + report.failed() + report.skipped(),
            "n={n}"
        );
        assert!(report.succeeded() >= 1, "n={n}");
        assert!(report.succeeded_with_warning() <= report.succeeded());
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["total"], n);
        assert_eq!(v["items"].as_array().unwrap().len(), n);
    }
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn in_batch_duplicates_in_both_modes() {
    for limited in [true, false] {
        let mut p = ScriptedProvider::new("scrape", Reply::Text(body(150)));
        if limited {
            p = p.rate_limited();
        }
        let p = Arc::new(p);
        let store = Arc::new(MemoryStore::new());
        let imp = importer(&[p.clone()], &store);
        let x = "https://blog.test/x";

        let report = imp
            .run_import_batch(
                vec![live(x), live("https://blog.test/y"), live(x)],
                &TenantScope::new("acme"),
                ImportOptions::default(),
            )
            .await
            .unwrap();

        let xs = report.find(x);
        assert_eq!(xs.len(), 2);
        assert_eq!(
            xs.iter().filter(|r| r.status() == ItemStatus::SkippedDuplicateInBatch).count(),
            1,
            "limited={limited}"
        );
        assert_eq!(p.calls_for(x), 1, "duplicate never fetched");
    }
}

#[tokio::test]
async fn unreachable_index_fails_the_batch_before_any_fetch() {
    let p = Arc::new(ScriptedProvider::new("scrape", Reply::Text(body(150))));
    let store = Arc::new(MemoryStore::new());
    store.fail_lookups(true);
    let imp = importer(&[p.clone()], &store);

    let err = imp
        .run_import_batch(
            vec![live("https://blog.test/a")],
            &TenantScope::new("acme"),
            ImportOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::KnownIndexUnavailable(_)));
    assert!(!err.is_input_error());
    assert_eq!(p.call_count(), 0);
}

#[tokio::test]
async fn input_errors_abort_before_the_index_is_read() {
    let p = Arc::new(ScriptedProvider::new("scrape", Reply::Text(body(150))));
    let store = Arc::new(MemoryStore::new());
    store.fail_lookups(true);
    let imp = importer(&[p], &store);
    let tenant = TenantScope::new("acme");

    let empty = imp
        .run_import_batch(vec![], &tenant, ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(empty, IngestError::EmptyBatch));

    let big = (0..101).map(|i| live(&format!("https://blog.test/{i}"))).collect();
    let too_big = imp
        .run_import_batch(big, &tenant, ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(too_big, IngestError::BatchTooLarge { len: 101, max: 100 }));
}

#[tokio::test(start_paused = true)]
async fn persistence_failures_are_reported_per_item() {
    let p = Arc::new(ScriptedProvider::new("scrape", Reply::Text(body(150))));
    let store = Arc::new(MemoryStore::new());
    store.fail_writes(true);
    let imp = importer(&[p], &store);

    let report = imp
        .run_import_batch(
            vec![live("https://blog.test/a"), live("https://blog.test/b")],
            &TenantScope::new("acme"),
            ImportOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.failed(), 2);
    for r in &report.items {
        assert!(r.detail().unwrap().contains("write rejected by asset store"));
    }
}

#[tokio::test(start_paused = true)]
async fn batch_deadline_fails_unstarted_items() {
    let p = Arc::new(ScriptedProvider::new("scrape", Reply::Text(body(150))).rate_limited());
    let store = Arc::new(MemoryStore::new());
    let imp = asset_ingest::Importer::new(chain(&[p.clone()]), store.clone(), store.clone())
        .with_settings(PipelineSettings {
            rate_limited_delay: Duration::from_secs(7),
            batch_timeout: Some(Duration::from_secs(10)),
            ..PipelineSettings::default()
        });

    let batch = (0..4).map(|i| live(&format!("https://blog.test/{i}"))).collect();
    let report = imp
        .run_import_batch(batch, &TenantScope::new("acme"), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 2);
    assert_eq!(p.call_count(), 2);
    assert!(report
        .items
        .iter()
        .filter(|r| r.status() == ItemStatus::Failed)
        .all(|r| r.detail() == Some("batch deadline exceeded")));
}
