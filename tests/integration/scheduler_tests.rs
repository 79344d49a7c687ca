use super::*;
use sniper_watch::{AppError, NewTrackedItem, Status, Store};

#[tokio::test]
async fn test_retry_exhaustion_over_http() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    Mock::given(method("GET"))
        .and(path("/p/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&app.server)
        .await;

    app.store
        .upsert_many(&[NewTrackedItem {
            name: "Flaky".to_string(),
            url: app.url("/p/flaky"),
            provider: "sample".to_string(),
            format: DocumentFormat::Html,
            recipients: vec![],
            threshold: None,
        }])
        .await?;

    let scheduler = app.scheduler(vec![], RunMode::Continuous)?;
    let item = app.store.get_by_name("Flaky").await?.unwrap();

    let err = scheduler.snipe(&item).await.unwrap_err();
    match err {
        AppError::FetchExhausted { attempts, source, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*source, AppError::HttpStatus { status: 503, .. }));
        }
        other => panic!("expected FetchExhausted, got {:?}", other),
    }

    // Two pauses between the three attempts, then the throttle after the item.
    assert_eq!(
        app.sleeper.pauses(),
        vec![REQUEST_DELAY, REQUEST_DELAY, REQUEST_DELAY]
    );
    assert_eq!(
        app.store.get_by_name("Flaky").await?.unwrap().status,
        Status::Unavailable
    );

    Ok(())
}

#[tokio::test]
async fn test_populate_records_baseline_for_first_live_cycle() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let base = app.server.uri();
    app.serve("/search", search_page(&base, &[("Widget", "/p/widget")]))
        .await;
    app.serve("/p/widget", product_page(Some("10,00"), true))
        .await;

    let populate = app.scheduler(vec![app.search("/search", &["widget"], None)], RunMode::Populate)?;
    let cycles = populate.run(None).await;

    assert_eq!(cycles, 1);
    assert!(app.notifier.sent().is_empty());
    let item = app.store.get_by_name("Widget").await?.unwrap();
    assert_eq!(item.status, Status::Available);
    assert_eq!(item.price, Some(10.0));
    assert_eq!(app.sleeper.pauses(), vec![REQUEST_DELAY, REQUEST_DELAY]);

    // Nothing changed since the baseline, so the live run stays quiet.
    let live = app.scheduler(vec![app.search("/search", &["widget"], None)], RunMode::Continuous)?;
    let report = live.run_cycle(1).await;
    assert_eq!(report.items_checked, 1);
    assert_eq!(report.state_changes, 0);
    assert!(app.notifier.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_bad_search_does_not_block_snipe() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    app.serve("/broken-search", "<html><body>maintenance</body></html>".to_string())
        .await;
    app.serve("/p/widget", product_page(Some("10,00"), true))
        .await;

    app.store
        .upsert_many(&[NewTrackedItem {
            name: "Widget".to_string(),
            url: app.url("/p/widget"),
            provider: "SAMPLE".to_string(),
            format: DocumentFormat::Html,
            recipients: vec!["buyer@example.com".to_string()],
            threshold: None,
        }])
        .await?;

    let mut unknown = app.search("/search", &[], None);
    unknown.provider = "no-such-shop".to_string();
    let scheduler = app.scheduler(
        vec![app.search("/broken-search", &[], None), unknown],
        RunMode::Continuous,
    )?;

    let report = scheduler.run_cycle(1).await;
    assert_eq!(report.searches_run, 2);
    assert_eq!(report.searches_failed, 2);
    assert_eq!(report.items_checked, 1);
    assert_eq!(report.items_failed, 0);
    assert_eq!(app.notifier.kinds(), vec![NotificationKind::Available]);

    Ok(())
}

#[tokio::test]
async fn test_cycles_are_separated_by_snipe_delay() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let base = app.server.uri();
    app.serve("/search", search_page(&base, &[("Widget", "/p/widget")]))
        .await;
    app.serve("/p/widget", product_page(None, false)).await;

    let scheduler = app.scheduler(vec![app.search("/search", &["widget"], None)], RunMode::Continuous)?;
    let cycles = scheduler.run(Some(3)).await;

    assert_eq!(cycles, 3);
    let pauses = app.sleeper.pauses();
    assert_eq!(pauses.iter().filter(|p| **p == SNIPE_DELAY).count(), 2);
    assert_eq!(pauses.iter().filter(|p| **p == REQUEST_DELAY).count(), 6);
    assert!(app.notifier.sent().is_empty());

    Ok(())
}
