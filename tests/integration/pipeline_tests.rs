use super::*;
use sniper_watch::{Status, Store};

#[tokio::test]
async fn test_discovery_merges_matching_hits_once() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let base = app.server.uri();
    app.serve(
        "/search",
        search_page(
            &base,
            &[
                ("Blue Widget Pro", "/p/widget-pro"),
                ("Blue Widget Mini", "/p/widget-mini"),
                ("Red Gadget Pro", "/p/gadget-pro"),
            ],
        ),
    )
    .await;

    let scheduler = app.scheduler(vec![app.search("/search", &["WIDGET", "pro"], None)], RunMode::Continuous)?;
    let search = app.search("/search", &["WIDGET", "pro"], None);

    let first = scheduler.discover(&search).await?;
    assert_eq!(first.inserted, 1);

    let items = app.store.get_all().await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Blue Widget Pro");
    assert_eq!(items[0].url, app.url("/p/widget-pro"));
    assert_eq!(items[0].status, Status::Unavailable);
    assert_eq!(items[0].price, None);

    let second = scheduler.discover(&search).await?;
    assert_eq!(second.mutations(), 0);
    assert_eq!(app.store.get_all().await?, items);

    Ok(())
}

#[tokio::test]
async fn test_rediscovery_with_new_recipients_keeps_state() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let base = app.server.uri();
    app.serve("/search", search_page(&base, &[("Blue Widget Pro", "/p/widget-pro")]))
        .await;
    app.serve("/p/widget-pro", product_page(Some("49,90 lei"), true))
        .await;

    let search = app.search("/search", &["widget"], None);
    let scheduler = app.scheduler(vec![search.clone()], RunMode::Continuous)?;
    scheduler.run_cycle(1).await;

    let mut rerouted = search;
    rerouted.recipients = vec!["other@example.com".to_string()];
    let summary = scheduler.discover(&rerouted).await?;
    assert_eq!(summary.updated, 1);

    let item = app.store.get_by_name("Blue Widget Pro").await?.unwrap();
    assert_eq!(item.recipients, vec!["other@example.com".to_string()]);
    assert_eq!(item.status, Status::Available);
    assert_eq!(item.price, Some(49.9));

    Ok(())
}

#[tokio::test]
async fn test_price_drop_below_threshold_notifies() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let base = app.server.uri();
    app.serve("/search", search_page(&base, &[("Gaming Laptop", "/p/laptop")]))
        .await;
    app.serve("/p/laptop", product_page(Some("5.499,00 lei"), true))
        .await;

    let scheduler = app.scheduler(
        vec![app.search("/search", &["laptop"], Some(5_000.0))],
        RunMode::Continuous,
    )?;

    // Available, but above the threshold: state recorded, nothing sent.
    let report = scheduler.run_cycle(1).await;
    assert_eq!(report.state_changes, 1);
    assert_eq!(report.notifications_suppressed, 1);
    assert!(app.notifier.sent().is_empty());
    let item = app.store.get_by_name("Gaming Laptop").await?.unwrap();
    assert_eq!(item.price, Some(5_499.0));

    app.server.reset().await;
    app.serve("/search", search_page(&base, &[("Gaming Laptop", "/p/laptop")]))
        .await;
    app.serve("/p/laptop", product_page(Some("4.999,99 lei"), true))
        .await;

    let report = scheduler.run_cycle(2).await;
    assert_eq!(report.notifications_sent, 1);

    let sent = app.notifier.sent();
    assert_eq!(sent[0].0, NotificationKind::Price);
    assert_eq!(sent[0].1.price, Some(4_999.99));
    assert_eq!(sent[0].1.url, app.url("/p/laptop"));
    assert_eq!(sent[0].2, vec!["buyer@example.com".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_unreadable_price_keeps_stored_value() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let base = app.server.uri();
    app.serve("/search", search_page(&base, &[("Console", "/p/console")]))
        .await;
    app.serve("/p/console", product_page(Some("2.199,00 lei"), true))
        .await;

    let scheduler = app.scheduler(vec![app.search("/search", &["console"], None)], RunMode::Continuous)?;
    scheduler.run_cycle(1).await;

    app.server.reset().await;
    app.serve("/search", search_page(&base, &[("Console", "/p/console")]))
        .await;
    app.serve("/p/console", product_page(Some("call for price"), true))
        .await;

    let report = scheduler.run_cycle(2).await;
    assert_eq!(report.state_changes, 0);
    assert_eq!(report.items_failed, 0);

    let item = app.store.get_by_name("Console").await?.unwrap();
    assert_eq!(item.status, Status::Available);
    assert_eq!(item.price, Some(2_199.0));
    assert_eq!(app.notifier.kinds(), vec![NotificationKind::Available]);

    Ok(())
}

#[tokio::test]
async fn test_relative_search_links_are_sniped_on_the_search_host() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    app.serve("/search", search_page("", &[("Tablet", "/p/tablet")]))
        .await;
    app.serve("/p/tablet", product_page(Some("899,00 lei"), true))
        .await;

    let scheduler = app.scheduler(vec![app.search("/search", &["tablet"], None)], RunMode::Continuous)?;
    let report = scheduler.run_cycle(1).await;
    assert_eq!(report.items_checked, 1);
    assert_eq!(report.items_failed, 0);

    let item = app.store.get_by_name("Tablet").await?.unwrap();
    assert_eq!(item.url, app.url("/p/tablet"));
    assert_eq!(item.status, Status::Available);
    assert_eq!(app.notifier.kinds(), vec![NotificationKind::Available]);

    Ok(())
}
