//! End-to-end plugin marketplace and installation flows over the
//! in-memory document store.

use schoolhub_core::config::AppConfig;
use schoolhub_core::error::ErrorKind;
use schoolhub_core::traits::TenantScopedRepository;
use schoolhub_database::Repositories;
use schoolhub_entity::plugin::{InstallStatus, Plugin};
use schoolhub_service::{Platform, RequestContext};

async fn platform() -> Platform {
    Platform::assemble(AppConfig::default(), Repositories::in_memory())
        .await
        .expect("platform assembles")
}

fn library_barcode() -> Plugin {
    let mut plugin = Plugin::new("library-barcode", "Library Barcodes", "1.0.0", "library")
        .with_description("Print and scan barcode labels for library books")
        .with_tags(["barcode", "labels"]);
    plugin.rating = 4.5;
    plugin.downloads = 120;
    plugin
}

fn sms_gateway() -> Plugin {
    let mut plugin = Plugin::new("sms-gateway", "SMS Gateway", "2.0.0", "messaging")
        .with_description("Send fee reminders and absence alerts by SMS");
    plugin.rating = 4.8;
    plugin.downloads = 50;
    plugin
}

#[tokio::test]
async fn test_category_listing_orders_by_rating_then_downloads() {
    let platform = platform().await;
    platform.marketplace.register(library_barcode()).await.unwrap();
    platform.marketplace.register(sms_gateway()).await.unwrap();

    let library = platform.marketplace.by_category("library").await.unwrap();
    let ids: Vec<_> = library.iter().map(|p| p.plugin_id.as_str()).collect();
    assert_eq!(ids, vec!["library-barcode"]);

    let mut shelf = Plugin::new("shelf-scanner", "Shelf Scanner", "1.0.0", "library");
    shelf.rating = 4.5;
    shelf.downloads = 200;
    platform.marketplace.register(shelf).await.unwrap();

    let mut inventory = Plugin::new("book-inventory", "Book Inventory", "1.0.0", "library");
    inventory.rating = 4.5;
    inventory.downloads = 80;
    platform.marketplace.register(inventory).await.unwrap();

    let library = platform.marketplace.by_category("library").await.unwrap();
    let ids: Vec<_> = library.iter().map(|p| p.plugin_id.as_str()).collect();
    assert_eq!(ids, vec!["shelf-scanner", "library-barcode", "book-inventory"]);
}

#[tokio::test]
async fn test_search_on_empty_or_unmatched_catalog_is_empty() {
    let platform = platform().await;
    assert!(platform.marketplace.search("barcode").await.unwrap().is_empty());

    platform.marketplace.register(library_barcode()).await.unwrap();
    assert!(platform.marketplace.search("timetable").await.unwrap().is_empty());
    assert!(platform.marketplace.search("   ").await.unwrap().is_empty());

    let hits = platform.marketplace.search("barcode").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].plugin_id, "library-barcode");
}

#[tokio::test]
async fn test_install_enable_disable_keeps_record() {
    let platform = platform().await;
    platform.marketplace.register(library_barcode()).await.unwrap();
    let ctx = RequestContext::new("t1");
    let installs = &platform.installations;

    let record = installs.install(&ctx, "library-barcode").await.unwrap();
    assert_eq!(record.status, InstallStatus::Installed);
    assert!(installs.enabled(&ctx).await.unwrap().is_empty());

    let record = installs.enable(&ctx, "library-barcode").await.unwrap();
    assert_eq!(record.status, InstallStatus::Enabled);
    assert!(record.enabled_at.is_some());
    let enabled = installs.enabled(&ctx).await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].plugin_id, "library-barcode");

    installs.disable(&ctx, "library-barcode").await.unwrap();
    assert!(installs.enabled(&ctx).await.unwrap().is_empty());
    assert!(!installs.is_enabled(&ctx, "library-barcode").await.unwrap());

    let all = installs.list(&ctx).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, InstallStatus::Disabled);

    let catalog = platform
        .marketplace
        .get_by_plugin_id("library-barcode")
        .await
        .unwrap();
    assert_eq!(catalog.downloads, 121);
    assert!(platform.shutdown().await);
}

#[tokio::test]
async fn test_enabled_filter_holds_across_transitions() {
    let platform = platform().await;
    platform.marketplace.register(library_barcode()).await.unwrap();
    platform.marketplace.register(sms_gateway()).await.unwrap();
    let ctx = RequestContext::new("t1");
    let installs = &platform.installations;

    installs.install(&ctx, "library-barcode").await.unwrap();
    installs.install(&ctx, "sms-gateway").await.unwrap();

    let steps: [(&str, bool); 6] = [
        ("library-barcode", true),
        ("sms-gateway", true),
        ("library-barcode", false),
        ("sms-gateway", true),
        ("library-barcode", true),
        ("sms-gateway", false),
    ];
    for (plugin_id, enable) in steps {
        if enable {
            installs.enable(&ctx, plugin_id).await.unwrap();
        } else {
            installs.disable(&ctx, plugin_id).await.unwrap();
        }
        for record in installs.enabled(&ctx).await.unwrap() {
            assert_eq!(record.status, InstallStatus::Enabled);
        }
    }

    installs
        .record_failure(&ctx, "library-barcode", "printer offline")
        .await
        .unwrap();
    assert!(installs.enabled(&ctx).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_installs_yield_one_conflict() {
    let platform = platform().await;
    platform.marketplace.register(library_barcode()).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let installs = platform.installations.clone();
        tasks.push(tokio::spawn(async move {
            installs
                .install(&RequestContext::new("t1"), "library-barcode")
                .await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) if e.kind == ErrorKind::Conflict => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((successes, conflicts), (1, 1));

    let ctx = RequestContext::new("t1");
    assert_eq!(platform.installations.list(&ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleting_missing_installation_is_noop() {
    let repos = Repositories::in_memory();
    let platform = Platform::assemble(AppConfig::default(), repos.clone())
        .await
        .unwrap();
    platform.marketplace.register(library_barcode()).await.unwrap();
    let ctx = RequestContext::new("t1");

    let record = platform
        .installations
        .install(&ctx, "library-barcode")
        .await
        .unwrap();
    let id = record.id.unwrap();

    assert!(repos.installations.delete(&id, &ctx.tenant_id).await.unwrap());
    assert!(!repos.installations.delete(&id, &ctx.tenant_id).await.unwrap());

    let err = platform
        .installations
        .uninstall(&ctx, "library-barcode")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_withdrawn_plugin_cannot_be_installed() {
    let platform = platform().await;
    platform.marketplace.register(library_barcode()).await.unwrap();
    platform.marketplace.withdraw("library-barcode").await.unwrap();

    let err = platform
        .installations
        .install(&RequestContext::new("t1"), "library-barcode")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}
