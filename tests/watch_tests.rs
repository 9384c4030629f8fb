//! Watch mode integration tests
//!
//! Drives the dispatcher and the rebuild scheduler with the real build
//! pipeline, without an OS watcher, to check that a change rebuilds only the
//! affected category and always ends with a reload notification.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assetflow::build::{BuildContext, BuildPipeline, StepKind, StepResult};
use assetflow::category::AssetCategory;
use assetflow::config::default_config;
use assetflow::server::{ReloadHub, ReloadKind};
use assetflow::watch::{RebuildScheduler, WatchDispatcher};
use tempfile::TempDir;

fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// Scheduler wired like the watch loop, recording each step result.
fn scheduler(
    ctx: BuildContext,
    hub: ReloadHub,
    results: Arc<Mutex<Vec<StepResult>>>,
) -> RebuildScheduler {
    let pipeline = BuildPipeline::new(ctx);
    RebuildScheduler::spawn(&AssetCategory::ALL, move |category| {
        let result = pipeline.run_step(StepKind::Asset(category));
        results.lock().unwrap().push(result);
        hub.notify(assetflow::server::ReloadEvent::for_category(category));
    })
    .unwrap()
}

#[test]
fn test_image_change_rebuilds_only_images() {
    let temp = TempDir::new().unwrap();
    let root = fs::canonicalize(temp.path()).unwrap();
    create_test_file(&root, "src/index.html", "<html></html>");
    create_test_file(&root, "src/fonts/a.woff", "font");
    let changed = create_test_file(&root, "src/img/logo.svg", "<svg/>");

    let ctx = BuildContext::new(default_config(), root.clone());
    let dispatcher = WatchDispatcher::new(&ctx).unwrap();
    let hub = ReloadHub::default();
    let mut events = hub.subscribe();
    let results = Arc::new(Mutex::new(Vec::new()));
    let scheduler = scheduler(ctx, hub, results.clone());

    for category in dispatcher.dispatch(&changed) {
        scheduler.schedule(category);
    }
    scheduler.shutdown();

    let results = results.lock().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].category(), Some(AssetCategory::Image));
    assert!(root.join("build/img/logo.svg").exists());
    assert!(!root.join("build/index.html").exists());
    assert!(!root.join("build/fonts").exists());

    let event = events.try_recv().unwrap();
    assert_eq!(event.category, AssetCategory::Image);
    assert_eq!(event.kind, ReloadKind::Full);
}

#[test]
fn test_failed_rebuild_still_notifies() {
    let temp = TempDir::new().unwrap();
    let root = fs::canonicalize(temp.path()).unwrap();
    create_test_file(&root, "src/js/script.js", "var ok = 1;");
    let broken = create_test_file(&root, "src/js/lib/broken.js", "var = ;");
    create_test_file(&root, "src/js/script.js", "//= include lib/broken.js\nvar ok = 1;");

    let ctx = BuildContext::new(default_config(), root.clone());
    let dispatcher = WatchDispatcher::new(&ctx).unwrap();
    let hub = ReloadHub::default();
    let mut events = hub.subscribe();
    let results = Arc::new(Mutex::new(Vec::new()));
    let scheduler = scheduler(ctx, hub, results.clone());

    // A file that is only included still triggers the script rebuild
    assert_eq!(dispatcher.dispatch(&broken), vec![AssetCategory::Script]);
    for category in dispatcher.dispatch(&broken) {
        scheduler.schedule(category);
    }
    scheduler.shutdown();

    let results = results.lock().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].status.is_failure());
    assert!(!root.join("build/js").exists());
    assert_eq!(events.try_recv().unwrap().category, AssetCategory::Script);
}

#[test]
fn test_style_change_pushes_css_reload() {
    let temp = TempDir::new().unwrap();
    let root = fs::canonicalize(temp.path()).unwrap();
    let changed = create_test_file(&root, "src/scss/main.scss", ".a { color: red; }");

    let ctx = BuildContext::new(default_config(), root.clone());
    let dispatcher = WatchDispatcher::new(&ctx).unwrap();
    let hub = ReloadHub::default();
    let mut events = hub.subscribe();
    let results = Arc::new(Mutex::new(Vec::new()));
    let scheduler = scheduler(ctx, hub, results.clone());

    for category in dispatcher.dispatch(&changed) {
        scheduler.schedule(category);
    }
    scheduler.shutdown();

    assert!(root.join("build/css/main.css").exists());
    assert_eq!(events.try_recv().unwrap().kind, ReloadKind::Css);
}

#[test]
fn test_changes_in_several_categories() {
    let temp = TempDir::new().unwrap();
    let root = fs::canonicalize(temp.path()).unwrap();
    let html = create_test_file(&root, "src/index.html", "<html></html>");
    let font = create_test_file(&root, "src/fonts/b.woff", "font");

    let ctx = BuildContext::new(default_config(), root.clone());
    let dispatcher = WatchDispatcher::new(&ctx).unwrap();
    let results = Arc::new(Mutex::new(Vec::new()));
    let scheduler = scheduler(ctx, ReloadHub::default(), results.clone());

    for path in [&html, &font, &html] {
        for category in dispatcher.dispatch(path) {
            scheduler.schedule(category);
        }
    }
    scheduler.shutdown();

    let mut ids: Vec<&str> = results.lock().unwrap().iter().map(|r| r.step.id()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids, vec!["fonts", "html"]);
    assert!(root.join("build/index.html").exists());
    assert!(root.join("build/fonts/b.woff").exists());
}
