use std::sync::Arc;

use tokio::sync::mpsc;

use egrab_core::engine::engine::{parse_catalog, DownloadSource, Engine, StaticEngine};
use egrab_core::engine::engine_iterator::{EngineCursor, EngineIterator, EngineList};

fn engines(names: &[&str]) -> Vec<Arc<dyn Engine>> {
    names
        .iter()
        .map(|n| Arc::new(StaticEngine::direct(*n, format!("https://example.com/{}", n))) as Arc<dyn Engine>)
        .collect()
}

// ---------------------------------------------------------------
// EngineList / EngineIterator
// ---------------------------------------------------------------

#[test]
fn test_empty_list_has_no_iterator() {
    assert!(EngineList::new(Vec::new()).is_none());
}

#[test]
fn test_iterator_walks_candidates_in_order() {
    let iter = EngineList::new(engines(&["a", "b", "c"])).unwrap().into_iterator();

    assert_eq!(iter.engine().name(), "a");
    assert!(iter.has_next());

    let iter = iter.next();
    assert_eq!(iter.engine().name(), "b");
    assert!(iter.has_next());

    let iter = iter.next();
    assert_eq!(iter.engine().name(), "c");
    assert!(!iter.has_next());
}

#[test]
fn test_single_candidate_has_no_next() {
    let iter: EngineIterator = EngineList::new(engines(&["only"])).unwrap().into();
    assert!(!iter.has_next());
    assert_eq!(iter.engine().name(), "only");
}

#[test]
#[should_panic(expected = "past the last candidate")]
fn test_next_past_end_fails_fast() {
    let iter = EngineList::new(engines(&["only"])).unwrap().into_iterator();
    let _ = iter.next();
}

#[test]
fn test_report_done_sends_current_engine_name() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut iter = EngineList::new(engines(&["a", "b"]))
        .unwrap()
        .with_done_reporter(tx)
        .into_iterator();

    iter.report_done();
    let mut iter = iter.next();
    iter.report_done();

    assert_eq!(rx.try_recv().unwrap(), "a");
    assert_eq!(rx.try_recv().unwrap(), "b");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_report_done_without_receiver_is_harmless() {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let mut iter = EngineList::new(engines(&["a"]))
        .unwrap()
        .with_done_reporter(tx)
        .into_iterator();
    iter.report_done();
}

#[test]
fn test_default_engine_falls_back_to_first_engine() {
    let mut iter = EngineList::new(engines(&["first", "second"]))
        .unwrap()
        .into_iterator()
        .next();
    assert_eq!(iter.set_default_engine(), "first");
}

#[test]
fn test_default_engine_uses_configured_label() {
    let mut iter = EngineList::new(engines(&["first"]))
        .unwrap()
        .with_default_engine("yt-dlp")
        .into_iterator();
    assert_eq!(iter.set_default_engine(), "yt-dlp");
}

// ---------------------------------------------------------------
// Custom cursors behind the erased handle
// ---------------------------------------------------------------

/// Endless mirror rotation bounded only by `remaining`.
struct Countdown {
    engine: StaticEngine,
    remaining: usize,
    label: String,
}

impl EngineCursor for Countdown {
    fn engine(&self) -> &dyn Engine {
        &self.engine
    }

    fn has_next(&self) -> bool {
        self.remaining > 0
    }

    fn move_to_next(&mut self) {
        self.remaining -= 1;
        self.engine = StaticEngine::direct(
            format!("mirror-{}", self.remaining),
            format!("https://mirror{}.example.com/tool", self.remaining),
        );
    }

    fn report_done(&mut self) {}

    fn default_engine_name(&mut self) -> &str {
        &self.label
    }
}

#[test]
fn test_any_cursor_can_be_erased() {
    let iter = EngineIterator::new(Countdown {
        engine: StaticEngine::direct("primary", "https://example.com/tool"),
        remaining: 2,
        label: "tool".to_string(),
    });

    let mut iter = iter.next().next();
    assert_eq!(iter.engine().name(), "mirror-0");
    assert!(!iter.has_next());
    assert_eq!(iter.set_default_engine(), "tool");
    assert!(format!("{:?}", iter).contains("mirror-0"));
}

// ---------------------------------------------------------------
// Engine catalog
// ---------------------------------------------------------------

#[test]
fn test_parse_catalog_preserves_order_and_sources() {
    let raw = r#"[
        {"name": "gh", "source": {"type": "release", "manifest_url": "https://api.example.com/latest", "asset": "linux"}, "exe_name": "tool"},
        {"name": "mirror", "source": {"type": "direct", "url": "https://mirror.example.com/tool.zip"}},
        {"name": "none"}
    ]"#;

    let catalog = parse_catalog(raw).unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog[0].name(), "gh");
    assert_eq!(catalog[0].exe_name(), Some("tool"));
    assert_eq!(
        catalog[0].download_source(),
        Some(DownloadSource::Release {
            manifest_url: "https://api.example.com/latest".to_string(),
            asset: "linux".to_string(),
        })
    );
    assert_eq!(
        catalog[1].download_source(),
        Some(DownloadSource::Direct {
            url: "https://mirror.example.com/tool.zip".to_string(),
        })
    );
    assert_eq!(catalog[2].download_source(), None);
}

#[test]
fn test_parse_catalog_rejects_unknown_source_type() {
    let raw = r#"[{"name": "x", "source": {"type": "ftp", "url": "ftp://x"}}]"#;
    assert!(parse_catalog(raw).is_err());
}
