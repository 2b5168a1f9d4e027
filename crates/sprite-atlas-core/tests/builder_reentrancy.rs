use image::{Rgba, RgbaImage};
use sprite_atlas_core::{AtlasBuilder, AtlasError, BuildConfig, SourceEntry};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

fn entries() -> Vec<SourceEntry> {
    vec![SourceEntry::from_rgba(
        "dot",
        RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255])),
    )]
}

#[test]
fn observers_run_once_per_successful_build() {
    let builder = AtlasBuilder::new(BuildConfig::default());
    assert_eq!(builder.config().max_width, BuildConfig::default().max_width);
    let calls = Arc::new(AtomicUsize::new(0));
    let sprites_seen = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        let sprites_seen = Arc::clone(&sprites_seen);
        builder.subscribe(move |c| {
            calls.fetch_add(1, Ordering::SeqCst);
            sprites_seen.store(c.sprites.len(), Ordering::SeqCst);
        });
    }

    builder.build(&entries()).expect("build");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sprites_seen.load(Ordering::SeqCst), 1);

    let too_big = SourceEntry::from_rgba("big", RgbaImage::from_pixel(2048, 8, Rgba([0, 0, 0, 255])));
    assert!(builder.build(&[too_big]).is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn nested_build_from_observer_is_rejected() {
    let builder = Arc::new(AtlasBuilder::new(BuildConfig::default()));
    let nested: Arc<Mutex<Option<AtlasError>>> = Arc::new(Mutex::new(None));
    let in_progress = Arc::new(Mutex::new(false));
    {
        let weak = Arc::downgrade(&builder);
        let nested = Arc::clone(&nested);
        let in_progress = Arc::clone(&in_progress);
        builder.subscribe(move |_| {
            let Some(b) = weak.upgrade() else { return };
            *in_progress.lock().unwrap() = b.is_building();
            if let Err(e) = b.build(&entries()) {
                *nested.lock().unwrap() = Some(e);
            }
        });
    }

    builder.build(&entries()).expect("outer build");
    assert_eq!(*nested.lock().unwrap(), Some(AtlasError::ReentrantBuild));
    assert!(*in_progress.lock().unwrap());
    assert!(!builder.is_building());
}

#[test]
fn concurrent_builds_on_one_builder_never_overlap() {
    let builder = Arc::new(AtlasBuilder::new(BuildConfig::default()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let builder = Arc::clone(&builder);
            std::thread::spawn(move || builder.build(&entries()))
        })
        .collect();
    for h in handles {
        match h.join().expect("thread") {
            Ok(c) => assert_eq!(c.sprites.len(), 1),
            Err(e) => assert_eq!(e, AtlasError::ReentrantBuild),
        }
    }
    assert!(!builder.is_building());
}

#[test]
fn observer_can_subscribe_further_observers() {
    let builder = Arc::new(AtlasBuilder::new(BuildConfig::default()));
    let late_calls = Arc::new(AtomicUsize::new(0));
    {
        let weak = Arc::downgrade(&builder);
        let late_calls = Arc::clone(&late_calls);
        let subscribed = AtomicBool::new(false);
        builder.subscribe(move |_| {
            let Some(b) = weak.upgrade() else { return };
            if subscribed.swap(true, Ordering::SeqCst) {
                return;
            }
            let late_calls = Arc::clone(&late_calls);
            b.subscribe(move |_| {
                late_calls.fetch_add(1, Ordering::SeqCst);
            });
        });
    }

    let (tx, rx) = mpsc::channel();
    {
        let builder = Arc::clone(&builder);
        let late_calls = Arc::clone(&late_calls);
        std::thread::spawn(move || {
            let first = builder.build(&entries()).map(|_| late_calls.load(Ordering::SeqCst));
            let second = builder.build(&entries()).map(|_| late_calls.load(Ordering::SeqCst));
            let _ = tx.send((first, second));
        });
    }
    let (first, second) = rx.recv_timeout(Duration::from_secs(10)).expect("builds finish");
    // The late observer only runs from the build after it was registered.
    assert_eq!(first, Ok(0));
    assert_eq!(second, Ok(1));
    assert!(!builder.is_building());
}
