use std::sync::{Arc, Weak};

use log::debug;
use parking_lot::Mutex;

use crate::{
    page::{Element, ElementRef, Page},
    store::SpeedStore,
    utils::same_rate,
};

pub struct Reconciler {
    store: Arc<SpeedStore>,
    tracked: Mutex<Vec<Weak<Element>>>,
}

impl Reconciler {
    pub fn attach(store: Arc<SpeedStore>, page: &Arc<Page>) -> Arc<Self> {
        let reconciler = Arc::new(Self {
            store,
            tracked: Mutex::new(Vec::new()),
        });
        for element in page.media_elements() {
            reconciler.track(&element);
        }
        let observer_ref = Arc::clone(&reconciler);
        page.observe_children(Arc::new(move |mutation| {
            for added in &mutation.added {
                if added.is_media() {
                    observer_ref.track(added);
                }
            }
            for removed in &mutation.removed {
                observer_ref.untrack(removed);
            }
        }));
        reconciler
    }

    // The enforcement listener is attached at most once per element, however
    // often it re-enters the tree.
    fn track(&self, element: &ElementRef) {
        {
            let mut tracked = self.tracked.lock();
            let already_tracked = tracked
                .iter()
                .any(|weak| weak.upgrade().is_some_and(|el| Arc::ptr_eq(&el, element)));
            if already_tracked {
                return;
            }
            tracked.push(Arc::downgrade(element));
        }
        debug!("Tracking a {} element", element.tag());
        if !element.mark_monitored() {
            let store = Arc::clone(&self.store);
            element.add_media_listener(Arc::new(move |element, _event| {
                let expected = store.get();
                if !same_rate(element.playback_rate(), expected) {
                    debug!(
                        "Correcting the playback rate of a {} element from {} to {expected}",
                        element.tag(),
                        element.playback_rate()
                    );
                    element.set_playback_rate(expected);
                }
            }));
        }
        let expected = self.store.get();
        if !same_rate(element.playback_rate(), expected) {
            element.set_playback_rate(expected);
        }
    }

    fn untrack(&self, element: &ElementRef) {
        self.tracked.lock().retain(|weak| {
            weak.upgrade()
                .is_some_and(|el| !Arc::ptr_eq(&el, element))
        });
    }

    pub fn apply(&self, speed: f64) {
        for element in self.live_tracked() {
            element.set_playback_rate(speed);
        }
    }

    pub fn tracked_len(&self) -> usize {
        self.live_tracked().len()
    }

    fn live_tracked(&self) -> Vec<ElementRef> {
        let mut tracked = self.tracked.lock();
        tracked.retain(|weak| weak.strong_count() > 0);
        tracked.iter().filter_map(Weak::upgrade).collect()
    }
}
