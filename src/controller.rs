use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    page::{ClickListener, ElementRef, Page},
    reconciler::Reconciler,
    store::SpeedStore,
};

pub const BUTTON_ID: &str = "playback-speed-button";

pub struct SpeedController {
    page: Arc<Page>,
    store: Arc<SpeedStore>,
    reconciler: Arc<Reconciler>,
    button: Mutex<Option<ElementRef>>,
}

impl SpeedController {
    pub fn new(page: Arc<Page>, store: Arc<SpeedStore>, reconciler: Arc<Reconciler>) -> Arc<Self> {
        Arc::new(Self {
            page,
            store,
            reconciler,
            button: Mutex::new(None),
        })
    }

    pub fn current_speed(&self) -> f64 {
        self.store.get()
    }

    pub fn create_button(&self, panel: &ElementRef, on_click: ClickListener) {
        let button = self.page.create_element("button");
        button.set_attr("id", BUTTON_ID);
        button.set_attr("aria-label", "Change playback speed");
        button.add_click_listener(on_click);
        set_label(&button, self.store.get());
        self.page.prepend_child(panel, &button);
        *self.button.lock() = Some(button);
    }

    // Button label first, then persistence, then the tracked elements.
    pub fn update_speed(&self, speed: f64) {
        let button = self.button.lock().clone();
        if let Some(button) = &button {
            set_label(button, speed);
        }
        self.store.set(speed);
        self.reconciler.apply(speed);
    }
}

fn set_label(button: &ElementRef, speed: f64) {
    button.set_text(&format!("{speed} x"));
}

#[cfg(test)]
mod tests {
    use crate::{
        config::PlaybackConfig,
        interceptor,
        storage::{MemoryStorage, Storage},
        store::STORAGE_KEY,
    };

    use super::*;

    fn setup() -> (Arc<Page>, Arc<MemoryStorage>, Arc<SpeedController>) {
        let page = Page::new();
        interceptor::install_media_capture(&page).unwrap();
        let panel = page.create_element("div");
        page.append_child(page.body(), &panel);
        let storage = Arc::new(MemoryStorage::new());
        let store = Arc::new(SpeedStore::new(
            Arc::clone(&storage) as Arc<dyn Storage>,
            PlaybackConfig::default(),
        ));
        let reconciler = Reconciler::attach(Arc::clone(&store), &page);
        let controller = SpeedController::new(Arc::clone(&page), store, reconciler);
        controller.create_button(&panel, Arc::new(|_| {}));
        (page, storage, controller)
    }

    #[test]
    fn should_label_the_button_with_the_current_speed() {
        // given
        let (page, _storage, _controller) = setup();

        // then
        let button = page.find_by_attr("id", BUTTON_ID).unwrap();
        assert_eq!(button.text(), "1 x");
        assert_eq!(button.attr("aria-label").as_deref(), Some("Change playback speed"));
    }

    #[test]
    fn should_update_label_storage_and_media_elements() {
        // given
        let (page, storage, controller) = setup();
        let video = page.create_element("video");

        // when
        controller.update_speed(1.5);

        // then
        let button = page.find_by_attr("id", BUTTON_ID).unwrap();
        assert_eq!(button.text(), "1.5 x");
        assert_eq!(storage.read(STORAGE_KEY).unwrap(), Some("1.5".to_string()));
        assert_eq!(video.playback_rate(), 1.5);
        assert_eq!(controller.current_speed(), 1.5);
    }
}
