use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{
    config::PlaybackConfig,
    controller::SpeedController,
    page::{ClickEvent, ElementRef, ListenerId, Page},
    utils::same_rate,
};

pub const MENU_ID: &str = "speed-menu";

struct OpenMenu {
    container: ElementRef,
    outside_listener: ListenerId,
}

pub struct Menu {
    self_ref: Weak<Menu>,
    page: Arc<Page>,
    panel: ElementRef,
    playback: PlaybackConfig,
    controller: Arc<SpeedController>,
    open: Mutex<Option<OpenMenu>>,
}

impl Menu {
    pub fn new(
        page: Arc<Page>,
        panel: ElementRef,
        playback: PlaybackConfig,
        controller: Arc<SpeedController>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            page,
            panel,
            playback,
            controller,
            open: Mutex::new(None),
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.lock().is_some()
    }

    pub fn toggle(&self, event: &ClickEvent) {
        // Keep the opening click away from the outside-click listener.
        event.stop_propagation();
        if self.is_open() {
            self.close();
        } else {
            self.open_menu();
        }
    }

    fn open_menu(&self) {
        let selected = self.controller.current_speed();

        let container = self.page.create_element("div");
        container.set_attr("id", MENU_ID);
        let title = self.page.create_element("span");
        title.set_text("Playback speed");
        self.page.append_child(&container, &title);

        let list = self.page.create_element("ul");
        list.set_attr("role", "menu");
        for speed in self.playback.steps() {
            let item = self.page.create_element("li");
            let entry = self.page.create_element("button");
            let active = same_rate(speed, selected);
            entry.set_attr("role", "menuitemradio");
            entry.set_attr("aria-checked", if active { "true" } else { "false" });
            entry.set_attr("tabindex", if active { "0" } else { "-1" });
            entry.set_text(&format!("{speed}x"));
            let menu = self.self_ref.clone();
            entry.add_click_listener(Arc::new(move |_event| {
                if let Some(menu) = menu.upgrade() {
                    menu.select(speed);
                }
            }));
            self.page.append_child(&item, &entry);
            self.page.append_child(&list, &item);
        }
        self.page.append_child(&container, &list);

        self.page.prepend_child(&self.panel, &container);

        let menu = self.self_ref.clone();
        let region = Arc::clone(&container);
        let outside_listener = self.page.add_click_listener(Arc::new(move |event| {
            if region.contains(event.target()) {
                return;
            }
            if let Some(menu) = menu.upgrade() {
                menu.close();
            }
        }));

        *self.open.lock() = Some(OpenMenu {
            container,
            outside_listener,
        });
    }

    fn select(&self, speed: f64) {
        self.close();
        self.controller.update_speed(speed);
    }

    pub fn close(&self) {
        let Some(open) = self.open.lock().take() else {
            return;
        };
        self.page.remove(&open.container);
        self.page.remove_click_listener(open.outside_listener);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        controller::BUTTON_ID, interceptor, reconciler::Reconciler, storage::MemoryStorage,
        store::SpeedStore,
    };

    use super::*;

    struct Fixture {
        page: Arc<Page>,
        menu: Arc<Menu>,
        button: ElementRef,
    }

    fn setup() -> Fixture {
        let page = Page::new();
        interceptor::install_media_capture(&page).unwrap();
        let panel = page.create_element("div");
        panel.set_attr("data-testid", "player-controls");
        page.append_child(page.body(), &panel);
        let store = Arc::new(SpeedStore::new(
            Arc::new(MemoryStorage::new()),
            PlaybackConfig::default(),
        ));
        let reconciler = Reconciler::attach(Arc::clone(&store), &page);
        let controller = SpeedController::new(Arc::clone(&page), store, reconciler);
        let menu = Menu::new(
            Arc::clone(&page),
            Arc::clone(&panel),
            PlaybackConfig::default(),
            Arc::clone(&controller),
        );
        let toggle_ref = Arc::downgrade(&menu);
        controller.create_button(
            &panel,
            Arc::new(move |event| {
                if let Some(menu) = toggle_ref.upgrade() {
                    menu.toggle(event);
                }
            }),
        );
        let button = page.find_by_attr("id", BUTTON_ID).unwrap();
        Fixture { page, menu, button }
    }

    fn menu_entry(page: &Arc<Page>, label: &str) -> ElementRef {
        page.find(|el| el.tag() == "button" && el.text() == label)
            .unwrap()
    }

    #[test]
    fn should_open_and_close_on_button_clicks() {
        // given
        let fixture = setup();

        // when
        fixture.page.click(&fixture.button);

        // then
        assert!(fixture.menu.is_open());
        assert!(fixture.page.find_by_attr("id", MENU_ID).is_some());

        // when clicked again
        fixture.page.click(&fixture.button);

        // then
        assert!(!fixture.menu.is_open());
        assert!(fixture.page.find_by_attr("id", MENU_ID).is_none());
    }

    #[test]
    fn should_list_every_grid_speed_and_mark_the_active_one() {
        // given
        let fixture = setup();
        fixture.page.click(&fixture.button);

        // then
        let container = fixture.page.find_by_attr("id", MENU_ID).unwrap();
        let list = fixture
            .page
            .find(|el| el.tag() == "ul" && container.contains(el))
            .unwrap();
        assert_eq!(list.children().len(), 31);
        let active = menu_entry(&fixture.page, "1x");
        assert_eq!(active.attr("aria-checked").as_deref(), Some("true"));
        assert_eq!(active.attr("tabindex").as_deref(), Some("0"));
        let inactive = menu_entry(&fixture.page, "1.5x");
        assert_eq!(inactive.attr("aria-checked").as_deref(), Some("false"));
    }

    #[test]
    fn should_close_on_clicks_outside_the_menu_region() {
        // given
        let fixture = setup();
        fixture.page.click(&fixture.button);
        assert!(fixture.menu.is_open());

        // when a click lands inside the menu
        let container = fixture.page.find_by_attr("id", MENU_ID).unwrap();
        let title = fixture
            .page
            .find(|el| el.tag() == "span" && container.contains(el))
            .unwrap();
        fixture.page.click(&title);

        // then it stays open
        assert!(fixture.menu.is_open());

        // when a click lands outside
        fixture.page.click(fixture.page.body());

        // then it closes
        assert!(!fixture.menu.is_open());
    }

    #[test]
    fn should_apply_the_selected_speed_and_close() {
        // given
        let fixture = setup();
        let video = fixture.page.create_element("video");
        fixture.page.click(&fixture.button);

        // when
        let entry = menu_entry(&fixture.page, "1.5x");
        fixture.page.click(&entry);

        // then
        assert!(!fixture.menu.is_open());
        assert_eq!(video.playback_rate(), 1.5);
        assert_eq!(fixture.button.text(), "1.5 x");

        // and reopening marks the new selection
        fixture.page.click(&fixture.button);
        let active = menu_entry(&fixture.page, "1.5x");
        assert_eq!(active.attr("aria-checked").as_deref(), Some("true"));
    }
}
