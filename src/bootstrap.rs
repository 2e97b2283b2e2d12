use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use log::{debug, info};
use tokio::time;

use crate::{
    config::{Config, LoadConfig},
    controller::SpeedController,
    interceptor,
    menu::Menu,
    page::{ElementRef, Page},
    reconciler::Reconciler,
    storage::Storage,
    store::SpeedStore,
};

const NAV_TAG: &str = "nav";
const PANEL_ATTR: (&str, &str) = ("data-testid", "player-controls");

// Keep this alive while the page is controlled; the button and menu listeners
// only hold weak references into it.
pub struct Integration {
    pub reconciler: Arc<Reconciler>,
    pub controller: Arc<SpeedController>,
    pub menu: Arc<Menu>,
}

pub async fn initialize(
    page: &Arc<Page>,
    storage: Arc<dyn Storage>,
    config: &Config,
) -> anyhow::Result<Integration> {
    wait_for_host_page(page, &config.load).await?;

    let panel = page.find_by_attr(PANEL_ATTR.0, PANEL_ATTR.1).context(
        "Could not locate the player control panel; try reloading the page",
    )?;

    interceptor::install_media_capture(page)?;

    let store = Arc::new(SpeedStore::new(storage, config.playback.clone()));
    let reconciler = Reconciler::attach(Arc::clone(&store), page);
    let controller = SpeedController::new(
        Arc::clone(page),
        Arc::clone(&store),
        Arc::clone(&reconciler),
    );
    let menu = Menu::new(
        Arc::clone(page),
        Arc::clone(&panel),
        config.playback.clone(),
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

    info!(
        "Speed control attached; restored playback speed {}x",
        controller.current_speed()
    );

    Ok(Integration {
        reconciler,
        controller,
        menu,
    })
}

async fn wait_for_host_page(page: &Arc<Page>, load: &LoadConfig) -> anyhow::Result<()> {
    for attempt in 1..=load.attempts.max(1) {
        if page.find_by_tag(NAV_TAG).is_some() {
            debug!("Host page ready after {attempt} attempt(s)");
            return Ok(());
        }
        if attempt < load.attempts {
            debug!(
                "Host page not ready yet (attempt {attempt}/{}); retrying in {}ms",
                load.attempts, load.delay_ms
            );
            time::sleep(Duration::from_millis(load.delay_ms)).await;
        }
    }
    Err(anyhow!(
        "The host page did not finish loading; try reloading the page"
    ))
}

// The player layout this crate relies on: a nav element as the load signal
// and the control panel the button attaches to.
pub fn attach_player_chrome(page: &Arc<Page>) -> ElementRef {
    let nav = page.create_element(NAV_TAG);
    page.append_child(page.body(), &nav);
    let panel = page.create_element("div");
    panel.set_attr(PANEL_ATTR.0, PANEL_ATTR.1);
    page.append_child(page.body(), &panel);
    panel
}
