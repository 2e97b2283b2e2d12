use std::sync::Arc;

use clap::Parser;
use log::{info, LevelFilter};

use crate::{
    bootstrap::{self, Integration},
    config::Config,
    controller::BUTTON_ID,
    page::Page,
    storage,
};

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[arg(
        short,
        long,
        help = "The path to the config file. The default is `config.toml`."
    )]
    pub config: Option<String>,

    #[arg(
        short,
        long,
        help = "The path to the speed store file. This overrides the value from the config file."
    )]
    pub store: Option<String>,
}

pub async fn start() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("TEMPOMAT_LOG")
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli_args(&cli)?;

    let page = Page::new();
    bootstrap::attach_player_chrome(&page);

    let storage = storage::from_config(&config.storage);
    let integration = bootstrap::initialize(&page, storage, &config).await?;

    run_session(&page, &integration);
    Ok(())
}

// Replays a short host-page session: capture, enforcement, menu selection.
fn run_session(page: &Arc<Page>, integration: &Integration) {
    let video = page.create_element("video");
    info!(
        "Host created a video element (hidden: {}); now tracking {} media element(s) at {}x",
        video.hidden(),
        integration.reconciler.tracked_len(),
        video.playback_rate()
    );

    // The host resets the rate on track change; the reconciler snaps it back.
    video.set_playback_rate(1.0);
    info!(
        "Host reset the playback rate; reconciled back to {}x",
        video.playback_rate()
    );

    // The user picks 1.5x from the menu.
    if let Some(button) = page.find_by_attr("id", BUTTON_ID) {
        page.click(&button);
        if let Some(entry) = page.find(|el| el.tag() == "button" && el.text() == "1.5x") {
            page.click(&entry);
        }
        info!(
            "Selected 1.5x from the menu; the button now reads '{}'",
            button.text()
        );
    }

    info!(
        "Playback speed is {}x and will be restored on the next run",
        integration.controller.current_speed()
    );
}
