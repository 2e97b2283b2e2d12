use std::process::ExitCode;

mod app;
mod bootstrap;
mod config;
mod controller;
mod interceptor;
mod menu;
mod page;
mod reconciler;
mod storage;
mod store;
mod utils;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let result = app::start().await;
    match result {
        Ok(..) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
