mod app;
mod utils;
mod api;
mod bus;
mod sync;
mod ui;
mod storage;

use adw::prelude::*;
use adw::Application;
use log::warn;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Application::builder()
        .application_id("org.crumbshare.CrumbShareGtk")
        .build();
    app.connect_activate(|app| {
        if let Err(e) = crate::storage::init() {
            warn!("local cache unavailable: {e}");
        }
        crate::app::build_ui(app);
    });
    app.run();
}
