pub mod api;
mod app;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
mod pages;
pub mod personal;
pub mod storage;
pub mod timer;
pub mod types;
pub mod workout;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;
use leptos::*;

use app::App;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    let config = config::AppConfig::from_env();
    logging::init(config.log_level);
    tracing::info!(api = %config.api_base_url, "starting dumbbell");

    mount_to_body(move || view! { <App config=config/> });
}
