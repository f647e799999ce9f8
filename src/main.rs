mod app;
mod codec;
mod config;
mod error;
mod geometry;
mod metadata;
mod model;
mod navigator;
mod platform;
mod raster;
mod render;
mod scan;
mod thumbnail;
mod viewport;

use clap::Parser;

fn main() -> iced::Result {
    env_logger::init();
    let settings = config::Settings::from_cli(config::Cli::parse());
    app::run(settings)
}
