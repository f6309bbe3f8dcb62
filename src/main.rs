mod app;
mod config;
mod grid;
mod input;
mod logging;
mod noise;
mod palette;
mod panel;
mod params;
mod render;
mod surface;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
