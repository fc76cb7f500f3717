mod app;
mod config;
mod input;
mod logging;
mod model;
mod render;
mod scheduler;
mod sim;
mod storage;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
