pub mod app;
pub mod ui;

use std::error::Error;

pub fn run(sources: &[String], volume: Option<f32>) -> Result<(), Box<dyn Error>> {
    app::run(sources, volume)
}
