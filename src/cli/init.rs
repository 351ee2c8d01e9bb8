use quran_lounge::config::Config;
use quran_lounge::constants::{SOURCES_DIR, TEXT_DIR};
use std::error::Error;
use std::fs;

pub fn handle_init() -> Result<(), Box<dyn Error>> {
    // Check if already initialized
    if Config::exists()? {
        return Err("Lounge is already initialized. Use 'lounge config set data_dir <path>' to move the data directory.".into());
    }

    let config = Config::new();
    let data_path = config.data_path()?;

    for dir in [SOURCES_DIR, TEXT_DIR] {
        let path = data_path.join(dir);
        if !path.exists() {
            println!("Creating {}", path.display());
            fs::create_dir_all(&path)?;
        } else if !path.is_dir() {
            return Err(format!("{} exists but is not a directory", path.display()).into());
        }
    }

    config.save()?;

    println!("Lounge initialized successfully!");
    println!("Data directory: {}", data_path.display());
    println!("  put one <source>.json per source in {SOURCES_DIR}/");
    println!("  put primary.json and secondary.json in {TEXT_DIR}/");
    println!(
        "Configuration saved to: {}",
        Config::config_path()?.display()
    );

    Ok(())
}
