use std::error::Error;

pub fn handle_play(sources: &[String], volume: Option<f32>) -> Result<(), Box<dyn Error>> {
    if let Some(volume) = volume
        && !(0.0..=1.0).contains(&volume)
    {
        return Err("Volume must be between 0 and 1".into());
    }

    #[cfg(feature = "player")]
    {
        crate::player::run(sources, volume)
    }

    #[cfg(not(feature = "player"))]
    {
        let _ = sources;
        use owo_colors::OwoColorize;
        println!("{} {}", "♪".cyan(), "Lounge Player".bold());
        println!();
        println!(
            "{} The player requires the 'player' feature to be enabled.",
            "Note:".yellow()
        );
        println!();
        println!("If building from source:");
        println!("  {}", "cargo build --release --features player".cyan());

        Ok(())
    }
}
