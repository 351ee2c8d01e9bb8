use owo_colors::OwoColorize;
use quran_lounge::config::Config;
use quran_lounge::library::Library;
use quran_lounge::selector::Selector;
use std::error::Error;

/// Sources named on the command line win over the configured allow-list.
pub fn source_filter(cli_sources: &[String], config: &Config) -> Option<Vec<String>> {
    if cli_sources.is_empty() {
        config.source_filter()
    } else {
        Some(cli_sources.to_vec())
    }
}

pub fn handle_pick(sources: &[String]) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let data_path = config.data_path()?;
    let library = Library::load(&data_path)
        .map_err(|e| format!("Could not load {}: {e}", data_path.display()))?;

    let allow = source_filter(sources, &config);
    if let Some(allow) = &allow {
        for unknown in library.unknown_sources(allow) {
            eprintln!("{} no source named '{unknown}'", "warning:".yellow());
        }
    }
    let mut selector = Selector::new(library.catalog, config.fade_table(), library.names);
    let selection = selector.select_random_collection(allow.as_deref())?;

    println!(
        "{} {} {}",
        "♪".cyan(),
        selection.name.bold(),
        format!("(#{})", selection.collection_id).dimmed()
    );
    println!("  source: {}", selection.source.green());
    println!(
        "  fade: in {}s, out {}s",
        selection.fade.fade_in, selection.fade.fade_out
    );
    println!("  entries: {}", selection.len());
    println!();

    for entry in &selection.entries {
        println!(
            "  {:>4}  {}  {} segments  {}",
            entry.local_position.yellow(),
            format!("seq {:>5}", entry.sequence_number).dimmed(),
            entry.segments().len(),
            entry.media_uri
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_sources_override_config() {
        let mut config = Config::new();
        assert!(source_filter(&[], &config).is_none());

        config.sources = vec!["A".to_string()];
        assert_eq!(source_filter(&[], &config), Some(vec!["A".to_string()]));

        let cli = vec!["B".to_string()];
        assert_eq!(source_filter(&cli, &config), Some(vec!["B".to_string()]));
    }
}
