use autobrowse_console::{BrowserConsole, ConsoleBridge};
use autobrowse_core::{Config, Paths};
use std::time::Duration;

pub async fn execute() -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;

    println!("autobrowse doctor");
    println!();

    let config_path = paths.config_file();
    if config_path.exists() {
        println!("✅ Config: {}", config_path.display());
    } else {
        println!("⚠️  Config: {} not found, using defaults", config_path.display());
    }

    if config.openai.api_key.is_empty() {
        println!("❌ API key: not set (openai.apiKey or OPENAI_API_KEY)");
    } else {
        println!("✅ API key: configured");
    }

    print!("   Browser console {} ... ", config.console.uri);
    let mut bridge = ConsoleBridge::new(&config.console.uri, Duration::from_secs(5));
    match bridge.fetch_markup().await {
        Ok(markup) => println!("✅ reachable ({} bytes of markup)", markup.len()),
        Err(e) => println!("❌ {}", e),
    }

    Ok(())
}
