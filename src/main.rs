use std::io;
use std::process;

use storyteller::{cli, utils, HubLoader, StorytellerBuilder, StorytellerConfig, VERSION};

const BANNER: &str = r#"
  ____  _                   _       _ _
 / ___|| |_ ___  _ __ _   _| |_ ___| | | ___ _ __
 \___ \| __/ _ \| '__| | | | __/ _ \ | |/ _ \ '__|
  ___) | || (_) | |  | |_| | ||  __/ | |  __/ |
 |____/ \__\___/|_|   \__, |\__\___|_|_|\___|_|
                      |___/
"#;

fn main() {
    println!("{}", BANNER);
    println!("📚 Storyteller v{}: story ideas and story openings", VERSION);

    let config = StorytellerConfig::default();
    if let Err(e) = utils::setup_logging(&config.logging) {
        eprintln!("Logging disabled: {}", e);
    }

    println!("⏳ Loading model '{}'...", config.model.model_id);
    let builder = StorytellerBuilder::new().with_config(config);

    if let Err(e) = cli::launch(builder, &HubLoader, io::stdin().lock(), io::stdout()) {
        if e.is_fatal() {
            eprintln!("\n❌ CRITICAL ERROR AT STARTUP: {}", e);
            eprintln!("The storyteller cannot work without its model. Exiting.");
        } else {
            eprintln!("\n❌ Unexpected error: {}", e);
        }
        process::exit(1);
    }
}
