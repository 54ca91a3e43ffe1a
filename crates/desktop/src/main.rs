mod app;
mod cli;
mod settings;
mod startup;

use std::process;

use clap::Parser;

use cli::Cli;
use settings::Settings;
use startup::StartupError;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), StartupError> {
    let cli = Cli::parse();
    let settings = cli.apply(Settings::load());
    settings.validate().map_err(StartupError::InvalidSettings)?;
    if cli.save {
        settings.save().map_err(StartupError::SaveSettings)?;
    }

    let pipeline = startup::build_pipeline(&settings)?;
    app::run(pipeline, &settings)
}
