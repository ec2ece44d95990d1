use anyhow::Result;
use clap::{ColorChoice, Parser};
use fix_broken_img::cli::{self, Cli, Commands};
use fix_broken_img::config::FileConfig;
use fix_broken_img::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    logger::set_verbose(cli.verbose());

    let cwd = std::env::current_dir()?;
    let config = FileConfig::discover(&cli.config, &cwd)?;

    match &cli.command {
        Commands::Convert { args } => cli::convert::run(args, &config.widget),
        Commands::Build { args } => cli::build::run(args, &config),
    }
}
