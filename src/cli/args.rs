//! Command-line interface definitions.

use crate::config::{BundleConfig, CONFIG_FILE, WidgetConfig};
use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Replace plain <img> elements with self-healing fix-broken-img elements
#[derive(Parser, Debug, Clone)]
#[command(name = "fix-broken-img", version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upwards from the current directory
    #[arg(short = 'C', long, global = true, default_value = CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Commands::Convert { args } => args.verbose,
            Commands::Build { args } => args.verbose,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Convert the images of HTML pages into fix-broken-img elements
    #[command(visible_alias = "c")]
    Convert {
        #[command(flatten)]
        args: ConvertArgs,
    },

    /// Bundle the widget script (development and minified builds)
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConvertArgs {
    /// HTML files or directories (walked for *.html)
    #[arg(value_name = "PATH", required = true, value_hint = clap::ValueHint::AnyPath)]
    pub paths: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "dist", value_hint = clap::ValueHint::DirPath)]
    pub output: PathBuf,

    /// Embed each element's rendered view as a declarative shadow root
    #[arg(short, long)]
    pub shadow: bool,

    /// Convert without writing any file
    #[arg(short, long)]
    pub dry: bool,

    /// Print a JSON report instead of log lines
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub widget: WidgetArgs,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// Overrides for `[widget]`, applied after the page's carrier element.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct WidgetArgs {
    /// Fallback background color
    #[arg(long)]
    pub background: Option<String>,

    /// Fallback text color
    #[arg(long)]
    pub text_color: Option<String>,

    /// Fallback text for images without alt
    #[arg(long)]
    pub default_text: Option<String>,

    /// Convert plain images automatically
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub auto_convert: Option<bool>,
}

impl WidgetArgs {
    pub fn apply(&self, mut config: WidgetConfig) -> WidgetConfig {
        if let Some(background) = &self.background {
            config.background = background.clone();
        }
        if let Some(color) = &self.text_color {
            config.text_color = color.clone();
        }
        if let Some(text) = &self.default_text {
            config.default_text = text.clone();
        }
        if let Some(auto_convert) = self.auto_convert {
            config.auto_convert = auto_convert;
        }
        config
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Rebuild whenever the widget source changes
    #[arg(short, long)]
    pub watch: bool,

    /// Widget source (overrides `bundle.input`)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Development bundle (overrides `bundle.output`)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Minified bundle (overrides `bundle.minified_output`)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub minified_output: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// CLI paths are relative to the current directory, not the config root.
    pub fn apply(&self, mut config: BundleConfig) -> BundleConfig {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(minified) = &self.minified_output {
            config.minified_output = minified.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_args() {
        let cli = Cli::parse_from([
            "fix-broken-img",
            "convert",
            "site",
            "--shadow",
            "--background",
            "#000",
            "--auto-convert",
            "false",
        ]);
        let Commands::Convert { args } = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.paths, vec![PathBuf::from("site")]);
        assert_eq!(args.output, PathBuf::from("dist"));
        assert!(args.shadow);

        let config = args.widget.apply(WidgetConfig::default());
        assert_eq!(config.background, "#000");
        assert!(!config.auto_convert);
        assert_eq!(config.text_color, "#666");
    }

    #[test]
    fn test_auto_convert_flag_without_value() {
        let cli = Cli::parse_from(["fix-broken-img", "c", "a.html", "--auto-convert"]);
        let Commands::Convert { args } = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.widget.auto_convert, Some(true));
    }

    #[test]
    fn test_build_overrides() {
        let cli = Cli::parse_from(["fix-broken-img", "build", "-w", "-i", "widget.js"]);
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
        let Commands::Build { args } = cli.command else {
            panic!("expected build");
        };
        assert!(args.watch);
        let config = args.apply(BundleConfig::default());
        assert_eq!(config.input, PathBuf::from("widget.js"));
        assert_eq!(config.output, PathBuf::from("dist/fix-broken-img.js"));
    }
}
