//! `build`: bundle the widget script, once or on every change.

use super::args::BuildArgs;
use crate::bundle::{self, watch};
use crate::config::FileConfig;
use anyhow::{Context, Result};

pub fn run(args: &BuildArgs, config: &FileConfig) -> Result<()> {
    let bundle = args.apply(config.bundle.clone());

    if args.watch {
        watch::setup_shutdown_handler().context("cannot install Ctrl+C handler")?;
        watch::watch(&bundle)?;
    } else {
        bundle::build_and_log(&bundle)?;
    }
    Ok(())
}
