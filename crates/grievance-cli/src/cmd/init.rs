//! `grv init`: write a starter `config.toml` into the data directory.

use anyhow::Result;
use clap::Args;
use grievance_core::config;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.toml.
    #[arg(long)]
    pub force: bool,
}

#[derive(Serialize)]
struct InitResult {
    config: PathBuf,
}

pub fn run_init(args: &InitArgs, data_dir: &Path, output: OutputMode) -> Result<()> {
    let path = config::write_default_config(data_dir, args.force)?;
    tracing::info!(path = %path.display(), "wrote default config");

    render(output, &InitResult { config: path }, |r, w| {
        writeln!(w, "✓ wrote {}", r.config.display())?;
        writeln!(
            w,
            "  edit [sheets] script_url and [auth.users] before logging in"
        )
    })
}
