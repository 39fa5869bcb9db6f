// SPDX-License-Identifier: BSD-3-Clause
use std::path::PathBuf;

/// Value-relations analysis for compiler IR modules
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Module and location graph (JSON)
    #[arg()]
    pub module: PathBuf,

    /// Analyzer configuration (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum fixpoint passes per function (overrides the configuration)
    #[arg(long)]
    pub max_passes: Option<u32>,

    /// Emit a debug event whenever this location id is visited
    #[arg(long)]
    pub trace_location: Option<u32>,

    /// Print the per-function pass summary
    #[arg(long)]
    pub debug: bool,

    /// Quiet
    #[arg(long)]
    pub quiet: bool,

    /// Tracing
    #[arg(long)]
    pub tracing: bool,
}
