// SPDX-License-Identifier: BSD-3-Clause
use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

use tracing_flame::FlameLayer;
use tracing_subscriber::{fmt, prelude::*};

use yavra::{analysis, config, graph::Input, Config};

mod cli;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn setup_global_subscriber() -> impl Drop {
    let filter_layer = tracing::level_filters::LevelFilter::TRACE;
    let fmt_layer = fmt::Layer::default();
    let (flame_layer, _guard) = FlameLayer::with_file("./tracing.folded").unwrap();
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(flame_layer)
        .init();
    _guard
}

fn main() -> Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let args = cli::Args::parse();

    let _guard = if args.tracing {
        Some(setup_global_subscriber())
    } else {
        None
    };

    let mut config_data = if let Some(config_path) = &args.config {
        let config_string =
            std::fs::read_to_string(config_path).context("Couldn't read configuration")?;
        serde_json::from_str::<config::ConfigData>(&config_string)
            .context("Couldn't deserialize configuration")?
    } else {
        config::ConfigData::default()
    };
    if args.max_passes.is_some() {
        config_data.max_passes = args.max_passes;
    }
    if args.trace_location.is_some() {
        config_data.trace_location = args.trace_location;
    }
    let config = Config::new(config_data).context("Couldn't compile safe-function patterns")?;

    let input_string =
        std::fs::read_to_string(&args.module).with_context(|| {
            format!("Couldn't read module at {}", args.module.display())
        })?;
    let Input { module, mut graphs } =
        serde_json::from_str(&input_string).context("Couldn't deserialize module")?;
    module.validate().context("Malformed module")?;
    graphs.validate(&module).context("Malformed location graph")?;

    let summary = analysis::analyze(&module, &mut graphs, &config);

    if !args.quiet {
        let mut stdout = io::stdout().lock();
        for (func, graph) in module.functions.iter().zip(&graphs.functions) {
            writeln!(stdout, "{}", func.name)?;
            writeln!(stdout, "{}", "-".repeat(func.name.len()))?;
            for (id, location) in graph.locations() {
                writeln!(stdout, "{}:", id)?;
                write!(stdout, "{}", location.relations)?;
            }
            writeln!(stdout)?;
        }
    }

    if args.debug {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "summary")?;
        writeln!(stdout, "-------")?;
        for f in &summary.functions {
            writeln!(
                stdout,
                "{}: {} locations, {} passes",
                f.name, f.locations, f.passes
            )?;
        }
        writeln!(stdout, "max passes: {}", summary.max_passes)?;
    }

    Ok(())
}
