// SPDX-License-Identifier: BSD-3-Clause
//! Value-relations analysis: drives the per-function fixpoint and exposes
//! the finalized snapshots through the location graph.

mod relations_analyzer;
pub(crate) mod structure;
pub mod value_relations;

pub use value_relations::{Handle, Val, ValueRelations};

use crate::config::Config;
use crate::graph::ModuleGraph;
use crate::ir::Module;

use relations_analyzer::FunctionAnalyzer;

#[derive(Clone, Debug)]
pub struct FunctionSummary {
    pub name: String,
    pub passes: u32,
    pub locations: usize,
}

/// What the fixpoint did, per function.
#[derive(Clone, Debug, Default)]
pub struct Summary {
    pub functions: Vec<FunctionSummary>,
    /// The largest pass count any function needed.
    pub max_passes: u32,
}

/// Analyze every function of `module` in place: each location's
/// [`ValueRelations`] snapshot in `graphs` is grown until a pass changes
/// nothing or the configured pass cap is reached. Graphs are final
/// afterwards and meant to be queried read-only.
pub fn analyze(module: &Module, graphs: &mut ModuleGraph, config: &Config) -> Summary {
    debug_assert_eq!(module.functions.len(), graphs.functions.len());

    let mut summary = Summary::default();
    for (func, graph) in module.functions.iter().zip(graphs.functions.iter_mut()) {
        let analyzer = FunctionAnalyzer::new(func, graph, config);
        let passes = analyzer.run(graph);
        summary.max_passes = summary.max_passes.max(passes);
        summary.functions.push(FunctionSummary {
            name: func.name.clone(),
            passes,
            locations: graph.num_locations(),
        });
    }
    summary
}
