// SPDX-License-Identifier: BSD-3-Clause
//! Analyzer configuration. Everything process-wide is passed in here
//! explicitly; the engine keeps no global state.

use regex::RegexSet;

/// Functions whose calls neither write memory nor have observable side
/// effects, given as regular expressions over callee names.
#[derive(Debug)]
pub struct SafeFunctions {
    patterns: Vec<String>,
    set: RegexSet,
}

impl Default for SafeFunctions {
    fn default() -> Self {
        SafeFunctions {
            patterns: Vec::new(),
            set: RegexSet::new::<[String; 0], _>([]).unwrap(),
        }
    }
}

impl SafeFunctions {
    pub fn new(patterns: Vec<String>) -> Result<Self, regex::Error> {
        let set = RegexSet::new(&patterns)?;
        Ok(SafeFunctions { patterns, set })
    }

    pub fn matches(&self, func: &str) -> bool {
        self.set.is_match(func)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// On-disk configuration format.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConfigData {
    pub safe_functions: Vec<String>,
    pub max_passes: Option<u32>,
    pub trace_location: Option<u32>,
}

#[derive(Debug)]
pub struct Config {
    pub safe_functions: SafeFunctions,
    /// Upper bound on fixpoint passes per function.
    pub max_passes: u32,
    /// Opt-in: emit a debug event with the full snapshot whenever this
    /// location is visited.
    pub trace_location: Option<u32>,
}

pub const DEFAULT_MAX_PASSES: u32 = 20;

impl Default for Config {
    fn default() -> Self {
        Config {
            safe_functions: SafeFunctions::default(),
            max_passes: DEFAULT_MAX_PASSES,
            trace_location: None,
        }
    }
}

impl Config {
    pub fn new(data: ConfigData) -> Result<Self, regex::Error> {
        Ok(Config {
            safe_functions: SafeFunctions::new(data.safe_functions)?,
            max_passes: data.max_passes.unwrap_or(DEFAULT_MAX_PASSES),
            trace_location: data.trace_location,
        })
    }
}
