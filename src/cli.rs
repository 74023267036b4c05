//! CLI argument parsing for tracemint

use crate::config::{ExportVariant, MiningConfig, Mode};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tracemint")]
#[command(version)]
#[command(about = "Mine temporal invariants and behavioral models from logs", long_about = None)]
pub struct Cli {
    /// Regular expression with a TYPE group (and optional TIME, PID); repeatable, first match wins
    #[arg(short = 'r', long = "regexp", value_name = "REGEX")]
    pub regexps: Vec<String>,

    /// Lines matching this expression separate traces within a file
    #[arg(short = 's', long = "separator", value_name = "REGEX")]
    pub separator: Option<String>,

    /// Skip lines that match no expression instead of failing
    #[arg(short = 'i', long = "ignore-non-matching")]
    pub ignore_non_matching: bool,

    /// Trace key built from captured groups: `\k<NAME>` is replaced by the NAME group, `\k<FILE>` by the file name
    #[arg(
        short = 'm',
        long = "partition-mapping",
        value_name = "MAPPING",
        default_value = crate::parser::DEFAULT_PARTITION_MAPPING
    )]
    pub partition_mapping: String,

    /// Skip lines whose TIME, PID or channel fields do not parse instead of failing
    #[arg(long = "ignore-parse-errors")]
    pub ignore_parse_errors: bool,

    /// Print the fields extracted from every log line and exit
    #[arg(long = "debug-parse")]
    pub debug_parse: bool,

    /// Synthesis engine
    #[arg(long = "mode", value_enum)]
    pub mode: Option<Mode>,

    /// Build a k-tails model
    #[arg(long = "ktails")]
    pub ktails: bool,

    /// Lookahead for k-tails
    #[arg(long = "k-tail-length", value_name = "K")]
    pub k_tail_length: Option<usize>,

    /// Remove transitions no input trace exercises
    #[arg(long = "remove-spurious-edges")]
    pub remove_spurious_edges: bool,

    /// Minimize once after all intersections instead of after each
    #[arg(long = "no-minimize-intersections")]
    pub no_minimize_intersections: bool,

    /// Skip merging partitions after refinement
    #[arg(long = "no-coarsen")]
    pub no_coarsen: bool,

    /// Treat the input as a distributed system (per-process models plus global composition)
    #[arg(long = "distributed")]
    pub distributed: bool,

    /// Model variants to export (comma-separated)
    #[arg(long = "export", value_enum, value_delimiter = ',', value_name = "VARIANTS")]
    pub export: Option<Vec<ExportVariant>>,

    /// Ceiling on explored joint states during global composition
    #[arg(long = "max-states", value_name = "N")]
    pub max_states: Option<usize>,

    /// TOML configuration file; flags override its values
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the JSON result here instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Log files; each file holds one or more traces
    #[arg(value_name = "LOGS", required = true)]
    pub logs: Vec<PathBuf>,
}

impl Cli {
    /// Overlay the flags given on the command line onto `config`
    pub fn apply_to(&self, config: &mut MiningConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.ktails {
            config.perform_ktails = true;
        }
        if let Some(k) = self.k_tail_length {
            config.k_tail_length = k;
        }
        if self.remove_spurious_edges {
            config.remove_spurious_edges = true;
        }
        if self.no_minimize_intersections {
            config.minimize_intersections = false;
        }
        if self.no_coarsen {
            config.coarsen = false;
        }
        if self.distributed {
            config.distributed = true;
        }
        if let Some(export) = &self.export {
            config.export = export.clone();
        }
        if let Some(max) = self.max_states {
            config.max_explored_states = Some(max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_logs() {
        let cli = Cli::parse_from(["tracemint", "a.log", "b.log"]);
        assert_eq!(cli.logs.len(), 2);
        assert!(cli.regexps.is_empty());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_requires_logs() {
        assert!(Cli::try_parse_from(["tracemint"]).is_err());
    }

    #[test]
    fn test_cli_repeatable_regexp() {
        let cli = Cli::parse_from([
            "tracemint",
            "-r",
            r"^(?<TYPE>\w+)$",
            "--regexp",
            r"^x (?<TYPE>\w+)$",
            "-s",
            "^--$",
            "-i",
            "log",
        ]);
        assert_eq!(cli.regexps.len(), 2);
        assert_eq!(cli.separator.as_deref(), Some("^--$"));
        assert!(cli.ignore_non_matching);
        assert_eq!(cli.partition_mapping, r"\k<FILE>");
        assert!(!cli.debug_parse);
    }

    #[test]
    fn test_cli_parser_options() {
        let cli = Cli::parse_from([
            "tracemint",
            "-m",
            r"\k<SID>",
            "--ignore-parse-errors",
            "--debug-parse",
            "log",
        ]);
        assert_eq!(cli.partition_mapping, r"\k<SID>");
        assert!(cli.ignore_parse_errors);
        assert!(cli.debug_parse);
    }

    #[test]
    fn test_cli_export_list() {
        let cli = Cli::parse_from(["tracemint", "--export", "nfa,invariant-dfas", "log"]);
        assert_eq!(
            cli.export,
            Some(vec![ExportVariant::Nfa, ExportVariant::InvariantDfas])
        );
    }

    #[test]
    fn test_cli_mode() {
        let cli = Cli::parse_from(["tracemint", "--mode", "intersect", "log"]);
        assert_eq!(cli.mode, Some(Mode::Intersect));
        assert!(Cli::try_parse_from(["tracemint", "--mode", "bogus", "log"]).is_err());
    }

    #[test]
    fn test_apply_overrides_config() {
        let cli = Cli::parse_from([
            "tracemint",
            "--ktails",
            "--k-tail-length",
            "3",
            "--no-minimize-intersections",
            "--no-coarsen",
            "--remove-spurious-edges",
            "--distributed",
            "--max-states",
            "50",
            "log",
        ]);
        let mut config = MiningConfig::default();
        cli.apply_to(&mut config);
        assert!(config.perform_ktails);
        assert_eq!(config.k_tail_length, 3);
        assert!(!config.minimize_intersections);
        assert!(!config.coarsen);
        assert!(config.remove_spurious_edges);
        assert!(config.distributed);
        assert_eq!(config.max_explored_states, Some(50));
    }

    #[test]
    fn test_apply_keeps_unset_values() {
        let cli = Cli::parse_from(["tracemint", "log"]);
        let mut config = MiningConfig::strict();
        cli.apply_to(&mut config);
        assert_eq!(config, MiningConfig::strict());
    }

    #[test]
    fn test_cli_verbosity_flags() {
        let cli = Cli::parse_from(["tracemint", "-v", "--debug", "-o", "out.json", "log"]);
        assert!(cli.verbose);
        assert!(cli.debug);
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));
    }
}
