//
// cli/mod.rs
//
// Command line subcommands
//

pub mod analysis_stats;
