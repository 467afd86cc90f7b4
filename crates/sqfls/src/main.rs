//
// main.rs
//
// Command-line entry point
//

use std::env;

use sqfls::cli::analysis_stats::{self, OutputFormat};

fn print_usage() {
    println!("sqfls {}, a static SQF analyzer.", env!("CARGO_PKG_VERSION"));
    print!(
        r#"
Usage: sqfls [OPTIONS]
       sqfls analysis-stats <path> [--twice] [--config <file>] [--csv | --json]

Available options:

--version                    Print the version
--help                       Print this help message

Subcommands:

analysis-stats               Index a workspace and report timings and counts

"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let Some(first) = argv.next() else {
        print_usage();
        return Ok(());
    };

    match first.as_str() {
        "analysis-stats" => {
            env_logger::init();
            let args = analysis_stats::parse_args(&mut argv).map_err(|e| anyhow::anyhow!(e))?;
            let results = analysis_stats::run_analysis_stats(&args).await?;
            match args.format {
                OutputFormat::Table => analysis_stats::print_results(&results),
                OutputFormat::Csv => analysis_stats::print_results_csv(&results),
                OutputFormat::Json => analysis_stats::print_results_json(&results)?,
            }
            Ok(())
        }
        "--version" => {
            println!("sqfls {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "--help" => {
            print_usage();
            Ok(())
        }
        other => Err(anyhow::anyhow!("Unknown argument: '{other}'")),
    }
}
