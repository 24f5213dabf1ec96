//! Graph-based anomaly detection CLI.
//!
//! Provides the `ganom` binary: loads a labeled graph, optionally
//! compresses predefined substructures away, then repeatedly discovers the
//! normative pattern, runs the selected anomaly search, and compresses the
//! graph by the pattern. Reports go to stdout, diagnostics to stderr.
//!
//! Exit codes: 0 = success, 1 = any fatal error (malformed input, option
//! misuse).

use std::io::Write as _;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ganom_core::LabelRegistry;
use ganom_io::{parse, read_graph_file, write_discoveries, write_graph};

mod options;
mod run;

use options::Cli;
use run::run_pipeline;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    process::exit(run(&cli));
}

/// Executes the run. Returns the process exit code.
fn run(cli: &Cli) -> i32 {
    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut labels = LabelRegistry::new();
    let parsed = match read_graph_file(&cli.graph, &mut labels, !cli.undirected) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut predefined = parsed.predefined;
    if let Some(ps_path) = &cli.ps {
        match std::fs::read_to_string(ps_path) {
            Ok(text) => match parse(&text, &mut labels, !cli.undirected) {
                Ok(ps) => {
                    if ps.predefined.is_empty() && !ps.graph.is_empty() {
                        // A bare graph in the ps file is a single pattern.
                        predefined.push(ps.graph);
                    } else {
                        predefined.extend(ps.predefined);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}: {}", ps_path.display(), e);
                    return 1;
                }
            },
            Err(e) => {
                eprintln!("Error: cannot read {}: {}", ps_path.display(), e);
                return 1;
            }
        }
    }

    let outcome = run_pipeline(parsed.graph, labels, &predefined, &config);
    print!("{}", outcome.printed);

    if cli.compress {
        let cmp_path = PathBuf::from(format!("{}.cmp", cli.graph.display()));
        if let Err(e) = write_to(&cmp_path, |w| {
            write_graph(w, &outcome.host, &outcome.labels)
        }) {
            eprintln!("Error: cannot write {}: {}", cmp_path.display(), e);
            return 1;
        }
    }
    if let Some(out_path) = &cli.out {
        if let Err(e) = write_to(out_path, |w| {
            write_discoveries(w, &outcome.discoveries, &outcome.labels)
        }) {
            eprintln!("Error: cannot write {}: {}", out_path.display(), e);
            return 1;
        }
    }
    if let Some(dot_path) = &cli.dot {
        let dot = outcome.dot.clone().unwrap_or_default();
        if let Err(e) = std::fs::write(dot_path, dot) {
            eprintln!("Error: cannot write {}: {}", dot_path.display(), e);
            return 1;
        }
    }

    0
}

fn write_to<F>(path: &std::path::Path, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut std::io::BufWriter<std::fs::File>) -> std::io::Result<()>,
{
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write(&mut writer)?;
    writer.flush()
}
