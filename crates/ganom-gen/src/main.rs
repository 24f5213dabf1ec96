//! Substructure graph generator CLI.
//!
//! Reads a parameter file describing a substructure, label distributions,
//! and deviation settings, and writes `<file>.graph` (the generated host
//! graph) and `<file>.insts` (the embedded instances with their deviations).
//! The same file and seed always produce the same graph.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use ganom_gen::{generate, parse_params, write_instances};

/// Substructure graph generator.
#[derive(Parser)]
#[command(name = "ganomgen", about = "Generate graphs with embedded substructures")]
struct Cli {
    /// Parameter file describing the graph to generate.
    file: PathBuf,

    /// Random seed.
    #[arg(default_value_t = 1)]
    seed: u64,
}

fn main() {
    let cli = Cli::parse();
    process::exit(run(&cli.file, cli.seed));
}

/// Returns the process exit code: 0 on success, 1 on any failure.
fn run(file: &PathBuf, seed: u64) -> i32 {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: unable to open {}: {}", file.display(), e);
            return 1;
        }
    };
    let params = match parse_params(&text) {
        Ok(params) => params,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let generated = generate(&params, seed);

    let graph_path = file.with_extension(append_extension(file, "graph"));
    let insts_path = file.with_extension(append_extension(file, "insts"));

    if let Err(e) = write_file(&graph_path, |w| {
        ganom_io::write_graph(w, &generated.graph, &generated.labels)
    }) {
        eprintln!("Error: unable to write {}: {}", graph_path.display(), e);
        return 1;
    }
    if let Err(e) = write_file(&insts_path, |w| write_instances(w, &generated)) {
        eprintln!("Error: unable to write {}: {}", insts_path.display(), e);
        return 1;
    }

    println!(
        "wrote {} ({} vertices, {} edges, {} instances)",
        graph_path.display(),
        generated.graph.vertex_count(),
        generated.graph.edge_count(),
        generated.instances.len()
    );
    0
}

/// `foo.params` -> `params.graph` suffix handling: keep the original
/// extension as part of the stem, mirroring the `<file>.graph` contract.
fn append_extension(file: &PathBuf, ext: &str) -> String {
    match file.extension().and_then(|e| e.to_str()) {
        Some(existing) => format!("{}.{}", existing, ext),
        None => ext.to_string(),
    }
}

fn write_file<F>(path: &std::path::Path, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut std::io::BufWriter<std::fs::File>) -> std::io::Result<()>,
{
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write(&mut writer)?;
    use std::io::Write as _;
    writer.flush()
}
