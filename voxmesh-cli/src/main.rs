use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use voxmesh_cli::{run, Args, RunOutcome};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.is_verbose());

    match run(&args)? {
        RunOutcome::Single(report) => {
            if args.is_verbose() {
                println!(
                    "{}: {} vertices, {} triangles at isolevel {}",
                    args.output.display(),
                    report.vertices,
                    report.triangles,
                    report.isolevel
                );
            }
        }
        RunOutcome::Atlas(summary) => {
            println!("Converted {} regions of interest", summary.converted);
        }
    }
    Ok(())
}
