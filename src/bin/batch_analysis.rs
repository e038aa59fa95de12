use gpi_analysis::{process_shots, ShotFiles};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "batch_analysis",
    about = "Batch GPI diagnostics post-processing over a shot list"
)]
struct Opt {
    /// Path to the shot file repository
    path: String,
    /// Shot numbers to process
    #[structopt(required = true)]
    shots: Vec<u32>,
    /// Start of the time window [s]
    #[structopt(short, long)]
    start: f64,
    /// End of the time window [s]
    #[structopt(short, long)]
    end: f64,
    /// Save the per-shot archives to this directory
    #[structopt(long)]
    save: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opt = Opt::from_args();

    let files = ShotFiles::new(&opt.path);
    let reports = process_shots(&files, &opt.shots, opt.start, opt.end, opt.save.as_deref());

    let mut failures = 0;
    for report in &reports {
        match &report.result {
            Ok(summary) => println!(
                "shot {:>10}: f_GW {:6.3}, {:>3} dead pixels, {:>3} boundary points",
                report.shot,
                summary.greenwald_fraction,
                summary.dead_pixels,
                summary.envelope_points
            ),
            Err(e) => {
                failures += 1;
                println!("shot {:>10}: FAILED: {e}", report.shot);
            }
        }
    }
    println!(
        "{} shots processed, {} failed",
        reports.len() - failures,
        failures
    );
    Ok(())
}
