use gpi_analysis::{
    greenwald_fraction, DeadPixelFinder, EnvelopeEstimator, ShotFiles, DEFAULT_MINOR_RADIUS,
    DEFAULT_TIME_SAMPLES,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "gpi-analysis", about = "Per-shot GPI diagnostics post-processing")]
struct Opt {
    /// Path to the shot file repository
    path: String,
    /// Shot number
    shot: u32,
    /// Start of the time window [s]
    #[structopt(short, long)]
    start: f64,
    /// End of the time window [s]
    #[structopt(short, long)]
    end: f64,
    /// Number of boundary sample instants
    #[structopt(short = "n", long, default_value = "50")]
    samples: usize,
    /// Minor radius [m] for the Greenwald limit
    #[structopt(long)]
    minor_radius: Option<f64>,
    /// Save the envelope and dead-pixel archives to this directory
    #[structopt(long)]
    save: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opt = Opt::from_args();

    let files = ShotFiles::new(&opt.path);

    let mut estimator = EnvelopeEstimator::new(&files, opt.shot)
        .start_time(opt.start)
        .end_time(opt.end);
    if opt.samples != DEFAULT_TIME_SAMPLES {
        estimator = estimator.samples(opt.samples);
    }
    let envelope = estimator.estimate()?;
    let dead = DeadPixelFinder::new(&files, opt.shot).find()?;
    let fraction = greenwald_fraction(
        &files,
        opt.shot,
        opt.start,
        opt.end,
        opt.minor_radius.unwrap_or(DEFAULT_MINOR_RADIUS),
    )?;

    println!("SUMMARY:");
    println!(" - shot: {}", opt.shot);
    println!(" - time window: [{:8.3}-{:8.3}]s", opt.start, opt.end);
    println!(" - Greenwald fraction: {:.3}", fraction);
    println!(" - dead pixels: {}", dead.n_dead());
    println!(" - LCFS radial band [cm]:");
    let j_mid = envelope.len() / 2;
    println!(
        "    midplane: min {:7.3}  mean {:7.3}  max {:7.3}",
        envelope.r_min[j_mid], envelope.r_mean[j_mid], envelope.r_max[j_mid]
    );

    if let Some(dir) = opt.save {
        let path = envelope.to_npz(&dir)?;
        println!(" - envelope archive: {}", path.display());
        let path = dead.to_npz(&dir)?;
        println!(" - dead-pixel archive: {}", path.display());
    }
    Ok(())
}
