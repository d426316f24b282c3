#[path = "../sample.rs"]
mod sample;

use clap::Parser;
use std::path::PathBuf;

/// Generate a demo roster and matching feedback PDFs.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Gmail address (or local part) used for plus addressing
    gmail: String,

    /// Output directory, recreated on every run
    #[arg(default_value = "sample-set")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let set = sample::create_sample_set(&args.out_dir, &args.gmail)?;
    println!(
        "Created sample set in {} ({} students)",
        set.root.display(),
        set.students.len()
    );
    Ok(())
}
