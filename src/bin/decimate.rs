use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use datasieve::render::comparison_png;
use datasieve::{decimate, decimate_by_stride, stride_factor, Column, Table};

#[derive(Parser, Debug)]
struct Args {
    /// Input table (CSV or xlsx, header row first)
    input: PathBuf,
    /// Sampling rate the data was recorded at (Hz)
    #[arg(long, default_value_t = 10.0)]
    original_rate: f64,
    /// Sampling rate to decimate down to (Hz)
    #[arg(long, default_value_t = 1.0)]
    target_rate: f64,
    /// Low-pass filter numeric columns instead of naive striding
    #[arg(long)]
    filtered: bool,
    /// Output CSV path (default: <stem>_decimated_<k>x.csv)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Also export a before/after PNG of the first numeric column
    #[arg(long)]
    chart: Option<PathBuf>,
}

fn default_out_path(input: &Path, k: usize) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{stem}_decimated_{k}x.csv"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let k = stride_factor(args.original_rate, args.target_rate)?;

    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let filename = args.input.file_name().unwrap_or_default().to_string_lossy();
    let table = Table::from_upload(&filename, bytes)?;

    let out = if args.filtered {
        if k < 2 {
            bail!("decimation factor is {k}; nothing to do");
        }
        decimate::decimate_filtered(&table, k)?
    } else {
        decimate_by_stride(&table, k)
    };

    println!(
        "Decimated {} rows to {} rows (factor {k}:1)",
        table.num_rows(),
        out.num_rows()
    );

    let out_path = args.out.unwrap_or_else(|| default_out_path(&args.input, k));
    fs::write(&out_path, out.to_csv_string()?)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;

    println!("Saved: {}", out_path.display());

    if let Some(chart_path) = args.chart {
        let Some(idx) = table.columns.iter().position(Column::is_numeric) else {
            bail!("--chart requires at least one numeric column");
        };
        let (Column::Numeric(before), Column::Numeric(after)) =
            (&table.columns[idx], &out.columns[idx])
        else {
            unreachable!("numeric columns keep their type through decimation");
        };

        let png = comparison_png(before, after, k, &table.names[idx])?;
        fs::write(&chart_path, png)
            .with_context(|| format!("Failed to create {}", chart_path.display()))?;
        println!("Saved: {}", chart_path.display());
    }

    Ok(())
}
