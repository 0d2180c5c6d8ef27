// src/bin/heatmap.rs
//
// Interpolate a table of scattered (x, y, value) samples onto a regular grid
// and export the heatmap as PNG.
//
// Usage:
//   cargo run --bin heatmap -- samples.xlsx --resolution 100 --out heatmap.png

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use datasieve::interpolate::interpolate_to_grid;
use datasieve::render::heatmap_png;
use datasieve::{Column, Table};

#[derive(Parser, Debug)]
struct Args {
    /// Input table (CSV or xlsx, header row first)
    input: PathBuf,
    /// Grid nodes per axis
    #[arg(long, default_value_t = 100)]
    resolution: usize,
    /// Column index holding x coordinates (default: second column)
    #[arg(long, default_value_t = 1)]
    x_col: usize,
    /// Column index holding y coordinates (default: third column)
    #[arg(long, default_value_t = 2)]
    y_col: usize,
    /// Column index holding the scalar value (default: fourth column)
    #[arg(long, default_value_t = 3)]
    value_col: usize,
    #[arg(long, default_value = "heatmap.png")]
    out: PathBuf,
}

fn numeric_column<'t>(table: &'t Table, idx: usize) -> Result<&'t Vec<f64>> {
    let Some(col) = table.columns.get(idx) else {
        bail!(
            "column index {idx} out of range; table has {} columns",
            table.num_cols()
        );
    };
    match col {
        Column::Numeric(v) => Ok(v),
        Column::Text(_) => bail!("column '{}' is not numeric", table.names[idx]),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.resolution < 2 {
        bail!("--resolution must be >= 2");
    }

    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let filename = args.input.file_name().unwrap_or_default().to_string_lossy();
    let table = Table::from_upload(&filename, bytes)?;

    let x = numeric_column(&table, args.x_col)?;
    let y = numeric_column(&table, args.y_col)?;
    let z = numeric_column(&table, args.value_col)?;

    let surface = interpolate_to_grid(x, y, z, args.resolution)?;
    let png = heatmap_png(
        &surface,
        x,
        y,
        z,
        &table.names[args.x_col],
        &table.names[args.y_col],
        &table.names[args.value_col],
    )?;

    fs::write(&args.out, png)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;

    println!("Saved: {}", args.out.display());
    Ok(())
}
