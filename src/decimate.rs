//! Anti-aliased decimation.
//!
//! Numeric columns are low-pass filtered with a windowed-sinc FIR before
//! subsampling, so frequency content above the new Nyquist frequency does not
//! alias the way it would under naive striding. Text columns are strided.

use crate::{Column, Result, SieveError, Table};

/// Windowed-sinc low-pass taps for a decimation factor k.
///
/// Cutoff sits at the post-decimation Nyquist frequency, 1/(2k) cycles per
/// sample. 10k+1 taps, Hamming window, normalized to unit DC gain so constant
/// signals pass through unchanged.
fn lowpass_taps(k: usize) -> Vec<f64> {
    let n = 10 * k + 1;
    let mid = (n / 2) as f64;
    let cutoff = 1.0 / (2.0 * k as f64);

    let mut taps = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 - mid;
        let sinc = if t == 0.0 {
            2.0 * cutoff
        } else {
            (2.0 * std::f64::consts::PI * cutoff * t).sin() / (std::f64::consts::PI * t)
        };
        let window = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
        taps.push(sinc * window);
    }

    let sum: f64 = taps.iter().sum();
    for tap in &mut taps {
        *tap /= sum;
    }
    taps
}

/// Convolve with a symmetric kernel, clamping at the edges so the output has
/// the same length and no phase shift. Quality near the edges degrades when
/// the input is short relative to the kernel; that is a known limitation of
/// the method, not guarded against here.
fn lowpass_filter(samples: &[f64], taps: &[f64]) -> Vec<f64> {
    let n = samples.len();
    let half = (taps.len() / 2) as isize;

    let mut out = Vec::with_capacity(n);
    for i in 0..n as isize {
        let mut acc = 0.0;
        for (j, tap) in taps.iter().enumerate() {
            let idx = (i + j as isize - half).clamp(0, n as isize - 1) as usize;
            acc += tap * samples[idx];
        }
        out.push(acc);
    }
    out
}

/// Low-pass filter a signal, then keep every k-th sample.
///
/// # Arguments
///
/// * `samples` - Input sequence of length N
/// * `k` - Decimation factor, must be >= 2
///
/// Output length is ceil(N/k). An empty input yields an empty output.
///
/// # Errors
///
/// Fails if k < 2 or if the input contains non-finite values, which would
/// poison the whole filtered sequence.
pub fn decimate_signal(samples: &[f64], k: usize) -> Result<Vec<f64>> {
    if k < 2 {
        return Err(SieveError::FactorTooSmall(k));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(pos) = samples.iter().position(|v| !v.is_finite()) {
        return Err(SieveError::FilterFailed {
            column: String::new(),
            reason: format!("non-finite value at row {pos}"),
        });
    }

    let taps = lowpass_taps(k);
    let filtered = lowpass_filter(samples, &taps);
    Ok(filtered.into_iter().step_by(k).collect())
}

/// Decimate a table by factor k with anti-aliasing on numeric columns.
///
/// Numeric columns go through [`decimate_signal`]; text columns are strided
/// with the same factor and row-selection rule. A filter failure aborts the
/// whole operation naming the failing column. Reassembly re-checks the
/// equal-length invariant and fails fast (naming every column and its length)
/// rather than ever producing a ragged table.
pub fn decimate_filtered(table: &Table, k: usize) -> Result<Table> {
    if k < 2 {
        return Err(SieveError::FactorTooSmall(k));
    }

    let mut columns = Vec::with_capacity(table.columns.len());
    for (name, col) in table.names.iter().zip(&table.columns) {
        let out = match col {
            Column::Numeric(v) => {
                Column::Numeric(decimate_signal(v, k).map_err(|e| match e {
                    SieveError::FilterFailed { reason, .. } => SieveError::FilterFailed {
                        column: name.clone(),
                        reason,
                    },
                    other => other,
                })?)
            }
            Column::Text(_) => col.stride(k),
        };
        columns.push(out);
    }

    Table::new(table.names.clone(), columns)
}
