//! Block-averaging statistics over estimator output series.
//!
//! MD samples are serially correlated, so the naive standard error of the
//! per-step series underestimates the true uncertainty. Block averaging
//! groups consecutive steps into blocks large enough to decorrelate,
//! treats the block means as independent samples, and reports their
//! standard error. The lag-1 autocorrelation of the block means is kept
//! as a diagnostic: values near zero confirm the block size was large
//! enough.

use crate::hma::error::Error;
use crate::hma::estimator::StepResult;

/// Ensemble average, uncertainty, and correlation diagnostic for one
/// observable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    /// Mean of the raw post-equilibration samples, block-size independent.
    pub avg: f64,
    /// Standard error of the mean estimated from block means.
    pub err: f64,
    /// Lag-1 autocorrelation of the block means.
    ///
    /// The numerator is normalized by `n - 1` while the denominator is
    /// the population variance; this asymmetric historical convention is
    /// preserved exactly. A zero-variance series yields NaN here, never
    /// an error.
    pub cor: f64,
}

/// Block statistics for the four anharmonic observables of one run.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    /// Conventional anharmonic energy.
    pub e_ah_conv: Stats,
    /// HMA anharmonic energy.
    pub e_ah_hma: Stats,
    /// Conventional anharmonic pressure.
    pub p_ah_conv: Stats,
    /// HMA anharmonic pressure.
    pub p_ah_hma: Stats,
    /// Number of production samples after the equilibration cut.
    pub production_steps: usize,
    /// Number of full blocks the error estimate is based on.
    pub blocks: usize,
}

/// Computes block statistics for every observable of a result series.
///
/// The first `steps_eq` samples are discarded as equilibration. The
/// average is taken over all remaining raw samples; the error and
/// correlation come from means of consecutive `blocksize`-sample blocks,
/// with any trailing partial block dropped.
///
/// # Errors
///
/// Returns [`Error::InvalidStepRange`] if `steps_eq` leaves no
/// production samples, and [`Error::InsufficientBlocks`] if fewer than
/// two full blocks remain (or `blocksize` is zero). Failing early keeps
/// the variance estimate well-defined; a degenerate request never
/// produces NaN errors.
pub fn summarize(
    series: &[StepResult],
    steps_eq: usize,
    blocksize: usize,
) -> Result<Summary, Error> {
    let steps_tot = series.len();
    if steps_eq >= steps_tot {
        return Err(Error::InvalidStepRange {
            requested: steps_eq,
            available: steps_tot,
        });
    }
    let production = &series[steps_eq..];

    if blocksize == 0 {
        return Err(Error::InsufficientBlocks {
            blocks: 0,
            blocksize,
        });
    }
    let blocks = production.len() / blocksize;
    if blocks < 2 {
        return Err(Error::InsufficientBlocks { blocks, blocksize });
    }

    Ok(Summary {
        e_ah_conv: observable_stats(production, blocksize, |r| r.e_ah_conv),
        e_ah_hma: observable_stats(production, blocksize, |r| r.e_ah_hma),
        p_ah_conv: observable_stats(production, blocksize, |r| r.p_ah_conv),
        p_ah_hma: observable_stats(production, blocksize, |r| r.p_ah_hma),
        production_steps: production.len(),
        blocks,
    })
}

fn observable_stats(
    production: &[StepResult],
    blocksize: usize,
    field: impl Fn(&StepResult) -> f64,
) -> Stats {
    let samples: Vec<f64> = production.iter().map(field).collect();
    scalar_stats(&samples, blocksize)
}

/// Block statistics over one scalar series. The series must contain at
/// least two full blocks; [`summarize`] guarantees that.
fn scalar_stats(samples: &[f64], blocksize: usize) -> Stats {
    let avg = mean(samples);

    let mut block_means = Vec::with_capacity(samples.len() / blocksize);
    for block in samples.chunks_exact(blocksize) {
        block_means.push(mean(block));
    }

    let center = mean(&block_means);
    let n = block_means.len() as f64;

    let sum_sq: f64 = block_means.iter().map(|x| (x - center).powi(2)).sum();
    // Standard error from the Bessel-corrected variance of block means.
    let err = (sum_sq / (n - 1.0)).sqrt() / n.sqrt();

    // Lag-1 autocorrelation, numerator over n-1 but denominator the
    // population variance. Kept asymmetric to match the established
    // convention for this diagnostic.
    let lag1: f64 = block_means
        .windows(2)
        .map(|w| (w[0] - center) * (w[1] - center))
        .sum::<f64>()
        / (n - 1.0);
    let cor = lag1 / (sum_sq / n);

    Stats { avg, err, cor }
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}
