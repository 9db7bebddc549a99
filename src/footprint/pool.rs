//! Bounded parallel footprint extraction.

use rayon::prelude::*;
use tracing::{debug, warn};

use super::{Footprint, FootprintExtractor};
use crate::error::ExtractionError;

/// Default number of extraction workers.
pub const DEFAULT_MAX_THREADS: usize = 20;

/// Outcome of a batch extraction.
///
/// Successes and failures each keep the order of the input references.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub footprints: Vec<Footprint>,
    pub failures: Vec<ExtractionError>,
}

impl ExtractionReport {
    /// True if every reference was extracted.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Extract footprints for all references on a pool of `max_threads` workers.
///
/// A failing reference never aborts the batch: it is logged and reported in
/// [`ExtractionReport::failures`].
pub fn get_footprints<E, S>(references: &[S], extractor: &E, max_threads: usize) -> ExtractionReport
where
    E: FootprintExtractor + ?Sized,
    S: AsRef<str> + Sync,
{
    let run = || -> Vec<Result<Footprint, ExtractionError>> {
        references
            .par_iter()
            .map(|reference| extractor.extract(reference.as_ref()))
            .collect()
    };

    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(max_threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(e) => {
            warn!(error = %e, "Failed to build extraction pool, using the global pool");
            run()
        }
    };

    let mut report = ExtractionReport::default();
    for result in results {
        match result {
            Ok(footprint) => report.footprints.push(footprint),
            Err(e) => {
                warn!(reference = %e.reference, reason = %e.reason, "Footprint extraction failed");
                report.failures.push(e);
            }
        }
    }

    debug!(
        succeeded = report.footprints.len(),
        failed = report.failures.len(),
        "Footprint extraction finished"
    );

    report
}
