//! `ots status`: a one-line verification summary, for scripting

use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::verifier::Collaborators;

/// Report `file`'s verification status as a single line
///
/// # Errors
///
/// Returns an error under the same conditions as [`super::verify::execute`].
///
/// Returns `Ok(true)` if the timestamp is `overall_valid`, `Ok(false)` otherwise.
pub async fn execute(file: &Path, target: Option<&Path>, config: &Config) -> Result<bool> {
    let raw = std::fs::read(file)?;
    let (detached, document) = super::load_detached_and_document(file, target, &raw)?;

    let collaborators = Collaborators::new(config)?;
    let ctx = collaborators.context(config.min_score);

    let outcome = ots_core::verifier::verify_detached(&detached, &document, &ctx).await?;

    println!(
        "{}: {} (score {:.2}, {}, {} chain(s), {})",
        file.display(),
        if outcome.report.overall_valid { "valid" } else { "invalid" },
        outcome.report.score,
        outcome.report.security_level,
        outcome.report.distinct_verified_chains,
        outcome.report.time_consistency,
    );

    Ok(outcome.report.overall_valid)
}
