//! Result sink for persisting accepted proxies

use crate::error::HarvestError;
use crate::proxy::models::Candidate;
use std::fs;
use std::path::Path;

/// Write accepted candidates to a file, one fully-qualified proxy URL per line
pub fn persist<P: AsRef<Path>>(accepted: &[Candidate], path: P) -> Result<(), HarvestError> {
    let mut content = accepted
        .iter()
        .map(|c| c.url())
        .collect::<Vec<_>>()
        .join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    fs::write(path.as_ref(), content).map_err(|source| HarvestError::Persist {
        path: path.as_ref().to_path_buf(),
        source,
    })
}
