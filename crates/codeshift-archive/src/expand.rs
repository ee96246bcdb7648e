use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::entry::ArchiveReport;
use crate::error::{Error, Result};
use crate::extract::extract_with_format;
use crate::format;
use crate::options::ExpandOptions;

/// Outcome of expanding a regular file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expansion {
    /// The file is not a supported archive and was left alone.
    NotAnArchive,
    /// The archive was expanded into this new directory.
    Extracted(PathBuf),
}

/// A finished expansion. The directory belongs to the caller and is never
/// removed by this crate.
#[derive(Clone, Debug)]
pub struct ExpandedArchive {
    pub directory: PathBuf,
    pub report: ArchiveReport,
}

/// Expand `source` into a fresh directory if it is a tar or compressed tar.
pub fn expand(source: impl AsRef<Path>, options: &ExpandOptions) -> Result<Expansion> {
    Ok(match expand_with_report(source, options)? {
        Some(expanded) => Expansion::Extracted(expanded.directory),
        None => Expansion::NotAnArchive,
    })
}

/// Like [`expand`], but keeps the extraction report.
///
/// Every call gets its own uniquely named directory under the configured temp
/// root, so repeated or concurrent expansions of one archive never collide.
/// If extraction fails the partial directory is removed before returning.
/// The source file is only ever read.
pub fn expand_with_report(
    source: impl AsRef<Path>,
    options: &ExpandOptions,
) -> Result<Option<ExpandedArchive>> {
    let source = source.as_ref();
    let mut file = File::open(source).map_err(|e| Error::ExtractionFailed {
        path: source.to_path_buf(),
        source: e,
    })?;

    let format = match format::detect_from_reader(&mut file) {
        Ok(Some(format)) => format,
        Ok(None) => {
            debug!(source = %source.display(), "not a recognized archive");
            return Ok(None);
        }
        Err(Error::Io(e)) => {
            return Err(Error::ExtractionFailed {
                path: source.to_path_buf(),
                source: e,
            });
        }
        Err(e) => return Err(e),
    };

    let staging = options.staging_dir()?;
    debug!(
        source = %source.display(),
        destination = %staging.path().display(),
        ?format,
        "expanding archive"
    );

    let report = extract_with_format(file, format, staging.path(), options)?;
    let directory = staging.keep();

    info!(
        source = %source.display(),
        destination = %directory.display(),
        entries = report.entry_count,
        bytes = report.total_bytes,
        "expanded archive"
    );

    Ok(Some(ExpandedArchive { directory, report }))
}
