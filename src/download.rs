//! Fetching catalog products from the object store into a local directory tree
use crate::error::DownloadError;
use crate::naming::{remove_prefix, ImageNaming, EODATA_PREFIX};
use crate::s3::S3ObjOps;
use crate::table::MetadataTable;
use anyhow::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub attempted: usize,
    pub failed: Vec<(usize, String)>,
}

impl DownloadSummary {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed.len()
    }
}

/// Downloads every product in `table` starting at `start_row`.
///
/// A failing row is logged and recorded in the summary; it never stops the
/// rows after it.
pub async fn download_all(
    provider: &impl S3ObjOps,
    bucket: &str,
    table: &MetadataTable,
    start_row: usize,
    target: &Path,
    naming: &impl ImageNaming,
) -> DownloadSummary {
    let mut summary = DownloadSummary::default();

    for (idx, row) in table.rows().iter().enumerate().skip(start_row) {
        summary.attempted += 1;

        let Some(s3_path) = table.s3_path(idx) else {
            let err = DownloadError::MissingS3Path(idx);
            error!(row = idx, "{err}");
            summary.failed.push((idx, err.to_string()));
            continue;
        };
        debug!(row = idx, columns = row.len(), "Processing row");

        let prefix = remove_prefix(s3_path, EODATA_PREFIX);
        info!(row = idx, %prefix, "Downloading product");

        match download(provider, bucket, prefix, target, naming).await {
            Ok(files) => info!(row = idx, %prefix, files = files.len(), "Product downloaded"),
            Err(err) => {
                error!(row = idx, %prefix, "Error downloading product: {err:#}");
                summary.failed.push((idx, format!("{err:#}")));
            }
        }
    }

    summary
}

/// Downloads every object under `prefix` to `target/<image name>/<file name>`.
///
/// Stops at the first object that cannot be named or fetched; objects already
/// written stay on disk.
pub async fn download(
    provider: &impl S3ObjOps,
    bucket: &str,
    prefix: &str,
    target: &Path,
    naming: &impl ImageNaming,
) -> Result<Vec<PathBuf>> {
    let keys = provider.list_keys(bucket, prefix).await?;
    if keys.is_empty() {
        return Err(DownloadError::NotFound(prefix.to_string()).into());
    }

    let mut written = Vec::with_capacity(keys.len());
    for key in keys.iter() {
        let image_name = naming.image_name(key)?;
        let image_dir = target.join(image_name);
        fs::create_dir_all(&image_dir)?;

        let file_name = Path::new(key)
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Key has no file name: {key}"))?;
        let dst = image_dir.join(file_name);

        let bytes = get_object(provider, bucket, key, &dst).await?;
        debug!(%key, dst = %dst.display(), bytes, "Object written");
        written.push(dst);
    }

    Ok(written)
}

/// Streams an object to `dst`, replacing any existing file.
pub async fn get_object(
    provider: &impl S3ObjOps,
    bucket: &str,
    key: &str,
    dst: &Path,
) -> Result<usize> {
    let mut object = provider.get_object(bucket, key).await?;
    let mut file = File::create(dst)?;

    let mut byte_count = 0_usize;
    while let Some(bytes) = object.body.try_next().await? {
        file.write_all(&bytes)?;
        byte_count += bytes.len();
    }

    Ok(byte_count)
}
