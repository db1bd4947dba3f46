//! Durable raster export.
//!
//! The GeoTIFF is fully written and synced to a temporary file next to the
//! destination, then renamed over it. A failed or timed-out export leaves
//! the destination untouched and removes the temporary file.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::io::deadline::with_timeout;
use crate::io::native::encode_bands;
use crate::raster::{BBox, BandStack, Raster, RasterElement};

/// Options for [`export_geotiff`]
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Give up (and leave no artifact) after this long
    pub timeout: Option<Duration>,
    /// Crop to this region before writing
    pub region: Option<BBox>,
}

/// Confirmation of a completed export
#[derive(Debug, Clone)]
pub struct ExportReceipt {
    pub path: PathBuf,
    pub bands: usize,
    pub rows: usize,
    pub cols: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Export a multi-band stack as a GeoTIFF at `destination`.
pub fn export_geotiff(
    stack: &BandStack,
    destination: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<ExportReceipt> {
    let destination = destination.as_ref().to_path_buf();
    let stack = match &options.region {
        Some(region) => stack.crop(region)?,
        None => stack.clone(),
    };
    if stack.is_empty() {
        return Err(export_error(&destination, "nothing to export: stack has no bands"));
    }

    let start = Instant::now();
    let target = destination.clone();
    let receipt = with_timeout("export", options.timeout, move |gate| {
        let tmp = write_temp(&stack, &target)?;
        let bytes = tmp.as_file().metadata().map(|m| m.len()).unwrap_or(0);

        match gate.commit(|| tmp.persist(&target)) {
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(export_error(&target, e.error)),
            // Caller timed out; dropping the temp file removes it.
            None => {
                return Err(Error::IoTimeout {
                    operation: "export",
                    timeout: Duration::ZERO,
                })
            }
        }

        let (rows, cols) = stack.shape();
        Ok(ExportReceipt {
            path: target,
            bands: stack.len(),
            rows,
            cols,
            bytes,
            elapsed: Duration::ZERO,
        })
    })?;

    let receipt = ExportReceipt {
        elapsed: start.elapsed(),
        ..receipt
    };
    info!(
        path = %receipt.path.display(),
        bands = receipt.bands,
        bytes = receipt.bytes,
        "export complete"
    );
    Ok(receipt)
}

/// Export a single raster of any cell type as a one-band GeoTIFF.
pub fn export_raster<T: RasterElement>(
    name: &str,
    raster: &Raster<T>,
    destination: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<ExportReceipt> {
    let stack = BandStack::from_bands([(name, raster.to_f64())])?;
    export_geotiff(&stack, destination, options)
}

fn write_temp(stack: &BandStack, destination: &Path) -> Result<NamedTempFile> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| export_error(destination, e))?;
    debug!(tmp = %tmp.path().display(), "writing export to temporary file");

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        encode_bands(stack, &mut writer).map_err(|e| export_error(destination, e))?;
        writer.flush().map_err(|e| export_error(destination, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| export_error(destination, e))?;
    Ok(tmp)
}

fn export_error(destination: &Path, reason: impl std::fmt::Display) -> Error {
    Error::Export {
        destination: destination.display().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::native::read_geotiff_bands;
    use crate::raster::GeoTransform;

    fn stack() -> BandStack {
        let mut r = Raster::from_vec((0..16).map(|v| v as f64 / 16.0).collect(), 4, 4).unwrap();
        r.set_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0));
        BandStack::from_bands([("ndvi", r)]).unwrap()
    }

    #[test]
    fn export_writes_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("classified.tif");

        let receipt = export_geotiff(&stack(), &dest, &ExportOptions::default()).unwrap();
        assert_eq!(receipt.path, dest);
        assert_eq!((receipt.rows, receipt.cols, receipt.bands), (4, 4, 1));
        assert!(receipt.bytes > 0);

        let back = read_geotiff_bands(&dest).unwrap();
        assert_eq!(back.names(), vec!["ndvi"]);
        assert_eq!(back.shape(), (4, 4));

        // Only the final artifact remains in the directory.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn export_crops_to_region() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("crop.tif");
        let options = ExportOptions {
            region: Some(BBox::new(0.0, 20.0, 20.0, 40.0)),
            ..Default::default()
        };

        let receipt = export_geotiff(&stack(), &dest, &options).unwrap();
        assert_eq!((receipt.rows, receipt.cols), (2, 2));
    }

    #[test]
    fn export_to_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("no").join("such").join("dir").join("out.tif");

        let err = export_geotiff(&stack(), &dest, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Export { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn label_raster_exports_as_named_band() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("labels.tif");
        let mut labels = Raster::from_vec(vec![0i32, 1, -1, 2], 2, 2).unwrap();
        labels.set_nodata(Some(-1));

        export_raster("class", &labels, &dest, &ExportOptions::default()).unwrap();
        let back = read_geotiff_bands(&dest).unwrap();
        let class = back.band("class").unwrap();
        assert_eq!(class.nodata(), Some(-1.0));
        assert_eq!(class.get(1, 1).unwrap(), 2.0);
    }

    #[test]
    fn export_overwrites_existing_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.tif");
        std::fs::write(&dest, b"old").unwrap();

        export_geotiff(&stack(), &dest, &ExportOptions::default()).unwrap();
        assert!(read_geotiff_bands(&dest).is_ok());
    }
}
