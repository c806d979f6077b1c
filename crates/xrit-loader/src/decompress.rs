//! Decompression of compressed xRIT segments through an external program.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};
use xrit_parser::segment::is_compressed_name;

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};

/// Produces an uncompressed copy of a segment file.
pub trait Decompressor: Send + Sync {
    /// Path of the decompressed file. Files that are not compressed are
    /// returned unchanged.
    fn decompress(&self, path: &Path) -> Result<PathBuf>;
}

/// Runs EUMETSAT's `xRITDecompress`.
#[derive(Debug, Clone)]
pub struct XritDecompress {
    program: PathBuf,
    outdir: Option<PathBuf>,
}

impl XritDecompress {
    pub fn new(program: impl Into<PathBuf>, outdir: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            outdir,
        }
    }

    /// Build from `decompress_path`/`decompress_outdir`.
    pub fn from_config(config: &LoaderConfig) -> Result<Self> {
        let program = config.decompress_path.clone().ok_or_else(|| {
            LoaderError::Decompression(
                "XRIT_DECOMPRESS_PATH is not defined (complete path to xRITDecompress)".to_string(),
            )
        })?;
        Ok(Self::new(program, config.decompress_outdir.clone()))
    }

    fn check_program(&self) -> Result<()> {
        let hint = "did you set XRIT_DECOMPRESS_PATH correctly?";
        if !self.program.exists() {
            return Err(LoaderError::Decompression(format!(
                "{} does not exist; {hint}",
                self.program.display()
            )));
        }
        if self.program.is_dir() {
            return Err(LoaderError::Decompression(format!(
                "{} is a directory; {hint}",
                self.program.display()
            )));
        }
        Ok(())
    }
}

impl Decompressor for XritDecompress {
    fn decompress(&self, path: &Path) -> Result<PathBuf> {
        if !is_compressed_name(path) {
            return Ok(path.to_path_buf());
        }
        self.check_program()?;

        let input = std::fs::canonicalize(path).map_err(|e| LoaderError::io(path, e))?;
        let outdir = match &self.outdir {
            Some(dir) => dir.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        debug!(path = %input.display(), outdir = %outdir.display(), "decompressing segment");

        let output = Command::new(&self.program)
            .arg(&input)
            .current_dir(&outdir)
            .output()
            .map_err(|e| LoaderError::Decompression(format!("{}: {e}", self.program.display())))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(LoaderError::Decompression(format!(
                "xRITDecompress '{}' failed, status={}",
                input.display(),
                output.status.code().unwrap_or(-1)
            )));
        }
        let name = decompressed_name(&stdout).ok_or_else(|| {
            LoaderError::Decompression(format!(
                "xRITDecompress '{}' failed, no output file is generated",
                input.display()
            ))
        })?;
        let decompressed = outdir.join(name);
        info!(path = %decompressed.display(), "decompressed segment");
        Ok(decompressed)
    }
}

/// File name reported by a `Decompressed file: <name>` line. Scanning stops
/// at the first line that is not a `key: value` pair.
pub fn decompressed_name(stdout: &str) -> Option<&str> {
    for line in stdout.lines() {
        let (key, value) = line.split_once(':')?;
        if key.trim() == "Decompressed file" {
            let value = value.trim();
            return (!value.is_empty()).then_some(value);
        }
    }
    None
}

/// Decompress every compressed file of `paths`, keeping order.
pub fn decompress_all<P: AsRef<Path>>(decompressor: &dyn Decompressor, paths: &[P]) -> Result<Vec<PathBuf>> {
    paths
        .iter()
        .map(|p| decompressor.decompress(p.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompressed_name() {
        let out = "Input file: H-000-MSG3__-C_\nDecompressed file: H-000-MSG3__-__\n";
        assert_eq!(decompressed_name(out), Some("H-000-MSG3__-__"));
        assert_eq!(decompressed_name("garbage\nDecompressed file: x"), None);
        assert_eq!(decompressed_name(""), None);
    }

    #[test]
    fn test_uncompressed_files_pass_through() {
        let d = XritDecompress::new("/nonexistent/xRITDecompress", None);
        let path = Path::new("/data/H-000-MSG3__-MSG3________-IR_108___-000001___-201510111400-__");
        assert_eq!(d.decompress(path).unwrap(), path);
    }

    #[test]
    fn test_missing_program() {
        let d = XritDecompress::new("/nonexistent/xRITDecompress", None);
        let err = d
            .decompress(Path::new("H-000-MSG3__-MSG3________-IR_108___-000001___-201510111400-C_"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::Decompression(_)), "{err}");
        assert!(XritDecompress::from_config(&LoaderConfig::default()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_external_program() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-decompress");
        std::fs::write(&script, "#!/bin/sh\necho \"Decompressed file: out.__\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let input = dir.path().join("seg-C_");
        std::fs::write(&input, b"x").unwrap();

        let outdir = tempfile::tempdir().unwrap();
        let d = XritDecompress::new(&script, Some(outdir.path().to_path_buf()));
        let files = decompress_all(&d, &[input]).unwrap();
        assert_eq!(files, vec![outdir.path().join("out.__")]);
    }
}
