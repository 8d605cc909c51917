//! Ghostscript discovery and invocation
//!
//! [`GhostscriptLocator`] resolves the executable from a list of candidate names,
//! [`GsCommand`] turns a compression request into a deterministic argument vector
//! and [`GhostscriptCompressor`] runs it inside a request-scoped scratch directory.

use async_trait::async_trait;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use super::traits::{HandlerError, PdfCompressor};
use super::types::CompressionLevel;
use crate::config::CompressionConfig;

const DEVICE: &str = "pdfwrite";
const COMPATIBILITY_LEVEL: &str = "1.4";
const INPUT_NAME: &str = "in.pdf";
const OUTPUT_NAME: &str = "out.pdf";

/// Finds a Ghostscript executable, optionally remembering the first answer
#[derive(Debug)]
pub struct GhostscriptLocator {
    candidates: Vec<String>,
    cache: Option<OnceLock<Option<PathBuf>>>,
}

impl GhostscriptLocator {
    pub fn new(candidates: Vec<String>, cache_lookup: bool) -> Self {
        Self {
            candidates,
            cache: cache_lookup.then(OnceLock::new),
        }
    }

    pub fn from_config(config: &CompressionConfig) -> Self {
        Self::new(config.binaries.clone(), config.cache_lookup)
    }

    /// Path of the first candidate that resolves to an executable file
    pub fn locate(&self) -> Option<PathBuf> {
        match &self.cache {
            Some(cell) => cell.get_or_init(|| self.search()).clone(),
            None => self.search(),
        }
    }

    fn search(&self) -> Option<PathBuf> {
        let found = self.candidates.iter().find_map(|name| which(name));
        match &found {
            Some(path) => debug!(path = %path.display(), "Ghostscript executable found"),
            None => debug!(candidates = ?self.candidates, "No Ghostscript executable found"),
        }
        found
    }
}

/// Resolve `name` the way a shell would: names with a separator are taken as paths,
/// bare names are searched for in every `PATH` entry.
fn which(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let search_path = env::var_os("PATH")?;
    env::split_paths(&search_path)
        .flat_map(|dir| executable_names(name).map(move |file| dir.join(file)))
        .find(|path| is_executable(path))
}

#[cfg(windows)]
fn executable_names(name: &str) -> impl Iterator<Item = String> {
    let plain = name.to_string();
    let with_ext = format!("{name}.exe");
    [plain, with_ext].into_iter()
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> impl Iterator<Item = String> {
    std::iter::once(name.to_string())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Typed Ghostscript invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsCommand {
    pub executable: PathBuf,
    pub device: &'static str,
    pub compatibility_level: &'static str,
    pub level: CompressionLevel,
    pub downsample_dpi: Option<u32>,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl GsCommand {
    pub fn new(
        executable: PathBuf,
        level: CompressionLevel,
        input: PathBuf,
        output: PathBuf,
    ) -> Self {
        Self {
            executable,
            device: DEVICE,
            compatibility_level: COMPATIBILITY_LEVEL,
            level,
            downsample_dpi: level.downsample_dpi(),
            input,
            output,
        }
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            format!("-sDEVICE={}", self.device).into(),
            format!("-dCompatibilityLevel={}", self.compatibility_level).into(),
            format!("-dPDFSETTINGS={}", self.level.pdf_settings()).into(),
            "-dNOPAUSE".into(),
            "-dBATCH".into(),
        ];

        if let Some(dpi) = self.downsample_dpi {
            args.extend(
                [
                    "-dDownsampleColorImages=true".to_string(),
                    "-dDownsampleGrayImages=true".to_string(),
                    "-dDownsampleMonoImages=true".to_string(),
                    format!("-dColorImageResolution={dpi}"),
                    format!("-dGrayImageResolution={dpi}"),
                    format!("-dMonoImageResolution={dpi}"),
                    "-dColorImageDownsampleType=/Average".to_string(),
                    "-dGrayImageDownsampleType=/Average".to_string(),
                ]
                .map(OsString::from),
            );
        }

        let mut output_arg = OsString::from("-sOutputFile=");
        output_arg.push(&self.output);
        args.push(output_arg);
        args.push(self.input.clone().into_os_string());
        args
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

/// Compresses through an external Ghostscript process
#[derive(Debug, Clone)]
pub struct GhostscriptCompressor {
    executable: PathBuf,
    timeout: Option<Duration>,
    scratch_root: Option<PathBuf>,
}

impl GhostscriptCompressor {
    pub fn new(executable: PathBuf) -> Self {
        Self {
            executable,
            timeout: None,
            scratch_root: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("convertbox-gs-");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

#[async_trait]
impl PdfCompressor for GhostscriptCompressor {
    fn name(&self) -> &'static str {
        "ghostscript"
    }

    async fn compress(
        &self,
        input: &[u8],
        level: CompressionLevel,
    ) -> Result<Vec<u8>, HandlerError> {
        // Dropping the guard removes the directory on every return path below
        let scratch = self.scratch_dir()?;
        let input_path = scratch.path().join(INPUT_NAME);
        let output_path = scratch.path().join(OUTPUT_NAME);

        tokio::fs::write(&input_path, input).await?;

        let command = GsCommand::new(
            self.executable.clone(),
            level,
            input_path,
            output_path.clone(),
        );
        debug!(
            executable = %self.executable.display(),
            args = ?command.args(),
            "Running Ghostscript"
        );

        let child = command.to_command().spawn()?;
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| HandlerError::ToolTimeout(limit))??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(code = ?output.status.code(), %stderr, "Ghostscript exited with failure");
            return Err(HandlerError::ToolFailed {
                code: output.status.code(),
                stderr,
            });
        }

        Ok(tokio::fs::read(&output_path).await?)
    }
}
