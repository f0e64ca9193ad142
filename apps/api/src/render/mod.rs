//! Document Compiler. Turns LaTeX source into a PDF artifact.
//!
//! Each job gets its own temporary working directory holding `main.tex`. The engine
//! runs inside it (once for Tectonic, twice for the legacy engines), the PDF is
//! copied out to an independent temp file, and the working directory is removed on
//! every exit path when the `TempDir` drops.

pub mod artifact;
pub mod engine;
pub mod handlers;

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub use artifact::ArtifactGuard;
pub use engine::{select_engine, Engine, InstalledEngines};

const SOURCE_FILE: &str = "main.tex";
const OUTPUT_FILE: &str = "main.pdf";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("No LaTeX engine found. Install 'tectonic' (recommended) or 'pdflatex/xelatex'.")]
    NoEngine,

    #[error("'{0}' not found on PATH. Please install a LaTeX engine.")]
    EngineMissing(Engine),

    #[error("{engine} failed (code {}). stdout:\n{stdout}\nstderr:\n{stderr}", format_code(.code))]
    Failed {
        engine: Engine,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("{engine} timed out after {secs} seconds")]
    Timeout { engine: Engine, secs: u64 },

    #[error("PDF not produced. Check LaTeX source.")]
    OutputMissing,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn format_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Runs LaTeX engines in isolated working directories. Holds no per-job state, so
/// clones can compile concurrently.
#[derive(Debug, Clone)]
pub struct DocumentCompiler {
    timeout: Duration,
    /// Parent of per-job working directories.
    work_root: PathBuf,
    /// Pinned engine set; `None` probes for every job.
    engines: Option<InstalledEngines>,
    /// Directory holding the engine binaries; `None` resolves them on `PATH`.
    bin_dir: Option<PathBuf>,
}

impl DocumentCompiler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            work_root: std::env::temp_dir(),
            engines: None,
            bin_dir: None,
        }
    }

    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    pub fn with_engines(mut self, engines: InstalledEngines) -> Self {
        self.engines = Some(engines);
        self
    }

    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(bin_dir.into());
        self
    }

    /// Compiles `source` and returns the PDF. The caller owns the artifact.
    pub async fn compile(&self, source: &str) -> Result<ArtifactGuard, CompileError> {
        let workdir = tempfile::Builder::new()
            .prefix("vitae-job-")
            .tempdir_in(&self.work_root)?;

        tokio::fs::write(workdir.path().join(SOURCE_FILE), source).await?;

        let installed = self.installed_engines().await?;
        let engine = select_engine(source, &installed)?;
        debug!("Selected {engine} (installed: {installed:?})");

        for pass in 1..=engine.passes() {
            debug!("Running {engine} pass {pass}/{}", engine.passes());
            self.run_engine(engine, workdir.path()).await?;
        }

        let pdf_path = workdir.path().join(OUTPUT_FILE);
        match tokio::fs::metadata(&pdf_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(CompileError::OutputMissing),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CompileError::OutputMissing)
            }
            Err(e) => return Err(e.into()),
        }

        let artifact = ArtifactGuard::persist_copy(&pdf_path).await?;
        info!(
            "Compiled {} bytes of LaTeX with {engine} -> {}",
            source.len(),
            artifact.path().display()
        );
        Ok(artifact)
    }

    /// The pinned set, or a fresh probe. Probing scans the filesystem, so it runs
    /// on the blocking pool.
    async fn installed_engines(&self) -> Result<InstalledEngines, CompileError> {
        if let Some(engines) = self.engines {
            return Ok(engines);
        }
        let bin_dir = self.bin_dir.clone();
        tokio::task::spawn_blocking(move || match bin_dir {
            Some(dir) => InstalledEngines::detect_in(&dir),
            None => InstalledEngines::detect(),
        })
        .await
        .map_err(|e| CompileError::Io(io::Error::new(io::ErrorKind::Other, e)))
    }

    fn program(&self, engine: Engine) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(engine.binary()),
            None => PathBuf::from(engine.binary()),
        }
    }

    async fn run_engine(&self, engine: Engine, workdir: &Path) -> Result<(), CompileError> {
        let mut command = Command::new(self.program(engine));
        command
            .args(engine.args(SOURCE_FILE))
            .current_dir(workdir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Err(_) => {
                warn!("{engine} exceeded {}s, killed", self.timeout.as_secs());
                return Err(CompileError::Timeout {
                    engine,
                    secs: self.timeout.as_secs(),
                });
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CompileError::EngineMissing(engine))
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(CompileError::Failed {
                engine,
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }
}
