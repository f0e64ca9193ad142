//! Engine selection. Pure functions over the source text and the set of
//! engines found on `PATH`, so the same inputs always pick the same engine.

use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::render::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// Self-contained; resolves cross-references in a single run.
    Tectonic,
    PdfLatex,
    XeLatex,
}

impl Engine {
    /// Preference order when the source has no special requirements.
    pub const PREFERENCE: [Engine; 3] = [Engine::Tectonic, Engine::PdfLatex, Engine::XeLatex];

    pub fn binary(self) -> &'static str {
        match self {
            Engine::Tectonic => "tectonic",
            Engine::PdfLatex => "pdflatex",
            Engine::XeLatex => "xelatex",
        }
    }

    /// Legacy engines need a second pass to settle references.
    pub fn passes(self) -> usize {
        match self {
            Engine::Tectonic => 1,
            Engine::PdfLatex | Engine::XeLatex => 2,
        }
    }

    pub fn args(self, source_file: &str) -> Vec<String> {
        match self {
            Engine::Tectonic => vec![source_file.to_string()],
            Engine::PdfLatex | Engine::XeLatex => vec![
                "-interaction=nonstopmode".to_string(),
                "-halt-on-error".to_string(),
                source_file.to_string(),
            ],
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Which engines are available on this host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstalledEngines {
    pub tectonic: bool,
    pub pdflatex: bool,
    pub xelatex: bool,
}

impl InstalledEngines {
    /// Probes `PATH` for each engine binary.
    pub fn detect() -> Self {
        Self::probe(|binary| which::which(binary).is_ok())
    }

    /// Probes a single directory instead of `PATH`.
    pub fn detect_in(dir: &Path) -> Self {
        Self::probe(|binary| which::which_in(binary, Some(dir), dir).is_ok())
    }

    fn probe(is_installed: impl Fn(&str) -> bool) -> Self {
        let found = |engine: Engine| is_installed(engine.binary());
        Self {
            tectonic: found(Engine::Tectonic),
            pdflatex: found(Engine::PdfLatex),
            xelatex: found(Engine::XeLatex),
        }
    }

    pub fn contains(&self, engine: Engine) -> bool {
        match engine {
            Engine::Tectonic => self.tectonic,
            Engine::PdfLatex => self.pdflatex,
            Engine::XeLatex => self.xelatex,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.tectonic || self.pdflatex || self.xelatex)
    }
}

static FONT_PACKAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\\s*(?:usepackage|requirepackage)\s*(?:\[[^\]]*\])?\s*\{\s*(?:fontspec|unicode-math)\s*\}")
        .expect("font package pattern is valid")
});

const XELATEX_COMMANDS: [&str; 3] = ["\\setmainfont", "\\newfontfamily", "polyglossia"];

/// True when the source loads system fonts (fontspec, unicode-math, polyglossia)
/// and therefore needs XeLaTeX rather than pdfLaTeX.
pub fn requires_xelatex(source: &str) -> bool {
    let lower = source.to_lowercase();
    FONT_PACKAGE.is_match(&lower) || XELATEX_COMMANDS.iter().any(|cmd| lower.contains(cmd))
}

/// Picks the engine for `source`.
///
/// XeLaTeX is forced when the source needs it and it is installed. Otherwise the
/// first installed engine in `Engine::PREFERENCE` wins.
pub fn select_engine(source: &str, installed: &InstalledEngines) -> Result<Engine, CompileError> {
    if requires_xelatex(source) && installed.contains(Engine::XeLatex) {
        return Ok(Engine::XeLatex);
    }

    Engine::PREFERENCE
        .into_iter()
        .find(|engine| installed.contains(*engine))
        .ok_or(CompileError::NoEngine)
}
