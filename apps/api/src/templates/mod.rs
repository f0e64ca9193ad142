//! Template Store. Resolves LaTeX templates from the writable custom directory,
//! falling back to the templates bundled with the service.
//!
//! Ids are file stems (`<id>.tex`). Custom templates shadow builtin ones with the
//! same id. Ids are sanitized before they ever touch the filesystem, so a lookup can
//! never escape the two template directories.

pub mod handlers;

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Id of the template used when a request names none.
pub const DEFAULT_TEMPLATE_ID: &str = "cv_template";
const TEMPLATE_EXTENSION: &str = "tex";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Invalid template id")]
    InvalidIdentifier,

    #[error("{0}")]
    NotFound(String),

    #[error("Template must not be empty.")]
    EmptyTemplate,

    #[error("Template I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateOrigin {
    Custom,
    Builtin,
    /// Placeholder for the default template when neither directory has entries.
    Implicit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    pub source: TemplateOrigin,
}

/// Which template a request asked for, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateChoice {
    /// Literal LaTeX supplied with the request; used verbatim.
    Override(String),
    ById(String),
    Default,
}

impl TemplateChoice {
    /// Inline override wins over an id, which wins over the stored default.
    /// Empty strings count as absent.
    pub fn from_request(template_override: Option<&str>, template_id: Option<&str>) -> Self {
        if let Some(text) = template_override.filter(|t| !t.is_empty()) {
            return TemplateChoice::Override(text.to_string());
        }
        if let Some(id) = template_id.filter(|i| !i.is_empty()) {
            return TemplateChoice::ById(id.to_string());
        }
        TemplateChoice::Default
    }

    pub async fn resolve(self, store: &TemplateStore) -> Result<String, TemplateError> {
        match self {
            TemplateChoice::Override(text) => Ok(text),
            TemplateChoice::ById(id) => store.resolve_by_id(&id).await,
            TemplateChoice::Default => store.resolve_default().await,
        }
    }
}

/// File-backed template store over a custom (writable) and a builtin (read-only) directory.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    custom_dir: PathBuf,
    builtin_dir: PathBuf,
}

impl TemplateStore {
    pub fn new(custom_dir: impl Into<PathBuf>, builtin_dir: impl Into<PathBuf>) -> Self {
        Self {
            custom_dir: custom_dir.into(),
            builtin_dir: builtin_dir.into(),
        }
    }

    fn default_path(&self) -> PathBuf {
        template_path(&self.custom_dir, DEFAULT_TEMPLATE_ID)
    }

    /// Reads the stored default, else the bundled default.
    pub async fn resolve_default(&self) -> Result<String, TemplateError> {
        if let Some(text) = read_if_exists(&self.default_path()).await? {
            return Ok(text);
        }
        if let Some(text) =
            read_if_exists(&template_path(&self.builtin_dir, DEFAULT_TEMPLATE_ID)).await?
        {
            return Ok(text);
        }
        Err(TemplateError::NotFound(
            "No LaTeX template found.".to_string(),
        ))
    }

    /// Resolves a template by id, custom directory first.
    pub async fn resolve_by_id(&self, id: &str) -> Result<String, TemplateError> {
        let safe_id = sanitize_id(id).ok_or(TemplateError::InvalidIdentifier)?;

        for dir in [&self.custom_dir, &self.builtin_dir] {
            let path = template_path(dir, &safe_id);
            if let Some(text) = read_if_exists(&path).await? {
                debug!("Resolved template '{safe_id}' from {}", path.display());
                return Ok(text);
            }
        }

        Err(TemplateError::NotFound(format!(
            "Template not found: {safe_id}"
        )))
    }

    /// Lists custom templates, then builtin ones not shadowed by a custom id.
    pub async fn list(&self) -> Result<Vec<TemplateInfo>, TemplateError> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();

        for (dir, origin) in [
            (&self.custom_dir, TemplateOrigin::Custom),
            (&self.builtin_dir, TemplateOrigin::Builtin),
        ] {
            for id in list_ids(dir).await? {
                if seen.insert(id.clone()) {
                    items.push(TemplateInfo {
                        name: display_name(&id),
                        id,
                        source: origin,
                    });
                }
            }
        }

        if items.is_empty() {
            items.push(TemplateInfo {
                id: DEFAULT_TEMPLATE_ID.to_string(),
                name: display_name(DEFAULT_TEMPLATE_ID),
                source: TemplateOrigin::Implicit,
            });
        }

        Ok(items)
    }

    /// Overwrites the stored default template. No locking: concurrent writers race
    /// and the last one wins.
    pub async fn write_default(&self, text: &str) -> Result<(), TemplateError> {
        if text.trim().is_empty() {
            return Err(TemplateError::EmptyTemplate);
        }

        tokio::fs::create_dir_all(&self.custom_dir).await?;
        let path = self.default_path();
        tokio::fs::write(&path, text).await?;
        info!("Default template updated at {}", path.display());
        Ok(())
    }
}

/// Strips everything outside `[A-Za-z0-9_-]`. Returns `None` when nothing is left.
pub fn sanitize_id(id: &str) -> Option<String> {
    let safe: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (!safe.is_empty()).then_some(safe)
}

/// `cv_template` → `Cv Template`
fn display_name(id: &str) -> String {
    let spaced = id.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn template_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.{TEMPLATE_EXTENSION}"))
}

async fn read_if_exists(path: &Path) -> Result<Option<String>, TemplateError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Sorted template ids in `dir`. A missing directory has no templates.
async fn list_ids(dir: &Path) -> Result<Vec<String>, TemplateError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut ids = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
            continue;
        }
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            ids.push(stem.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}
