//! Extension-based chunker dispatch

use super::language::{extension_of, Language};
use super::types::Chunk;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Lookup table from file extension to language, built once at startup
#[derive(Debug, Clone, Default)]
pub struct ChunkerRegistry {
    by_extension: HashMap<String, Language>,
}

impl ChunkerRegistry {
    /// Registry with every built-in language on its default extensions
    pub fn with_defaults() -> Result<Self> {
        Self::from_languages(&Language::ALL)
    }

    pub fn from_languages(languages: &[Language]) -> Result<Self> {
        let mut registry = Self::default();
        for language in languages {
            registry.register(*language, language.extensions())?;
        }
        Ok(registry)
    }

    /// Claim `extensions` for `language`.
    ///
    /// Fails with a configuration conflict if any extension is already claimed,
    /// leaving the registry unchanged.
    pub fn register(&mut self, language: Language, extensions: &[&str]) -> Result<()> {
        let normalized: Vec<String> = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        for ext in &normalized {
            if let Some(existing) = self.by_extension.get(ext) {
                return Err(Error::ConfigurationConflict(format!(
                    "extension '.{}' claimed by both {} and {}",
                    ext,
                    existing.as_str(),
                    language.as_str()
                )));
            }
        }
        for (i, ext) in normalized.iter().enumerate() {
            if normalized[..i].contains(ext) {
                return Err(Error::ConfigurationConflict(format!(
                    "extension '.{}' listed twice for {}",
                    ext,
                    language.as_str()
                )));
            }
        }

        for ext in normalized {
            self.by_extension.insert(ext, language);
        }
        Ok(())
    }

    /// Sorted list of claimed extensions, used by the file scanner
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.by_extension.keys().cloned().collect();
        exts.sort();
        exts
    }

    pub fn language_for(&self, path: &Path) -> Option<Language> {
        let ext = extension_of(path)?;
        self.by_extension.get(&ext).copied()
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.language_for(path).is_some()
    }

    /// Chunk a file; `Ok(None)` when no chunker claims its extension
    pub fn chunk_file(&self, path: &Path, source: &str) -> Result<Option<Vec<Chunk>>> {
        match self.language_for(path) {
            Some(language) => super::chunk_source(source, path, language).map(Some),
            None => Ok(None),
        }
    }
}
