pub mod writing_system;

use std::fs;
use std::path::{Path, PathBuf};

use rust_embed::Embed;
use serde::Deserialize;
use thiserror::Error;

pub use writing_system::{
    AcceptedResponse, Character, FieldSchema, GridLayout, ResponseKind, WritingSystem,
};

use writing_system::RawLanguageFile;

#[derive(Embed)]
#[folder = "assets/languages/"]
struct LanguageAssets;

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog file not found: {0}")]
    MissingFile(String),
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("writing system '{writing_system}' declares no response property")]
    NoResponseField { writing_system: String },
    #[error("writing system '{writing_system}': character #{index} has no field '{field}'")]
    MissingField {
        writing_system: String,
        index: usize,
        field: String,
    },
    #[error("writing system '{writing_system}': duplicate character id '{id}'")]
    DuplicateId { writing_system: String, id: String },
    #[error("writing system '{writing_system}': layout references unknown id '{id}'")]
    UnknownLayoutId { writing_system: String, id: String },
}

#[derive(Clone, Debug)]
pub struct Language {
    pub code: String,
    pub name: String,
    pub writing_systems: Vec<WritingSystem>,
}

impl Language {
    pub fn writing_system(&self, index: usize) -> Option<&WritingSystem> {
        self.writing_systems.get(index)
    }
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    code: String,
    name: String,
}

/// Immutable language dataset, loaded once and shared by reference.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    languages: Vec<Language>,
}

impl Catalog {
    pub fn new(languages: Vec<Language>) -> Self {
        Self { languages }
    }

    /// Catalog compiled into the binary from `assets/languages/`.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_source(|name| {
            LanguageAssets::get(name)
                .map(|file| String::from_utf8_lossy(file.data.as_ref()).into_owned())
                .ok_or_else(|| CatalogError::MissingFile(name.to_string()))
        })
    }

    /// Catalog read from a user directory laid out like `assets/languages/`:
    /// an `index.json` plus one `<code>.json` per language.
    pub fn from_dir(dir: &Path) -> Result<Self, CatalogError> {
        Self::from_source(|name| {
            let path = dir.join(name);
            if !path.exists() {
                return Err(CatalogError::MissingFile(path.display().to_string()));
            }
            fs::read_to_string(&path).map_err(|source| CatalogError::Io { path, source })
        })
    }

    fn from_source<F>(read: F) -> Result<Self, CatalogError>
    where
        F: Fn(&str) -> Result<String, CatalogError>,
    {
        let index: Vec<IndexEntry> = parse(INDEX_FILE, &read(INDEX_FILE)?)?;

        let mut languages = Vec::with_capacity(index.len());
        for entry in index {
            let file = format!("{}.json", entry.code);
            let raw: RawLanguageFile = parse(&file, &read(&file)?)?;
            let writing_systems = raw
                .writing_systems
                .into_iter()
                .map(|ws| ws.resolve())
                .collect::<Result<Vec<_>, _>>()?;
            languages.push(Language {
                code: entry.code,
                name: entry.name,
                writing_systems,
            });
        }

        Ok(Self { languages })
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn language(&self, index: usize) -> Option<&Language> {
        self.languages.get(index)
    }

    pub fn writing_system(&self, language: usize, writing_system: usize) -> Option<&WritingSystem> {
        self.language(language)?.writing_system(writing_system)
    }

    /// Find `(language, writing_system)` indices by language code and writing system name.
    pub fn find(&self, code: &str, writing_system: &str) -> Option<(usize, usize)> {
        let lang_idx = self.languages.iter().position(|l| l.code == code)?;
        let ws_idx = self.languages[lang_idx]
            .writing_systems
            .iter()
            .position(|ws| ws.name == writing_system)?;
        Some((lang_idx, ws_idx))
    }
}

fn parse<T: serde::de::DeserializeOwned>(file: &str, content: &str) -> Result<T, CatalogError> {
    serde_json::from_str(content).map_err(|source| CatalogError::Parse {
        file: file.to_string(),
        source,
    })
}
