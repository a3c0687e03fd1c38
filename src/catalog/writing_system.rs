use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;

use crate::catalog::CatalogError;

/// How a typed response is compared against an accepted form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    /// Latin transliteration, compared case-insensitively.
    Latin,
    /// Native script form, compared exactly after normalization.
    Locale,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseField {
    pub field: String,
    pub kind: ResponseKind,
}

/// Names of the record fields a writing system uses for each role.
///
/// Different writing systems carry different fields (Greek letters have a
/// Greek name, kana have romaji), so the roles are indirected per writing
/// system and resolved once when the catalog is loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSchema {
    pub id: String,
    pub display: String,
    pub query: String,
    pub spoken: String,
    pub responses: Vec<ResponseField>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedResponse {
    pub kind: ResponseKind,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Character {
    id: String,
    display: String,
    query: String,
    spoken: String,
    responses: Vec<AcceptedResponse>,
    fields: BTreeMap<String, String>,
}

impl Character {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn spoken(&self) -> &str {
        &self.spoken
    }

    pub fn responses(&self) -> &[AcceptedResponse] {
        &self.responses
    }

    /// Raw field lookup for fields outside the schema roles.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Row/column grid used to lay the characters out (e.g. the gojūon table).
/// Cells hold character indices; `None` is an empty slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<Option<usize>>>,
}

#[derive(Clone, Debug)]
pub struct WritingSystem {
    pub name: String,
    pub schema: FieldSchema,
    pub characters: Vec<Character>,
    pub layout: Option<GridLayout>,
}

impl WritingSystem {
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn character(&self, index: usize) -> Option<&Character> {
        self.characters.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.characters.iter().position(|c| c.id == id)
    }
}

// --- On-disk representation ---

#[derive(Debug, Deserialize)]
pub(crate) struct RawLanguageFile {
    #[serde(rename = "writingSystems", alias = "characterSets")]
    pub writing_systems: Vec<RawWritingSystem>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawClassifications {
    #[serde(default)]
    pub rows: Vec<String>,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawWritingSystem {
    pub name: String,
    pub id_property: String,
    pub display_property: String,
    pub query_property: String,
    pub spoken_property: String,
    pub response_property: Option<String>,
    pub latin_response_property: Option<String>,
    pub locale_response_property: Option<String>,
    #[serde(default)]
    pub characters: Vec<HashMap<String, String>>,
    pub classifications: Option<RawClassifications>,
    pub arrangement: Option<Vec<Vec<Option<String>>>>,
}

impl RawWritingSystem {
    fn schema(&self) -> Result<FieldSchema, CatalogError> {
        let mut responses = Vec::new();
        if let Some(field) = &self.response_property {
            responses.push(ResponseField {
                field: field.clone(),
                kind: ResponseKind::Latin,
            });
        }
        if let Some(field) = &self.latin_response_property {
            responses.push(ResponseField {
                field: field.clone(),
                kind: ResponseKind::Latin,
            });
        }
        if let Some(field) = &self.locale_response_property {
            responses.push(ResponseField {
                field: field.clone(),
                kind: ResponseKind::Locale,
            });
        }
        if responses.is_empty() {
            return Err(CatalogError::NoResponseField {
                writing_system: self.name.clone(),
            });
        }

        Ok(FieldSchema {
            id: self.id_property.clone(),
            display: self.display_property.clone(),
            query: self.query_property.clone(),
            spoken: self.spoken_property.clone(),
            responses,
        })
    }

    pub fn resolve(self) -> Result<WritingSystem, CatalogError> {
        let schema = self.schema()?;
        let mut seen = HashSet::new();
        let mut characters = Vec::with_capacity(self.characters.len());

        for (index, record) in self.characters.into_iter().enumerate() {
            let lookup = |field: &str| -> Result<String, CatalogError> {
                record
                    .get(field)
                    .cloned()
                    .ok_or_else(|| CatalogError::MissingField {
                        writing_system: self.name.clone(),
                        index,
                        field: field.to_string(),
                    })
            };

            let id = lookup(&schema.id)?;
            if !seen.insert(id.clone()) {
                return Err(CatalogError::DuplicateId {
                    writing_system: self.name.clone(),
                    id,
                });
            }

            let responses = schema
                .responses
                .iter()
                .map(|r| {
                    Ok(AcceptedResponse {
                        kind: r.kind,
                        text: lookup(&r.field)?,
                    })
                })
                .collect::<Result<Vec<_>, CatalogError>>()?;

            characters.push(Character {
                id,
                display: lookup(&schema.display)?,
                query: lookup(&schema.query)?,
                spoken: lookup(&schema.spoken)?,
                responses,
                fields: record.into_iter().collect(),
            });
        }

        let mut ws = WritingSystem {
            name: self.name,
            schema,
            characters,
            layout: None,
        };

        if let Some(arrangement) = self.arrangement {
            let classifications = self.classifications.unwrap_or_default();
            let cells = arrangement
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|cell| match cell {
                            None => Ok(None),
                            Some(id) => ws.index_of(&id).map(Some).ok_or_else(|| {
                                CatalogError::UnknownLayoutId {
                                    writing_system: ws.name.clone(),
                                    id,
                                }
                            }),
                        })
                        .collect::<Result<Vec<_>, CatalogError>>()
                })
                .collect::<Result<Vec<_>, CatalogError>>()?;
            ws.layout = Some(GridLayout {
                rows: classifications.rows,
                columns: classifications.columns,
                cells,
            });
        }

        Ok(ws)
    }
}
