//! Model catalog: declarative registry of containerized models
//!
//! The catalog is a JSON document enumerating models, each naming a
//! container image spec and the output files the model is expected to
//! produce. Loaded once, validated, and immutable thereafter; safe to
//! share read-only across concurrent pipeline invocations.

pub mod resolver;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::CatalogError;

/// Presentation metadata for one semantic label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    /// RGB triple, components in `0.0..=1.0`. Absent means unset; renderers
    /// fall back to black.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[f32; 3]>,
}

impl Segment {
    /// Color with the black fallback applied.
    pub fn rgb(&self) -> [f32; 3] {
        self.color.unwrap_or([0.0, 0.0, 0.0])
    }
}

/// One semantic label encoded within an output file. The id matches the
/// voxel/pixel encoding convention of the file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputLabel {
    pub id: u32,
    pub segment: Segment,
}

/// One file the container is expected to produce, with its label mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFile {
    /// File name relative to the output directory.
    pub file: String,
    /// Declared labels, ordered. Never empty after validation.
    pub labels: Vec<OutputLabel>,
}

/// Describes how to obtain a runnable image for a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockerfileSpec {
    /// Source repository identifier, e.g. `mhubai`.
    pub repository: String,
    /// Base image name.
    pub image: String,
    /// GPU-variant image name. Absent means the GPU variant shares the
    /// base image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_gpu: Option<String>,
    /// Image tag.
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Recipe can be downloaded and built locally.
    #[serde(default)]
    pub downloadable: bool,
    /// Pre-built image can be pulled from the repository.
    #[serde(default)]
    pub pullable: bool,
    /// Model supports the GPU variant.
    #[serde(default)]
    pub gpu: bool,
    /// Recipe location for the CPU variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Recipe location for the GPU variant; falls back to `download_url`
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url_gpu: Option<String>,
}

fn default_tag() -> String {
    "latest".to_string()
}

/// One catalog entry: a named computational unit, its image spec, and its
/// declared outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Identifier, unique within the catalog.
    pub name: String,
    /// Human-readable display label.
    pub label: String,
    pub dockerfile: DockerfileSpec,
    #[serde(default)]
    pub output_files: Vec<OutputFile>,
}

#[derive(Debug, Deserialize)]
struct CatalogDoc {
    models: Vec<Model>,
}

/// Loaded, validated model catalog. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Registry {
    models: Vec<Model>,
}

impl Registry {
    /// Load and validate a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&raw)?;
        tracing::debug!(
            catalog = %path.display(),
            models = registry.models.len(),
            "catalog loaded"
        );
        Ok(registry)
    }

    /// Build a registry from an in-memory catalog document.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDoc = serde_json::from_str(raw)?;
        Self::validate(&doc.models)?;
        Ok(Self { models: doc.models })
    }

    fn validate(models: &[Model]) -> Result<(), CatalogError> {
        let mut names = HashSet::new();
        for model in models {
            if !names.insert(model.name.as_str()) {
                return Err(CatalogError::DuplicateModel(model.name.clone()));
            }
            if model.dockerfile.downloadable && model.dockerfile.download_url.is_none() {
                return Err(CatalogError::MissingRecipeUrl {
                    model: model.name.clone(),
                });
            }
            for output_file in &model.output_files {
                if output_file.labels.is_empty() {
                    return Err(CatalogError::EmptyLabels {
                        model: model.name.clone(),
                        file: output_file.file.clone(),
                    });
                }
                let mut ids = HashSet::new();
                for label in &output_file.labels {
                    if !ids.insert(label.id) {
                        return Err(CatalogError::DuplicateLabel {
                            model: model.name.clone(),
                            file: output_file.file.clone(),
                            id: label.id,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// All models in stable catalog order.
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Look up a model by identifier, falling back to the display label.
    pub fn find(&self, name: &str) -> Result<&Model, CatalogError> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .or_else(|| self.models.iter().find(|m| m.label == name))
            .ok_or_else(|| CatalogError::ModelNotFound(name.to_string()))
    }
}
