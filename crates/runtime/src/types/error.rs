//! Error types for the model orchestration engine

use std::path::PathBuf;
use thiserror::Error;

/// Main runtime error type
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Resolver error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Acquisition error: {0}")]
    Acquire(#[from] AcquireError),

    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    #[error("Output mapping error: {0}")]
    Output(#[from] OutputError),
}

/// Catalog loading and lookup errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate model name '{0}' in catalog")]
    DuplicateModel(String),

    #[error("Output file '{file}' of model '{model}' declares no labels")]
    EmptyLabels { model: String, file: String },

    #[error("Duplicate label id {id} in output file '{file}' of model '{model}'")]
    DuplicateLabel {
        model: String,
        file: String,
        id: u32,
    },

    #[error("Model '{model}' is downloadable but declares no recipe location")]
    MissingRecipeUrl { model: String },

    #[error("No model named '{0}' in catalog")]
    ModelNotFound(String),
}

/// Image reference resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Model '{model}' does not support the GPU variant")]
    UnsupportedVariant { model: String },

    #[error("Model '{model}' declares no recipe location")]
    MissingRecipe { model: String },

    #[error("Invalid recipe URL '{url}': {source}")]
    BadUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Container engine probe and listing errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Container engine unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Failed to invoke container engine '{binary}': {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list local images (exit {status}): {detail}")]
    Listing { status: i32, detail: String },
}

/// Image acquisition errors; build and pull carry the captured log tail
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Recipe download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to stage recipe scratch directory: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("Image build failed for {image_ref} (exit {status})\n{tail}")]
    Build {
        image_ref: String,
        status: i32,
        tail: String,
    },

    #[error("Image pull failed for {image_ref} (exit {status})\n{tail}")]
    Pull {
        image_ref: String,
        status: i32,
        tail: String,
    },

    #[error("Image {image_ref} is not present locally and is neither downloadable nor pullable")]
    ImageUnobtainable { image_ref: String },
}

/// Container execution errors
#[derive(Error, Debug)]
pub enum ExecError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Container for {image_ref} exited with status {status}\n{tail}")]
    Execution {
        image_ref: String,
        status: i32,
        tail: String,
    },
}

/// Output mapping errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Declared output file '{file}' is missing from {dir}")]
    MissingOutputFile { file: String, dir: PathBuf },
}
