//! Output mapping
//!
//! Walks a model's declared output files after a successful run and turns
//! them into named, colored segment records for the caller to materialize
//! into its own data structures. No rendering or scene API is touched
//! here; the result is pure data.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::Model;
use crate::types::OutputError;

/// One (file, label, segment, color) record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedOutput {
    /// Absolute path of the produced file.
    pub file_path: PathBuf,
    /// Label id within the file's encoding.
    pub label_id: u32,
    pub segment_name: String,
    /// RGB with the black fallback already applied.
    pub color: [f32; 3],
}

/// Color-table entry for a multi-label file, in declared order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorTableEntry {
    pub label_id: u32,
    pub name: String,
    pub color: [f32; 3],
}

/// Label id → name → color mapping a renderer must apply when decoding a
/// multi-label file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorTable {
    /// File name the table belongs to, relative to the output directory.
    pub file: String,
    pub entries: Vec<ColorTableEntry>,
}

/// Everything mapped from one execution's output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct MappedOutputs {
    /// All records, in catalog declaration order.
    pub outputs: Vec<MappedOutput>,
    /// One table per multi-label file. Single-label files are plain
    /// binary masks and need no table.
    pub color_tables: Vec<ColorTable>,
}

/// Map a model's declared outputs against the files actually present in
/// `output_dir`.
///
/// A declared file missing from the directory is fatal: a silent partial
/// list would corrupt downstream segmentation import.
pub fn map_outputs(model: &Model, output_dir: &Path) -> Result<MappedOutputs, OutputError> {
    let mut mapped = MappedOutputs::default();

    for output_file in &model.output_files {
        let file_path = output_dir.join(&output_file.file);
        if !file_path.is_file() {
            return Err(OutputError::MissingOutputFile {
                file: output_file.file.clone(),
                dir: output_dir.to_path_buf(),
            });
        }

        for label in &output_file.labels {
            mapped.outputs.push(MappedOutput {
                file_path: file_path.clone(),
                label_id: label.id,
                segment_name: label.segment.name.clone(),
                color: label.segment.rgb(),
            });
        }

        if output_file.labels.len() > 1 {
            mapped.color_tables.push(ColorTable {
                file: output_file.file.clone(),
                entries: output_file
                    .labels
                    .iter()
                    .map(|label| ColorTableEntry {
                        label_id: label.id,
                        name: label.segment.name.clone(),
                        color: label.segment.rgb(),
                    })
                    .collect(),
            });
        }
    }

    tracing::debug!(
        model = %model.name,
        records = mapped.outputs.len(),
        tables = mapped.color_tables.len(),
        "outputs mapped"
    );
    Ok(mapped)
}
