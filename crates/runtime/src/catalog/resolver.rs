//! Image reference and recipe location resolution
//!
//! Pure functions over the catalog data. `image_ref` is the linchpin of
//! the acquisition logic: the presence probe, pull, build tag, and run all
//! use the exact same string, so the "is it present" answer can never
//! drift from "what we build or pull".

use url::Url;

use crate::types::ResolveError;

use super::Model;

/// Canonical `repository/image[:tag]` reference for a model.
///
/// Deterministic: identical arguments produce byte-identical strings.
pub fn image_ref(model: &Model, use_gpu: bool) -> Result<String, ResolveError> {
    let spec = &model.dockerfile;
    if use_gpu && !spec.gpu {
        return Err(ResolveError::UnsupportedVariant {
            model: model.name.clone(),
        });
    }
    let image = if use_gpu {
        spec.image_gpu.as_deref().unwrap_or(&spec.image)
    } else {
        &spec.image
    };
    Ok(format!("{}/{}:{}", spec.repository, image, spec.tag))
}

/// Recipe location for a model, selecting between the CPU and GPU variant.
pub fn download_url(model: &Model, use_gpu: bool) -> Result<Url, ResolveError> {
    let spec = &model.dockerfile;
    if use_gpu && !spec.gpu {
        return Err(ResolveError::UnsupportedVariant {
            model: model.name.clone(),
        });
    }
    let raw = if use_gpu {
        spec.download_url_gpu
            .as_deref()
            .or(spec.download_url.as_deref())
    } else {
        spec.download_url.as_deref()
    };
    let raw = raw.ok_or_else(|| ResolveError::MissingRecipe {
        model: model.name.clone(),
    })?;
    Url::parse(raw).map_err(|source| ResolveError::BadUrl {
        url: raw.to_string(),
        source,
    })
}
