//! Image acquisition: reuse, build, or pull
//!
//! One deterministic decision per request, driven by local presence, the
//! cache-bypass flag, and the model's capability flags. No retries: any
//! failed download, build, or pull surfaces immediately with the captured
//! log tail.

use tempfile::TempDir;

use crate::catalog::{resolver, Model};
use crate::types::{AcquireError, LogSink};

use super::ContainerEngine;

/// Action selected by the acquisition decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireAction {
    /// Image is present and usable as-is.
    Reuse,
    /// Download the recipe and build locally.
    Build,
    /// Pull the pre-built image from the repository.
    Pull,
}

/// Decision table over (present, no_cache, downloadable, pullable).
///
/// `None` means the image cannot be obtained: absent locally, no recipe,
/// no pullable image. A present image that cannot be refreshed (no_cache
/// set but neither downloadable nor pullable) is reused, since the run
/// can still proceed.
pub fn plan(
    present: bool,
    no_cache: bool,
    downloadable: bool,
    pullable: bool,
) -> Option<AcquireAction> {
    match (present, no_cache, downloadable, pullable) {
        (true, false, _, _) => Some(AcquireAction::Reuse),
        (true, true, true, _) => Some(AcquireAction::Build),
        (true, true, false, true) => Some(AcquireAction::Pull),
        (true, true, false, false) => Some(AcquireAction::Reuse),
        (false, _, true, _) => Some(AcquireAction::Build),
        (false, _, false, true) => Some(AcquireAction::Pull),
        (false, _, false, false) => None,
    }
}

/// Download the build recipe into a fresh scratch directory.
///
/// The directory owns its lifetime: it is removed when the returned
/// `TempDir` is dropped, after the build consumed it.
pub async fn download_recipe(
    model: &Model,
    use_gpu: bool,
    sink: &dyn LogSink,
) -> Result<TempDir, AcquireError> {
    let url = resolver::download_url(model, use_gpu)?;
    let scratch = tempfile::tempdir()?;

    let response = reqwest::get(url.clone())
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| AcquireError::Download {
            url: url.to_string(),
            source,
        })?;
    let body = response
        .bytes()
        .await
        .map_err(|source| AcquireError::Download {
            url: url.to_string(),
            source,
        })?;

    tokio::fs::write(scratch.path().join("Dockerfile"), &body).await?;
    sink.line(&format!(
        "Recipe downloaded to {}",
        scratch.path().display()
    ));
    Ok(scratch)
}

/// Build the image locally from its downloaded recipe, tagged with the
/// resolver's image reference.
pub async fn build(
    engine: &ContainerEngine,
    model: &Model,
    use_gpu: bool,
    no_cache: bool,
    sink: &dyn LogSink,
) -> Result<(), AcquireError> {
    let image_ref = resolver::image_ref(model, use_gpu)?;
    let recipe = download_recipe(model, use_gpu, sink).await?;
    let config = engine.config();

    let mut args = vec![
        "build".to_string(),
        "-t".to_string(),
        image_ref.clone(),
        "--build-arg".to_string(),
        format!("USER_ID={}", config.build_uid),
        "--build-arg".to_string(),
        format!("GROUP_ID={}", config.build_gid),
        "--platform".to_string(),
        config.platform.clone(),
    ];
    if no_cache {
        args.push("--no-cache".to_string());
    }
    args.push(recipe.path().display().to_string());

    sink.step(&format!("Building image ({})", args.join(" ")));
    let output = engine.stream(&args, sink).await?;
    if output.status != 0 {
        return Err(AcquireError::Build {
            image_ref,
            status: output.status,
            tail: output.tail_text(),
        });
    }
    sink.line("Image built.");
    Ok(())
}

/// Pull the pre-built image from its repository.
pub async fn pull(
    engine: &ContainerEngine,
    model: &Model,
    use_gpu: bool,
    sink: &dyn LogSink,
) -> Result<(), AcquireError> {
    let image_ref = resolver::image_ref(model, use_gpu)?;
    let args = vec!["pull".to_string(), image_ref.clone()];

    sink.step(&format!("Pulling image ({})", args.join(" ")));
    let output = engine.stream(&args, sink).await?;
    if output.status != 0 {
        return Err(AcquireError::Pull {
            image_ref,
            status: output.status,
            tail: output.tail_text(),
        });
    }
    sink.line("Image pulled.");
    Ok(())
}
