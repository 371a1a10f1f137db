//! Screenshot writer for trusted windows.

use std::path::{Component, Path, PathBuf};

use backplane_core::{Error, StoreDb};

use crate::session::TrustedOrigin;

/// Resolve the target of a screenshot write.
///
/// The file name must be a single plain path component so the write stays
/// directly inside `dir`.
fn resolve(dir: &Path, filename: &str) -> Result<PathBuf, Error> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Ok(dir.join(name)),
        _ => Err(Error::SaveFailed("Invalid save location".into())),
    }
}

/// Folder chosen in settings, or the configured fallback when unset or empty.
async fn folder(store: &StoreDb, fallback: &Path) -> Result<PathBuf, Error> {
    let configured = store.find_setting_value("screenshotFolderPath").await?;
    Ok(match configured.as_ref().and_then(|v| v.as_str()) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => fallback.to_path_buf(),
    })
}

/// Write `data` as `filename` into the screenshot folder.
///
/// Calls from an untrusted origin do nothing and return `Ok(None)`.
/// Returns the written path otherwise.
pub async fn write_screenshot(
    store: &StoreDb, trusted: TrustedOrigin, fallback_dir: &Path, origin: &str, filename: &str, data: &[u8],
) -> Result<Option<PathBuf>, Error> {
    if !trusted.is_trusted(origin) {
        tracing::warn!("dropping screenshot write from untrusted origin");
        return Ok(None);
    }

    let dir = folder(store, fallback_dir).await?;
    let path = resolve(&dir, filename)?;

    let written = async {
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(&path, data).await
    }
    .await;
    if let Err(e) = written {
        tracing::error!(path = %path.display(), error = %e, "screenshot write failed");
        return Err(Error::SaveFailed("Failed to save".into()));
    }

    tracing::info!(path = %path.display(), bytes = data.len(), "screenshot saved");
    Ok(Some(path))
}
