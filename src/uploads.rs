//! Media uploads: content-addressed file names under the upload directory and
//! the multi-size `.ico` derived from a favicon upload.

use crate::constants::{ALLOWED_UPLOAD_EXTENSIONS, FAVICON_SIZES};
use crate::content::slugify;
use crate::error::{CmsError, Result};
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::{imageops::FilterType, ExtendedColorType};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;

/// Hex chars of the content hash kept in the stored file name.
const HASH_PREFIX_LEN: usize = 12;

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ico_url: Option<String>,
}

/// Where and under which limits files are stored.
pub struct UploadTarget<'a> {
    pub dir: &'a Path,
    pub base_url: &'a str,
    pub max_bytes: usize,
}

/// Lowercased extension and slugified stem of a client file name.
fn split_name(original: &str) -> Result<(String, String)> {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let (stem, ext) = base
        .rsplit_once('.')
        .ok_or_else(|| CmsError::validation("file name has no extension"))?;
    let ext = ext.to_lowercase();
    if !ALLOWED_UPLOAD_EXTENSIONS.contains(&ext.as_str()) {
        return Err(CmsError::validation(format!(
            "file type '.{ext}' is not allowed (allowed: {})",
            ALLOWED_UPLOAD_EXTENSIONS.join(", ")
        )));
    }
    let stem = match slugify(stem) {
        s if s.is_empty() => "file".to_string(),
        s => s,
    };
    Ok((stem, ext))
}

fn is_raster(ext: &str) -> bool {
    ext != "svg"
}

pub fn check_upload(original_name: &str, bytes: &[u8], max_bytes: usize) -> Result<(String, String)> {
    if bytes.is_empty() {
        return Err(CmsError::validation("uploaded file is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(CmsError::validation(format!(
            "file exceeds the {} byte upload limit",
            max_bytes
        )));
    }
    let (stem, ext) = split_name(original_name)?;
    if is_raster(&ext) && image::guess_format(bytes).is_err() {
        return Err(CmsError::validation("file content is not a recognised image"));
    }
    Ok((stem, ext))
}

fn stored_name(bytes: &[u8], stem: &str, ext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hex = hex::encode(hasher.finalize());
    format!("{}-{}.{}", &hex[..HASH_PREFIX_LEN], stem, ext)
}

fn write_once(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    if !path.exists() {
        fs::write(&path, bytes)?;
    }
    Ok(())
}

fn public_url(base_url: &str, name: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), name)
}

/// Validates and stores one file. Identical content maps to the same name, so
/// re-uploading is idempotent. With `favicon`, a 16/32/48 px `.ico` is written
/// next to it.
pub fn save_upload(target: &UploadTarget<'_>, original_name: &str, bytes: &[u8], favicon: bool) -> Result<UploadedFile> {
    let (stem, ext) = check_upload(original_name, bytes, target.max_bytes)?;
    let filename = stored_name(bytes, &stem, &ext);
    write_once(target.dir, &filename, bytes)?;

    let ico_url = if favicon {
        if !is_raster(&ext) {
            return Err(CmsError::validation("favicon source must be a raster image"));
        }
        let ico = derive_favicon(bytes)?;
        let ico_name = stored_name(&ico, &format!("{stem}-favicon"), "ico");
        write_once(target.dir, &ico_name, &ico)?;
        Some(public_url(target.base_url, &ico_name))
    } else {
        None
    };

    info!("Stored upload {} ({} bytes)", filename, bytes.len());
    Ok(UploadedFile {
        url: public_url(target.base_url, &filename),
        size: bytes.len(),
        filename,
        ico_url,
    })
}

/// Multi-resolution `.ico` with one PNG frame per favicon size.
pub fn derive_favicon(bytes: &[u8]) -> Result<Vec<u8>> {
    let source = image::load_from_memory(bytes)?;
    let mut frames = Vec::with_capacity(FAVICON_SIZES.len());
    for size in FAVICON_SIZES {
        let resized = source.resize_exact(size, size, FilterType::Lanczos3).to_rgba8();
        frames.push(IcoFrame::as_png(resized.as_raw(), size, size, ExtendedColorType::Rgba8)?);
    }
    let mut out = Vec::new();
    IcoEncoder::new(&mut out).encode_images(&frames)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([200, 30, 30, 255])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn target(dir: &Path) -> UploadTarget<'_> {
        UploadTarget {
            dir,
            base_url: "/uploads/",
            max_bytes: 1024 * 1024,
        }
    }

    #[test]
    fn stores_under_content_hash_name() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = png_bytes();
        let first = save_upload(&target(dir.path()), "My Logo.PNG", &bytes, false).unwrap();
        assert!(first.filename.ends_with("-my-logo.png"));
        assert!(first.url.starts_with("/uploads/"));
        assert!(dir.path().join(&first.filename).exists());

        let again = save_upload(&target(dir.path()), "My Logo.PNG", &bytes, false).unwrap();
        assert_eq!(again.filename, first.filename);
    }

    #[test]
    fn rejects_disallowed_oversized_and_fake_files() {
        let dir = tempfile::tempdir().unwrap();
        let t = target(dir.path());
        assert!(save_upload(&t, "run.exe", b"MZ", false).is_err());
        assert!(save_upload(&t, "noext", b"x", false).is_err());
        assert!(save_upload(&t, "fake.png", b"not an image", false).is_err());
        let small = UploadTarget { max_bytes: 4, ..t };
        let err = save_upload(&small, "a.svg", b"<svg></svg>", false).unwrap_err();
        assert!(matches!(err, CmsError::Validation(_)));
    }

    #[test]
    fn favicon_upload_writes_ico() {
        let dir = tempfile::tempdir().unwrap();
        let saved = save_upload(&target(dir.path()), "icon.png", &png_bytes(), true).unwrap();
        let ico_url = saved.ico_url.unwrap();
        assert!(ico_url.ends_with("-icon-favicon.ico"));
        let name = ico_url.rsplit('/').next().unwrap();
        let ico = fs::read(dir.path().join(name)).unwrap();
        assert_eq!(image::guess_format(&ico).unwrap(), ImageFormat::Ico);
        // ICONDIR: reserved, type 1, image count
        assert_eq!(u16::from_le_bytes([ico[4], ico[5]]) as usize, FAVICON_SIZES.len());
    }
}
