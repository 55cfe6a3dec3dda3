//! Solid-color texture synthesis
//!
//! Materials may give PBR/Lambertian parameters as constant values instead of
//! texture references. The parser resolves those constants into synthesized
//! solid-color image files so downstream consumers only ever deal with
//! textures. The writer is a trait so tests can capture synthesized textures
//! without touching the filesystem.

use std::path::PathBuf;

use image::{Rgba, RgbaImage};

use crate::assets::AssetError;

/// Collaborator that persists solid-color square images
pub trait TextureWriter {
    /// Write a `size` x `size` image filled with `rgba` under `name` and
    /// return the source string to store in the texture reference.
    fn write_solid(&mut self, name: &str, rgba: [u8; 4], size: u32) -> Result<String, AssetError>;
}

/// Writes synthesized textures as PNG files into a directory
#[derive(Debug, Clone)]
pub struct DiskTextureWriter {
    dir: PathBuf,
}

impl DiskTextureWriter {
    /// Create a writer that places files in `dir` (usually the scene file's
    /// directory, so relative texture sources resolve uniformly)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TextureWriter for DiskTextureWriter {
    fn write_solid(&mut self, name: &str, rgba: [u8; 4], size: u32) -> Result<String, AssetError> {
        let file_name = format!("{name}.png");
        let path = self.dir.join(&file_name);
        let pixels = RgbaImage::from_pixel(size, size, Rgba(rgba));
        pixels.save(&path).map_err(|source| AssetError::ImageWrite {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("synthesized constant texture {}", path.display());
        Ok(file_name)
    }
}

/// Records synthesized textures in memory; used by parser tests
#[derive(Debug, Default)]
pub struct MemoryTextureWriter {
    /// Every write performed, in order: (name, rgba, size)
    pub written: Vec<(String, [u8; 4], u32)>,
}

impl TextureWriter for MemoryTextureWriter {
    fn write_solid(&mut self, name: &str, rgba: [u8; 4], size: u32) -> Result<String, AssetError> {
        let file_name = format!("{name}.png");
        self.written.push((name.to_string(), rgba, size));
        Ok(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_writer_records_in_order() {
        let mut writer = MemoryTextureWriter::default();
        let src = writer.write_solid("material-3-albedo", [255, 0, 0, 255], 1).unwrap();
        assert_eq!(src, "material-3-albedo.png");
        assert_eq!(writer.written.len(), 1);
        assert_eq!(writer.written[0].1, [255, 0, 0, 255]);
    }
}
