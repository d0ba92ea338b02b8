use crate::adapters::storage::{collect_files, upload_directory};
use crate::core::{Job, JobReport, ObjectStore};
use crate::utils::error::Result;
use image::{GrayImage, ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};

pub const LUT_SIZE: usize = 256;

/// Red at 0, green at 1, no blue.
///
/// Positions are `i * step` and channels are truncated, not rounded, so a
/// few green entries sit one below `i` (33 maps to 32).
pub fn red_to_green_lut() -> [[u8; 3]; LUT_SIZE] {
    let mut lut = [[0u8; 3]; LUT_SIZE];
    let step = 1.0 / (LUT_SIZE - 1) as f64;
    for (i, entry) in lut.iter_mut().enumerate() {
        let x = i as f64 * step;
        *entry = [(255.0 * (1.0 - x)) as u8, (255.0 * x) as u8, 0];
    }
    lut
}

fn lut_index(t: f64) -> usize {
    ((t * LUT_SIZE as f64).floor() as usize).min(LUT_SIZE - 1)
}

/// Stretches the image by its own maximum and maps it through the ramp.
/// An all-zero image maps every pixel through entry 0.
pub fn colorize(gray: &GrayImage, lut: &[[u8; 3]; LUT_SIZE]) -> RgbImage {
    let max = gray.pixels().map(|p| p.0[0]).max().unwrap_or(0);
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0];
        let t = if max == 0 { 0.0 } else { f64::from(value) / f64::from(max) };
        Rgb(lut[lut_index(t)])
    })
}

/// Where `input` lands below `output_dir`, keeping its path relative to
/// `input_dir`.
pub fn output_path_for(input_dir: &Path, output_dir: &Path, input: &Path) -> PathBuf {
    output_dir.join(input.strip_prefix(input_dir).unwrap_or(input))
}

#[derive(Debug, PartialEq, Eq)]
pub enum RampOutcome {
    Written,
    AlreadyExists,
    Unreadable,
}

/// Colorizes one tile. Images that fail to decode are reported, not raised.
pub fn ramp_file(input: &Path, output: &Path, lut: &[[u8; 3]; LUT_SIZE]) -> Result<RampOutcome> {
    if output.exists() {
        return Ok(RampOutcome::AlreadyExists);
    }

    let gray = match image::open(input) {
        Ok(img) => img.to_luma8(),
        Err(e) => {
            tracing::warn!("Skipping {}, cannot open or convert to grayscale: {}", input.display(), e);
            return Ok(RampOutcome::Unreadable);
        }
    };

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    colorize(&gray, lut).save_with_format(output, ImageFormat::Png)?;
    tracing::debug!("{}", output.display());
    Ok(RampOutcome::Written)
}

#[derive(Debug, Clone)]
pub struct ColorRampSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub remote_dir: String,
}

pub struct ColorRampJob<S: ObjectStore> {
    store: S,
    settings: ColorRampSettings,
}

impl<S: ObjectStore> ColorRampJob<S> {
    pub fn new(store: S, settings: ColorRampSettings) -> Self {
        Self { store, settings }
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

#[async_trait::async_trait]
impl<S: ObjectStore> Job for ColorRampJob<S> {
    fn name(&self) -> &'static str {
        "color-ramp"
    }

    async fn run(&self) -> Result<JobReport> {
        let s = &self.settings;
        let mut report = JobReport::new(self.name());
        tracing::info!("Applying color ramp: {} -> {}", s.input_dir.display(), s.output_dir.display());

        tokio::fs::create_dir_all(&s.output_dir).await?;

        let lut = red_to_green_lut();
        let tiles: Vec<PathBuf> = collect_files(&s.input_dir)?.into_iter().filter(|p| is_png(p)).collect();
        tracing::info!("Found {} PNG tiles", tiles.len());

        for tile in &tiles {
            let output = output_path_for(&s.input_dir, &s.output_dir, tile);
            match ramp_file(tile, &output, &lut)? {
                RampOutcome::Written => report.items_processed += 1,
                RampOutcome::AlreadyExists | RampOutcome::Unreadable => report.items_skipped += 1,
            }
        }

        report.objects_uploaded = upload_directory(&self.store, &s.output_dir, &s.remote_dir).await?;
        Ok(report.with_output(self.store.uri(&s.remote_dir)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use tempfile::TempDir;

    #[test]
    fn test_lut_endpoints() {
        let lut = red_to_green_lut();
        assert_eq!(lut[0], [255, 0, 0]);
        assert_eq!(lut[255], [0, 255, 0]);
        assert!(lut.iter().all(|c| c[2] == 0));
    }

    #[test]
    fn test_lut_truncates_interpolated_channels() {
        let lut = red_to_green_lut();
        assert_eq!(lut[33], [222, 32, 0]);
        assert_eq!(lut[37], [218, 36, 0]);
        assert_eq!(lut[74], [181, 73, 0]);
        assert_eq!(lut[128], [127, 128, 0]);
    }

    #[test]
    fn test_lut_index_clamps_top() {
        assert_eq!(lut_index(0.0), 0);
        assert_eq!(lut_index(0.5), 128);
        assert_eq!(lut_index(1.0), 255);
    }

    #[test]
    fn test_colorize_normalizes_by_max() {
        let gray = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 50 }]));
        let rgb = colorize(&gray, &red_to_green_lut());
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 255, 0]);
    }

    #[test]
    fn test_colorize_all_zero_is_red() {
        let gray = GrayImage::new(3, 3);
        let rgb = colorize(&gray, &red_to_green_lut());
        assert!(rgb.pixels().all(|p| p.0 == [255, 0, 0]));
    }

    #[test]
    fn test_ramp_file_skips_existing_and_unreadable() {
        let dir = TempDir::new().unwrap();
        let lut = red_to_green_lut();

        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not a png").unwrap();
        let out = dir.path().join("out/broken.png");
        assert_eq!(ramp_file(&broken, &out, &lut).unwrap(), RampOutcome::Unreadable);
        assert!(!out.exists());

        let existing = dir.path().join("existing.png");
        std::fs::write(&existing, b"keep").unwrap();
        assert_eq!(ramp_file(&broken, &existing, &lut).unwrap(), RampOutcome::AlreadyExists);
        assert_eq!(std::fs::read(&existing).unwrap(), b"keep");
    }

    #[test]
    fn test_output_path_keeps_tree() {
        let out = output_path_for(
            Path::new("/geo/suitability_tiles_clip"),
            Path::new("/geo/suitability_tiles_clip_rgb"),
            Path::new("/geo/suitability_tiles_clip/7/35/48.png"),
        );
        assert_eq!(out, PathBuf::from("/geo/suitability_tiles_clip_rgb/7/35/48.png"));
    }
}
