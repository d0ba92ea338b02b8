#![allow(dead_code)]

use habitat_etl::domain::ports::RasterToolkit;
use habitat_etl::domain::raster::{ClipOptions, TileOptions, TranslateOptions};
use habitat_etl::Result;
use image::{GrayImage, Luma};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use zip::write::{SimpleFileOptions, ZipWriter};

/// Stands in for GDAL: records calls and writes placeholder outputs.
#[derive(Clone, Default)]
pub struct FakeToolkit {
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeToolkit {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RasterToolkit for FakeToolkit {
    async fn warp_to_cutline(&self, input: &Path, _cutline: &Path, output: &Path, _options: &ClipOptions) -> Result<()> {
        self.calls.lock().unwrap().push(format!("warp {}", input.display()));
        std::fs::write(output, b"clipped")?;
        Ok(())
    }

    async fn translate(&self, input: &Path, output: &Path, options: &TranslateOptions) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("translate {} {:?}", options.format.driver_name(), options.nodata));
        std::fs::write(output, std::fs::read(input)?)?;
        Ok(())
    }

    async fn generate_tiles(&self, _input: &Path, output_dir: &Path, options: &TileOptions) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("tiles {} nodata {:?}", options.zoom, options.src_nodata));
        for level in options.zoom.min..=options.zoom.max {
            let dir = output_dir.join(level.to_string()).join("0");
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join("0.png"), b"png")?;
        }
        Ok(())
    }
}

/// Zip bytes; entries ending in `/` become directories.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
        } else {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}

/// Horizontal grayscale gradient from 0 to `max`.
pub fn write_gradient_png(path: &Path, width: u32, max: u8) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = GrayImage::from_fn(width, 1, |x, _| {
        Luma([(u32::from(max) * x / (width - 1).max(1)) as u8])
    });
    img.save(path).unwrap();
}

/// Every file below `dir`, as sorted `/`-joined relative paths.
pub fn tree(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let rel = path.strip_prefix(dir).unwrap();
                out.push(
                    rel.components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/"),
                );
            }
        }
    }
    out.sort();
    out
}
