use crate::domain::ports::RasterToolkit;
use crate::domain::raster::{ClipOptions, TileOptions, TranslateOptions};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

const STDERR_TAIL_LINES: usize = 20;

/// Names or paths of the GDAL programs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GdalPrograms {
    pub gdalwarp: String,
    pub gdal_translate: String,
    pub gdal2tiles: String,
}

impl Default for GdalPrograms {
    fn default() -> Self {
        Self {
            gdalwarp: "gdalwarp".to_string(),
            gdal_translate: "gdal_translate".to_string(),
            gdal2tiles: "gdal2tiles.py".to_string(),
        }
    }
}

/// [`RasterToolkit`] backed by the GDAL command-line utilities.
#[derive(Debug, Clone, Default)]
pub struct GdalCli {
    programs: GdalPrograms,
}

impl GdalCli {
    pub fn new(programs: GdalPrograms) -> Self {
        Self { programs }
    }

    async fn run(&self, program: &str, args: Vec<OsString>) -> Result<()> {
        tracing::debug!("Running {} {:?}", program, args);

        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| EtlError::ToolError {
                tool: program.to_string(),
                code: "not started".to_string(),
                stderr: e.to_string(),
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!("{}: {}", program, line);
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        Err(EtlError::ToolError {
            tool: program.to_string(),
            code: output.status.to_string(),
            stderr: tail,
        })
    }
}

#[async_trait]
impl RasterToolkit for GdalCli {
    async fn warp_to_cutline(
        &self,
        input: &Path,
        cutline: &Path,
        output: &Path,
        options: &ClipOptions,
    ) -> Result<()> {
        self.run(&self.programs.gdalwarp, warp_args(input, cutline, output, options))
            .await
    }

    async fn translate(&self, input: &Path, output: &Path, options: &TranslateOptions) -> Result<()> {
        self.run(&self.programs.gdal_translate, translate_args(input, output, options))
            .await
    }

    async fn generate_tiles(&self, input: &Path, output_dir: &Path, options: &TileOptions) -> Result<()> {
        self.run(&self.programs.gdal2tiles, tile_args(input, output_dir, options))
            .await
    }
}

fn push<I: Into<OsString>>(args: &mut Vec<OsString>, values: impl IntoIterator<Item = I>) {
    args.extend(values.into_iter().map(Into::into));
}

pub fn warp_args(input: &Path, cutline: &Path, output: &Path, options: &ClipOptions) -> Vec<OsString> {
    let mut args = Vec::new();
    push(&mut args, ["-overwrite", "-cutline"]);
    args.push(cutline.as_os_str().to_owned());
    if options.crop_to_cutline {
        push(&mut args, ["-crop_to_cutline"]);
    }
    if let Some(nodata) = options.dst_nodata {
        push(&mut args, ["-dstnodata".to_string(), nodata.to_string()]);
    }
    for creation in &options.creation_options {
        push(&mut args, ["-co", creation.as_str()]);
    }
    args.push(input.as_os_str().to_owned());
    args.push(output.as_os_str().to_owned());
    args
}

pub fn translate_args(input: &Path, output: &Path, options: &TranslateOptions) -> Vec<OsString> {
    let scale = &options.scale;
    let mut args = Vec::new();
    push(&mut args, ["-of", options.format.driver_name(), "-ot", "Byte", "-scale"]);
    push(
        &mut args,
        [scale.src_min, scale.src_max, scale.dst_min, scale.dst_max].map(|v| v.to_string()),
    );
    if let Some(nodata) = options.nodata {
        push(&mut args, ["-a_nodata".to_string(), nodata.to_string()]);
    }
    args.push(input.as_os_str().to_owned());
    args.push(output.as_os_str().to_owned());
    args
}

pub fn tile_args(input: &Path, output_dir: &Path, options: &TileOptions) -> Vec<OsString> {
    let mut args = Vec::new();
    if options.xyz {
        push(&mut args, ["--xyz"]);
    }
    push(&mut args, ["--zoom".to_string(), options.zoom.to_string()]);
    if let Some(nodata) = options.src_nodata {
        push(&mut args, ["-a".to_string(), nodata.to_string()]);
    }
    if let Some(profile) = &options.profile {
        push(&mut args, ["--profile", profile.as_str()]);
    }
    if let Some(resampling) = &options.resampling {
        push(&mut args, ["--resampling", resampling.as_str()]);
    }
    if let Some(size) = options.tile_size {
        push(&mut args, ["--tilesize".to_string(), size.to_string()]);
    }
    if options.resume {
        push(&mut args, ["--resume"]);
    }
    args.push(input.as_os_str().to_owned());
    args.push(output_dir.as_os_str().to_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ZoomRange;
    use crate::domain::raster::RasterFormat;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_warp_args_default_options() {
        let args = warp_args(
            Path::new("rugrLC_2010_v3.0.tif"),
            Path::new("wv_boundary.shp"),
            Path::new("clipped.tif"),
            &ClipOptions::default(),
        );
        assert_eq!(
            strings(args),
            vec![
                "-overwrite",
                "-cutline",
                "wv_boundary.shp",
                "-crop_to_cutline",
                "-co",
                "COMPRESS=DEFLATE",
                "rugrLC_2010_v3.0.tif",
                "clipped.tif",
            ]
        );
    }

    #[test]
    fn test_warp_args_with_nodata_and_no_crop() {
        let options = ClipOptions {
            crop_to_cutline: false,
            dst_nodata: Some(0.0),
            creation_options: vec![],
        };
        let args = strings(warp_args(
            Path::new("in.tif"),
            Path::new("cut.gpkg"),
            Path::new("out.tif"),
            &options,
        ));
        assert!(!args.contains(&"-crop_to_cutline".to_string()));
        assert!(!args.contains(&"-co".to_string()));
        assert!(args.windows(2).any(|w| w == ["-dstnodata", "0"]));
    }

    #[test]
    fn test_translate_args_to_byte_with_nodata() {
        let options = TranslateOptions::to_byte(RasterFormat::GTiff).with_nodata(0.0);
        let args = translate_args(Path::new("clipped.tif"), Path::new("clipped_8bit.tif"), &options);
        assert_eq!(
            strings(args),
            vec![
                "-of", "GTiff", "-ot", "Byte", "-scale", "0", "1", "0", "100", "-a_nodata", "0",
                "clipped.tif", "clipped_8bit.tif",
            ]
        );
    }

    #[test]
    fn test_tile_args_full_option_set() {
        let options = TileOptions {
            zoom: ZoomRange::new(0, 12).unwrap(),
            xyz: true,
            tile_size: Some(512),
            src_nodata: None,
            profile: Some("mercator".to_string()),
            resampling: Some("average".to_string()),
            resume: true,
        };
        let args = tile_args(Path::new("input.tif"), Path::new("output_tiles"), &options);
        assert_eq!(
            strings(args),
            vec![
                "--xyz",
                "--zoom",
                "0-12",
                "--profile",
                "mercator",
                "--resampling",
                "average",
                "--tilesize",
                "512",
                "--resume",
                "input.tif",
                "output_tiles",
            ]
        );
    }

    #[test]
    fn test_tile_args_with_source_nodata() {
        let mut options = TileOptions::xyz("2-7".parse().unwrap());
        options.src_nodata = Some(0.0);
        let args = strings(tile_args(Path::new("a.tif"), Path::new("tiles"), &options));
        assert_eq!(args, vec!["--xyz", "--zoom", "2-7", "-a", "0", "a.tif", "tiles"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_error() {
        let cli = GdalCli::new(GdalPrograms {
            gdalwarp: "definitely-not-a-gdal-binary".to_string(),
            ..GdalPrograms::default()
        });
        let result = cli
            .warp_to_cutline(
                Path::new("in.tif"),
                Path::new("cut.shp"),
                Path::new("out.tif"),
                &ClipOptions::default(),
            )
            .await;
        match result {
            Err(EtlError::ToolError { tool, code, .. }) => {
                assert_eq!(tool, "definitely-not-a-gdal-binary");
                assert_eq!(code, "not started");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_reports_code_and_stderr_tail() {
        let script = "for i in $(seq 1 25); do echo \"line $i\" >&2; done; exit 3";
        let result = GdalCli::default()
            .run("sh", vec!["-c".into(), script.into()])
            .await;
        match result {
            Err(EtlError::ToolError { tool, code, stderr }) => {
                assert_eq!(tool, "sh");
                assert!(code.contains('3'), "code was {}", code);
                assert_eq!(stderr.lines().count(), STDERR_TAIL_LINES);
                assert!(stderr.ends_with("line 25"));
                assert!(stderr.starts_with("line 6\n"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_ok() {
        GdalCli::default()
            .run("sh", vec!["-c".into(), "echo done".into()])
            .await
            .unwrap();
    }
}
