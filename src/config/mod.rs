pub mod toml_config;

pub use toml_config::{ProjectConfig, StorageBackend, DEFAULT_CONFIG_PATH};

#[cfg(feature = "cli")]
pub use cli::{Cli, Command};

#[cfg(feature = "cli")]
mod cli {
    use super::toml_config::{ProjectConfig, TileModeKind, DEFAULT_CONFIG_PATH};
    use crate::app::tasks::Task;
    use crate::core::tiles::PipelineStep;
    use crate::domain::model::ZoomRange;
    use clap::{Parser, Subcommand};
    use serde_json::Value;
    use std::path::PathBuf;

    #[derive(Debug, Parser)]
    #[command(name = "habitat-etl")]
    #[command(about = "Acquire, transform and publish habitat suitability map data")]
    #[command(version)]
    pub struct Cli {
        /// Path to TOML configuration file
        #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
        pub config: PathBuf,

        /// Enable verbose output
        #[arg(short, long, global = true)]
        pub verbose: bool,

        /// Log process CPU and memory around the job
        #[arg(long, global = true)]
        pub monitor: bool,

        /// Emit logs as JSON lines
        #[arg(long, global = true)]
        pub json_logs: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Subcommand)]
    pub enum Command {
        /// Cut a raster to a polygon cutline
        Clip {
            #[arg(long)]
            input: Option<PathBuf>,
            #[arg(long)]
            cutline: Option<PathBuf>,
            #[arg(long)]
            output: Option<PathBuf>,
            #[arg(long)]
            dst_nodata: Option<f64>,
        },
        /// Download a zip archive and upload its members to a bucket
        LoadArchive {
            #[arg(long)]
            url: Option<String>,
            #[arg(long)]
            bucket: Option<String>,
            #[arg(long)]
            prefix: Option<String>,
            #[arg(long)]
            staging_dir: Option<PathBuf>,
        },
        /// Harvest boundary layers from a feature server into GeoJSON
        HarvestBoundaries {
            #[arg(long)]
            feature_server: Option<String>,
            #[arg(long)]
            schema: Option<PathBuf>,
            #[arg(long)]
            local_dir: Option<PathBuf>,
            #[arg(long)]
            bucket_folder: Option<String>,
        },
        /// Recolor grayscale PNG tiles with a red-to-green ramp and upload them
        ColorRamp {
            #[arg(long)]
            input_dir: Option<PathBuf>,
            #[arg(long)]
            output_dir: Option<PathBuf>,
            #[arg(long)]
            remote_dir: Option<String>,
        },
        /// Acquire, clip, tile and upload the suitability raster
        SuitabilityTiles {
            #[arg(long)]
            data_root: Option<PathBuf>,
            #[arg(long)]
            zoom: Option<ZoomRange>,
            /// Steps to leave out (acquire, clip, tile, upload)
            #[arg(long, value_delimiter = ',')]
            skip: Vec<PipelineStep>,
        },
        /// Build a web tile pyramid from a raster
        MakeTiles {
            #[arg(long)]
            input: Option<PathBuf>,
            #[arg(long)]
            output_dir: Option<PathBuf>,
            #[arg(long)]
            zoom: Option<ZoomRange>,
            /// Tile the input directly instead of rescaling through a VRT
            #[arg(long)]
            direct: bool,
        },
        /// Print features of a feature server matching a property value
        InspectService {
            #[arg(long)]
            feature_server: Option<String>,
            #[arg(long)]
            property: Option<String>,
            /// Compared as a JSON string
            #[arg(long)]
            value: Option<String>,
        },
        /// Scrape the hunting-season table for one species into JSON
        ScrapeRegulations {
            #[arg(long)]
            url: Option<String>,
            #[arg(long)]
            species: Option<String>,
            #[arg(long)]
            output: Option<PathBuf>,
        },
        /// List the storage buckets visible to the configured credentials
        CheckCredentials,
        /// Load and validate the configuration without running anything
        ValidateConfig,
    }

    fn set<T>(target: &mut T, value: &Option<T>)
    where
        T: Clone,
    {
        if let Some(v) = value {
            *target = v.clone();
        }
    }

    impl Command {
        /// `None` for commands that do not run a job.
        pub fn task(&self) -> Option<Task> {
            Some(match self {
                Command::Clip { .. } => Task::Clip,
                Command::LoadArchive { .. } => Task::LoadArchive,
                Command::HarvestBoundaries { .. } => Task::HarvestBoundaries,
                Command::ColorRamp { .. } => Task::ColorRamp,
                Command::SuitabilityTiles { .. } => Task::SuitabilityTiles,
                Command::MakeTiles { .. } => Task::MakeTiles,
                Command::InspectService { .. } => Task::InspectService,
                Command::ScrapeRegulations { .. } => Task::ScrapeRegulations,
                Command::CheckCredentials => Task::CheckCredentials,
                Command::ValidateConfig => return None,
            })
        }

        pub fn name(&self) -> &'static str {
            match self {
                Command::Clip { .. } => "clip",
                Command::LoadArchive { .. } => "load-archive",
                Command::HarvestBoundaries { .. } => "harvest-boundaries",
                Command::ColorRamp { .. } => "color-ramp",
                Command::SuitabilityTiles { .. } => "suitability-tiles",
                Command::MakeTiles { .. } => "make-tiles",
                Command::InspectService { .. } => "inspect-service",
                Command::ScrapeRegulations { .. } => "scrape-regulations",
                Command::CheckCredentials => "check-credentials",
                Command::ValidateConfig => "validate-config",
            }
        }

        /// Writes this subcommand's flags over the matching config section.
        pub fn apply_overrides(&self, config: &mut ProjectConfig) {
            match self {
                Command::Clip {
                    input,
                    cutline,
                    output,
                    dst_nodata,
                } => {
                    set(&mut config.clip.input, input);
                    set(&mut config.clip.cutline, cutline);
                    set(&mut config.clip.output, output);
                    if dst_nodata.is_some() {
                        config.clip.options.dst_nodata = *dst_nodata;
                    }
                }
                Command::LoadArchive {
                    url,
                    bucket,
                    prefix,
                    staging_dir,
                } => {
                    set(&mut config.archive.url, url);
                    set(&mut config.archive.prefix, prefix);
                    set(&mut config.archive.staging_dir, staging_dir);
                    if bucket.is_some() {
                        config.archive.bucket = bucket.clone();
                    }
                }
                Command::HarvestBoundaries {
                    feature_server,
                    schema,
                    local_dir,
                    bucket_folder,
                } => {
                    set(&mut config.boundaries.feature_server, feature_server);
                    set(&mut config.boundaries.schema_path, schema);
                    set(&mut config.boundaries.local_dir, local_dir);
                    set(&mut config.boundaries.bucket_folder, bucket_folder);
                }
                Command::ColorRamp {
                    input_dir,
                    output_dir,
                    remote_dir,
                } => {
                    set(&mut config.color_ramp.input_dir, input_dir);
                    set(&mut config.color_ramp.output_dir, output_dir);
                    set(&mut config.color_ramp.remote_dir, remote_dir);
                }
                Command::SuitabilityTiles { data_root, zoom, skip } => {
                    set(&mut config.suitability.data_root, data_root);
                    set(&mut config.suitability.zoom, zoom);
                    config.suitability.steps.retain(|step| !skip.contains(step));
                }
                Command::MakeTiles {
                    input,
                    output_dir,
                    zoom,
                    direct,
                } => {
                    set(&mut config.tiles.input, input);
                    set(&mut config.tiles.output_dir, output_dir);
                    set(&mut config.tiles.zoom, zoom);
                    if *direct {
                        config.tiles.mode = TileModeKind::Direct;
                    }
                }
                Command::InspectService {
                    feature_server,
                    property,
                    value,
                } => {
                    set(&mut config.inspect.feature_server, feature_server);
                    set(&mut config.inspect.property, property);
                    if let Some(value) = value {
                        config.inspect.value = Value::String(value.clone());
                    }
                }
                Command::ScrapeRegulations { url, species, output } => {
                    set(&mut config.regulations.url, url);
                    set(&mut config.regulations.species, species);
                    set(&mut config.regulations.output, output);
                }
                Command::CheckCredentials | Command::ValidateConfig => {}
            }
        }
    }

}
