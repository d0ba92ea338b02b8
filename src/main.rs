use clap::Parser;
use habitat_etl::config::toml_config::StorageBackend;
use habitat_etl::utils::error::ErrorSeverity;
use habitat_etl::utils::{logger, validation::Validate};
use habitat_etl::{run_task, Cli, ProjectConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting habitat-etl {}", cli.command.name());
    tracing::info!("📁 Loading configuration from: {}", cli.config.display());

    let mut config = match ProjectConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config.display(), e);
            eprintln!("💡 Make sure the file is valid TOML format");
            std::process::exit(1);
        }
    };

    cli.command.apply_overrides(&mut config);
    if cli.verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    let Some(task) = cli.command.task() else {
        display_config_summary(&config);
        return Ok(());
    };

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run_task(task, &config, cli.monitor).await {
        Ok(report) => {
            tracing::info!("✅ {} completed successfully!", report.job);
            println!("✅ {} completed successfully!", report.job);
            for output in &report.outputs {
                println!("📁 Output: {}", output);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
                cli.command.name(),
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &ProjectConfig) {
    println!("📋 Configuration Summary:");
    match config.storage.backend {
        StorageBackend::Local => println!(
            "  Storage: local, root {} (bucket {})",
            config.storage.local_root.display(),
            config.storage.bucket
        ),
        StorageBackend::S3 => println!(
            "  Storage: s3 {} (bucket {}, region {})",
            config.storage.endpoint.as_deref().unwrap_or("default endpoint"),
            config.storage.bucket,
            config.storage.region
        ),
    }
    println!(
        "  GDAL: {}, {}, {}",
        config.gdal.gdalwarp, config.gdal.gdal_translate, config.gdal.gdal2tiles
    );
    println!();
    println!("  clip: {} + {} -> {}", config.clip.input.display(), config.clip.cutline.display(), config.clip.output.display());
    println!(
        "  load-archive: {} -> {}/{}",
        config.archive.url,
        config.archive_bucket(),
        config.archive.prefix
    );
    println!(
        "  harvest-boundaries: {} ({} override layers)",
        config.boundaries.feature_server,
        config.boundaries.settings().overrides.len()
    );
    println!(
        "  color-ramp: {} -> {} -> {}",
        config.color_ramp.input_dir.display(),
        config.color_ramp.output_dir.display(),
        config.color_ramp.remote_dir
    );
    let suitability = config.suitability.settings();
    println!(
        "  suitability-tiles: steps [{}], zoom {}, output {}",
        suitability.steps.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "),
        suitability.zoom,
        suitability.output_dir.display()
    );
    println!(
        "  make-tiles: {} -> {} ({:?}, zoom {})",
        config.tiles.input.display(),
        config.tiles.output_dir.display(),
        config.tiles.mode,
        config.tiles.zoom
    );
    println!(
        "  inspect-service: {} where {} == {}",
        config.inspect.feature_server, config.inspect.property, config.inspect.value
    );
    println!(
        "  scrape-regulations: '{}' from {} -> {}",
        config.regulations.species,
        config.regulations.url,
        config.regulations.output.display()
    );
    println!();
}
