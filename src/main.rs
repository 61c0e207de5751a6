mod cli;

use imagevault::{config, server};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting imagevault");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "imagevault=trace,iv_store=trace,iv_resize=debug,tower_http=debug".to_string()
        } else {
            "imagevault=info,iv_store=info,iv_resize=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Import { file, name } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(import_file(&file, name, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("imagevault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn import_file(file: &Path, name: Option<String>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !file.is_file() {
        anyhow::bail!("Input file does not exist: {:?}", file);
    }

    let name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Cannot derive a name from {:?}", file))?,
    };

    // The store consumes its input, so hand it a copy
    let upload_dir = config.images.resolved_upload_dir();
    std::fs::create_dir_all(&upload_dir)
        .with_context(|| format!("Failed to create upload directory: {:?}", upload_dir))?;
    let temp = tempfile::Builder::new()
        .prefix("import-")
        .tempfile_in(&upload_dir)?
        .into_temp_path();
    tokio::fs::copy(file, &temp)
        .await
        .with_context(|| format!("Failed to copy {:?} for import", file))?;

    let ctx = server::AppContext::from_config(config)?;
    let outcome = ctx.store.save_file(temp.to_path_buf(), name).await?;
    drop(temp);

    println!("{}", outcome.url);
    if outcome.is_partial() {
        println!("Stored with warnings:");
    }
    for warning in &outcome.warnings {
        println!("  ! {}", serde_json::to_string(warning)?);
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");
    println!("Configured resize backend: {:?}\n", config.resize.backend);

    let tools = iv_resize::tools::check_tools(config.resize.convert_path.as_deref());
    let mut any_ok = false;

    for tool in &tools {
        let status = if tool.available {
            any_ok = true;
            "✓"
        } else {
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if any_ok {
        println!("ImageMagick is available; the imagemagick backend can be used.");
    } else {
        println!("ImageMagick not found. The native backend works without it.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let images = &config.images;
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Images root: {:?}", images.resolved_root());
    println!("  App root: {:?}", images.resolved_app_root());
    println!("  URL prefix: {:?}", images.subdir);
    println!("  Served under: {}", images.base_url);
    println!("  Partition: {:?}", images.partition);
    println!(
        "  Thumbnail: {}x{}, display: {}x{}",
        images.thumbnail.width, images.thumbnail.height, images.display.width, images.display.height
    );
    println!("  Resize backend: {:?}", config.resize.backend);

    Ok(())
}
