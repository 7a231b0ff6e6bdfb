use clap::Parser;
use helioscope::config::ServerConfig;
use helioscope::engine::UnimplementedEngine;
use helioscope::server;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tagged builds report the crate version; anything else reports
/// `dev@<short-hash>` so a bug report pins a commit.
fn version_string() -> &'static str {
    if env!("ON_RELEASE_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("GIT_HASH") {
        "" => "dev@unknown",
        // Leaked once, at startup, for clap's &'static str
        hash => Box::leak(format!("dev@{hash}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "helioscope")]
#[command(about = "Sky-imagery backend with solar analysis hooks")]
#[command(long_about = "\
Sky-imagery backend with solar analysis hooks

Accepts uploaded sky photos (dng, exr, png, jpg, jpeg), normalizes them into
bounded RGBA previews, and exposes the orientation render / sky segmentation /
energy forecast hooks over JSON:

  POST /upload     multipart file            → {ok, upload_url, upload_id}
  POST /render     {upload_id, azimuth?, zenith?, roll?}
  POST /segment    {upload_id, points: [3 x {x, y}]}
  POST /forecast   {upload_id, azimuth?, zenith?, roll?, points}
  GET  /uploads/*, /gen/*                    → stored artifacts by handle

Artifacts live under the data directory:

  data/
  ├── uploads/     # Original upload bytes, opaque id + original extension
  └── gen/         # Previews and derived images, opaque id + .png

Until an algorithm implementation is bound, render returns the preview
unchanged, segment returns a transparent mask, and forecast answers 501.

Set RUST_LOG to adjust logging (default: helioscope=info,tower_http=info).")]
#[command(version = version_string())]
struct Cli {
    /// Path to an optional config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address (host:port), overrides config
    #[arg(long)]
    listen: Option<String>,

    /// Artifact root directory, overrides config
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("helioscope=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    config.validate()?;

    // The shipped engine is the {Unavailable} variant; an algorithm crate
    // replaces it here when one exists.
    server::serve(config, Box::new(UnimplementedEngine)).await?;
    Ok(())
}
