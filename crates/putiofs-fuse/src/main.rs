//! putiofs mount daemon

#![warn(missing_docs)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use putiofs_fuse::config::FsConfig;
use putiofs_fuse::mount::{parse_mount_options, MountOptions};
use putiofs_fuse::session::{start_session, SessionConfig};
use putiofs_remote::ClientConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "putiofs", version, about = "Mount a put.io account as a filesystem")]
struct Cli {
    /// Personal access token
    #[arg(long, env = "PUTIO_TOKEN", hide_env_values = true)]
    token: String,

    /// Log every filesystem operation
    #[arg(short, long)]
    debug: bool,

    /// Mount read-only
    #[arg(long)]
    readonly: bool,

    /// Extra mount options, comma separated (allow_other, auto_unmount, fsname=NAME, ...)
    #[arg(short = 'o', long = "options", value_name = "OPTS")]
    options: Option<String>,

    /// Fetch files directly instead of through the tunnel servers
    #[arg(long)]
    no_tunnel: bool,

    /// Directory to mount on
    mountpoint: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut mount_options = MountOptions {
        read_only: cli.readonly,
        ..Default::default()
    };
    if let Some(opts) = &cli.options {
        mount_options = parse_mount_options(mount_options, opts)?;
    }

    let mut client = ClientConfig::with_token(cli.token);
    client.use_tunnel = !cli.no_tunnel;

    let config = SessionConfig {
        mountpoint: cli.mountpoint,
        client,
        fs: FsConfig::for_current_user(),
        mount_options,
    };

    // Kernel requests run on this runtime's blocking pool and block on it for
    // remote calls, so mounting has to happen outside of it.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("putiofs-http")
        .build()
        .context("failed to start async runtime")?;

    tracing::info!("putiofs starting");
    let session = start_session(config, runtime.handle().clone())?;
    tracing::info!(mountpoint = %session.mountpoint().display(), "mounted; press Ctrl-C to unmount");

    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("failed to wait for interrupt")?;

    session.unmount();
    tracing::info!("putiofs stopped");
    Ok(())
}
