//! FUSE session management.
//!
//! Wires the remote client, the mount-scoped root and the kernel adapter
//! together and mounts them. The kernel dispatch loop runs on a background
//! thread owned by the returned session; dropping it unmounts.

use crate::config::FsConfig;
use crate::dispatch::PutioFuse;
use crate::error::{FsError, Result};
use crate::filesystem::PutioFs;
use crate::mount::{options_to_fuser, validate_mountpoint, MountError, MountOptions};
use crate::root::FileSystemRoot;
use fuser::BackgroundSession;
use putiofs_remote::{ClientConfig, PutioClient, RemoteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// Everything needed to mount an account.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Existing directory to mount on.
    pub mountpoint: PathBuf,
    /// HTTP client settings, token included.
    pub client: ClientConfig,
    /// Filesystem behaviour.
    pub fs: FsConfig,
    /// Kernel mount options.
    pub mount_options: MountOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mountpoint: PathBuf::new(),
            client: ClientConfig::default(),
            fs: FsConfig::for_current_user(),
            mount_options: MountOptions::default(),
        }
    }
}

/// A mounted filesystem. Unmounts on drop.
pub struct Session {
    mountpoint: PathBuf,
    background: BackgroundSession,
}

impl Session {
    /// Where the filesystem is mounted.
    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    /// Unmounts and waits for the session thread to stop.
    pub fn unmount(self) {
        info!(mountpoint = %self.mountpoint.display(), "unmounting");
        drop(self.background);
    }
}

/// Rejects an empty mountpoint or token and a mountpoint that is not a
/// directory.
pub fn validate_session_config(config: &SessionConfig) -> Result<()> {
    if config.mountpoint == PathBuf::new() {
        return Err(FsError::InvalidRequest {
            msg: "mountpoint cannot be empty".into(),
        });
    }

    if config.client.token.trim().is_empty() {
        return Err(FsError::InvalidRequest {
            msg: "an access token is required".into(),
        });
    }

    if let Err(e) = validate_mountpoint(&config.mountpoint) {
        return Err(FsError::InvalidRequest {
            msg: format!("invalid mountpoint: {}", e),
        });
    }

    Ok(())
}

/// Resolves the store root and builds the kernel adapter without mounting.
pub fn build_filesystem(store: Arc<dyn RemoteStore>, fs_config: FsConfig) -> Result<PutioFs> {
    let root = FileSystemRoot::mount(store, fs_config)?;
    Ok(PutioFs::new(root))
}

/// Mounts against a live put.io account.
///
/// `runtime` drives the HTTP client and runs kernel requests that wait on
/// it. The caller must keep that runtime alive for as long as the session,
/// and must not call this from one of its worker threads.
pub fn start_session(config: SessionConfig, runtime: Handle) -> anyhow::Result<Session> {
    validate_session_config(&config)?;
    let client = PutioClient::new(config.client.clone(), runtime.clone())?;
    mount_store(Arc::new(client), &config, runtime)
}

/// Mounts any store at the configured mountpoint. Requests that may block
/// on the store run on `runtime`'s blocking pool.
pub fn mount_store(
    store: Arc<dyn RemoteStore>,
    config: &SessionConfig,
    runtime: Handle,
) -> anyhow::Result<Session> {
    let fs = PutioFuse::new(build_filesystem(store, config.fs.clone())?, runtime);
    let options = options_to_fuser(&config.mount_options);
    info!(
        mountpoint = %config.mountpoint.display(),
        read_only = config.mount_options.read_only,
        "mounting"
    );
    let background = fuser::spawn_mount2(fs, &config.mountpoint, &options).map_err(|source| {
        MountError::Failed {
            mountpoint: config.mountpoint.display().to_string(),
            source,
        }
    })?;
    Ok(Session {
        mountpoint: config.mountpoint.clone(),
        background,
    })
}
