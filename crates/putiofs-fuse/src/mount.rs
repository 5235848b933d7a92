//! Mount point validation and kernel mount options.

use std::path::Path;
use thiserror::Error;

/// Source name used when none is given.
pub const DEFAULT_FSNAME: &str = "putiofs";

/// Options passed to the kernel at mount time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Source name shown by `mount` and `df`.
    pub fsname: String,
    /// Mount read-only.
    pub read_only: bool,
    /// Allow users other than the mounting one.
    pub allow_other: bool,
    /// Unmount when the daemon exits.
    pub auto_unmount: bool,
    /// Let the kernel check permissions against the reported modes.
    pub default_permissions: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        MountOptions {
            fsname: DEFAULT_FSNAME.to_string(),
            read_only: false,
            allow_other: false,
            auto_unmount: false,
            default_permissions: true,
        }
    }
}

/// Why a mount could not be set up.
#[derive(Debug, Error)]
pub enum MountError {
    /// The mountpoint does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// The mountpoint is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// An `-o` option was not recognised.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// The kernel refused the mount.
    #[error("Mount failed at {mountpoint}: {source}")]
    Failed {
        /// Where the mount was attempted.
        mountpoint: String,
        /// Error reported by the mount call.
        #[source]
        source: std::io::Error,
    },
}

/// Checks that `path` is an existing directory.
pub fn validate_mountpoint(path: &Path) -> Result<(), MountError> {
    if !path.exists() {
        return Err(MountError::PathNotFound(path.display().to_string()));
    }

    if !path.is_dir() {
        return Err(MountError::NotADirectory(path.display().to_string()));
    }

    Ok(())
}

/// Applies a comma-separated `-o` option string on top of `base`.
///
/// Valid options: allow_other, auto_unmount, default_permissions,
/// no_default_permissions, ro, rw, fsname=NAME.
pub fn parse_mount_options(base: MountOptions, opts_str: &str) -> Result<MountOptions, MountError> {
    let mut options = base;

    for opt in opts_str.split(',') {
        let opt = opt.trim();
        match opt {
            "allow_other" => options.allow_other = true,
            "auto_unmount" => options.auto_unmount = true,
            "default_permissions" => options.default_permissions = true,
            "no_default_permissions" => options.default_permissions = false,
            "ro" => options.read_only = true,
            "rw" => options.read_only = false,
            "" => {}
            _ => match opt.strip_prefix("fsname=") {
                Some(name) if !name.is_empty() => options.fsname = name.to_string(),
                _ => return Err(MountError::InvalidOption(opt.to_string())),
            },
        }
    }

    Ok(options)
}

/// Translates the options into `fuser` mount options.
pub fn options_to_fuser(opts: &MountOptions) -> Vec<fuser::MountOption> {
    let mut fuser_opts = vec![
        fuser::MountOption::FSName(opts.fsname.clone()),
        fuser::MountOption::Subtype("putiofs".to_string()),
        fuser::MountOption::NoDev,
        fuser::MountOption::NoSuid,
    ];

    if opts.allow_other {
        fuser_opts.push(fuser::MountOption::AllowOther);
    }

    if opts.auto_unmount {
        fuser_opts.push(fuser::MountOption::AutoUnmount);
    }

    if opts.default_permissions {
        fuser_opts.push(fuser::MountOption::DefaultPermissions);
    }

    if opts.read_only {
        fuser_opts.push(fuser::MountOption::RO);
    } else {
        fuser_opts.push(fuser::MountOption::RW);
    }

    // Finder otherwise litters every directory with ._ files and xattr queries.
    #[cfg(target_os = "macos")]
    {
        fuser_opts.push(fuser::MountOption::CUSTOM("noappledouble".into()));
        fuser_opts.push(fuser::MountOption::CUSTOM("noapplexattr".into()));
    }

    fuser_opts
}
