//! Filter for names that desktop environments and tools look up in every
//! directory they visit. Answering these locally keeps lookups off the
//! network; it is not an access control.

const JUNK_PREFIXES: &[&str] = &[
    // macOS
    "._",
    ".DS_Store",
    ".Spotlight-",
    ".ql_",
    ".hidden",
    ".metadata_never_index",
    ".nomedia",
    // version control
    ".git",
    ".hg",
    ".bzr",
    ".svn",
    "_darcs",
    // misc
    ".envrc",
    ".Trash-",
    ".localized",
];

/// Reports whether the final component of `path` starts with a junk prefix.
pub fn is_junk_name(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    JUNK_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}
