//! End-to-end filesystem scenarios against an in-memory store.
//!
//! Each test drives `PutioFs` the way the kernel would (lookup, open,
//! read or write, flush, release) and checks both the visible result and
//! the remote calls it cost.

mod common;

use common::{pattern, Fixture, ROOT_INO};
use putiofs_fuse::diag::NO_TRANSFERS;
use putiofs_fuse::FsError;
use putiofs_remote::{AccountInfo, DiskUsage, MemoryStore, Transfer, ROOT_ID};

#[test]
fn test_lookup_reports_size_and_kind() {
    let fx = Fixture::new();
    let file = fx.seed_file("movie.mkv", &pattern(1000));
    let (attr, _) = fx.fs.lookup_entry(ROOT_INO, "movie.mkv").unwrap();
    assert_eq!(attr.ino, file.id as u64 + 1);
    assert_eq!(attr.size, 1000);
    assert_eq!(attr.kind, fuser::FileType::RegularFile);
}

#[test]
fn test_lookup_missing_is_enoent() {
    let fx = Fixture::new();
    let err = fx.fs.lookup_entry(ROOT_INO, "nothing-here").unwrap_err();
    assert_eq!(err.to_errno(), libc::ENOENT);
}

#[test]
fn test_junk_lookups_never_reach_the_store() {
    let fx = Fixture::new();
    fx.seed_file("._movie.mkv", b"x");
    for name in ["._movie.mkv", ".DS_Store", ".git", ".hidden", ".Trash-1000"] {
        let err = fx.fs.lookup_entry(ROOT_INO, name).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }), "{}", name);
    }
    assert_eq!(fx.store.calls().total(), 0);
}

#[test]
fn test_sequential_reads_share_one_download() {
    let fx = Fixture::new();
    let data = pattern(10_000);
    fx.seed_file("big.bin", &data);
    let ino = fx.lookup(ROOT_INO, "big.bin");
    fx.store.reset_calls();

    assert_eq!(fx.read_all(ino, 4096), data);
    assert_eq!(fx.store.calls().download, 1);
}

#[test]
fn test_seek_reopens_at_requested_offset() {
    let fx = Fixture::new();
    let data = pattern(5000);
    fx.seed_file("seek.bin", &data);
    let ino = fx.lookup(ROOT_INO, "seek.bin");
    let fh = fx.open_read(ino);
    fx.store.reset_calls();

    assert_eq!(fx.fs.read_file(fh, 0, 100).unwrap(), &data[0..100]);
    assert_eq!(fx.fs.read_file(fh, 3000, 100).unwrap(), &data[3000..3100]);
    assert_eq!(fx.fs.read_file(fh, 3100, 100).unwrap(), &data[3100..3200]);
    assert_eq!(fx.fs.read_file(fh, 10, 5).unwrap(), &data[10..15]);
    assert_eq!(fx.store.calls().download, 3);
}

#[test]
fn test_read_past_end_is_empty_without_download() {
    let fx = Fixture::new();
    fx.seed_file("short.txt", b"hello");
    let ino = fx.lookup(ROOT_INO, "short.txt");
    let fh = fx.open_read(ino);
    fx.store.reset_calls();

    assert_eq!(fx.fs.read_file(fh, 3, 100).unwrap(), b"lo");
    assert!(fx.fs.read_file(fh, 5, 100).unwrap().is_empty());
    assert!(fx.fs.read_file(fh, 500, 100).unwrap().is_empty());
    assert_eq!(fx.store.calls().download, 1);
}

#[test]
fn test_negative_offset_is_einval() {
    let fx = Fixture::new();
    fx.seed_file("a.txt", b"abc");
    let ino = fx.lookup(ROOT_INO, "a.txt");
    let fh = fx.open_read(ino);
    let err = fx.fs.read_file(fh, -1, 10).unwrap_err();
    assert_eq!(err.to_errno(), libc::EINVAL);
}

#[test]
fn test_create_write_flush_uploads_once() {
    let fx = Fixture::new();
    let (attr, fh) = fx.fs.create_file(ROOT_INO, "notes.txt").unwrap();
    assert_eq!(attr.size, 0);
    let placeholder = fx.store.find(ROOT_ID, "notes.txt").unwrap();
    fx.store.reset_calls();

    assert_eq!(fx.fs.write_file(fh, 0, b"AAAA").unwrap(), 4);
    assert_eq!(fx.fs.write_file(fh, 2, b"BB").unwrap(), 2);
    assert_eq!(fx.store.calls().total(), 0);

    fx.fs.flush_file(fh).unwrap();
    let calls = fx.store.calls();
    assert_eq!(calls.delete, 1);
    assert_eq!(calls.upload, 1);
    assert!(fx.store.entry(placeholder.id).is_none());

    let uploaded = fx.store.find(ROOT_ID, "notes.txt").unwrap();
    assert_eq!(fx.store.contents(uploaded.id).unwrap(), b"AABB");
    assert_eq!(fx.fs.get_attr(attr.ino).unwrap().size, 4);

    // Reading the file back through the filesystem sees the flushed bytes.
    let ino = fx.lookup(ROOT_INO, "notes.txt");
    assert_eq!(fx.read_all(ino, 4096), b"AABB");

    // A second flush with nothing new written costs nothing.
    fx.store.reset_calls();
    fx.fs.flush_file(fh).unwrap();
    fx.fs.release_file(fh);
    assert_eq!(fx.store.calls().total(), 0);
}

#[test]
fn test_release_without_flush_uploads_nothing() {
    let fx = Fixture::new();
    let (_, fh) = fx.fs.create_file(ROOT_INO, "draft.txt").unwrap();
    fx.store.reset_calls();

    fx.fs.write_file(fh, 0, b"unsaved").unwrap();
    fx.fs.release_file(fh);

    assert_eq!(fx.store.calls().total(), 0);
    let entry = fx.store.find(ROOT_ID, "draft.txt").unwrap();
    assert!(fx.store.contents(entry.id).unwrap().is_empty());
    assert_eq!(fx.fs.open_handles(), 0);
}

#[test]
fn test_overwrite_existing_file() {
    let fx = Fixture::new();
    fx.seed_file("config.ini", b"old contents");
    let ino = fx.lookup(ROOT_INO, "config.ini");
    let (fh, _) = fx
        .fs
        .open_file(ino, libc::O_WRONLY | libc::O_TRUNC)
        .unwrap();
    fx.fs.write_file(fh, 0, b"new").unwrap();
    fx.fs.flush_file(fh).unwrap();
    fx.fs.release_file(fh);

    let entry = fx.store.find(ROOT_ID, "config.ini").unwrap();
    assert_eq!(fx.store.contents(entry.id).unwrap(), b"new");
    assert_eq!(fx.fs.get_attr(ino).unwrap().size, 3);
}

#[test]
fn test_append_to_non_empty_file_is_unsupported() {
    let fx = Fixture::new();
    fx.seed_file("log.txt", b"line\n");
    let ino = fx.lookup(ROOT_INO, "log.txt");
    let err = fx
        .fs
        .open_file(ino, libc::O_WRONLY | libc::O_APPEND)
        .unwrap_err();
    assert_eq!(err.to_errno(), libc::ENOTSUP);
}

#[test]
fn test_create_existing_name_is_eexist() {
    let fx = Fixture::new();
    fx.seed_file("taken.txt", b"x");
    let err = fx.fs.create_file(ROOT_INO, "taken.txt").unwrap_err();
    assert_eq!(err.to_errno(), libc::EEXIST);
    assert_eq!(fx.store.calls().upload, 0);
}

#[test]
fn test_mkdir_then_lookup() {
    let fx = Fixture::new();
    let attr = fx.fs.make_dir(ROOT_INO, "Music").unwrap();
    assert_eq!(attr.kind, fuser::FileType::Directory);
    assert_eq!(fx.store.calls().create_folder, 1);
    assert_eq!(fx.lookup(ROOT_INO, "Music"), attr.ino);
}

#[test]
fn test_mkdir_collision_skips_create() {
    let fx = Fixture::new();
    fx.seed_dir("Movies");
    let err = fx.fs.make_dir(ROOT_INO, "Movies").unwrap_err();
    assert_eq!(err.to_errno(), libc::EEXIST);
    assert_eq!(fx.store.calls().create_folder, 0);
}

#[test]
fn test_readdir_lists_exactly_the_children() {
    let fx = Fixture::new();
    fx.seed_dir("Movies");
    fx.seed_file("a.txt", b"a");
    fx.seed_file("b.txt", b"bb");
    let dir = fx.seed_dir("Other");
    fx.store.add_file(dir.id, "nested.txt", b"n");

    let mut names = fx.names(ROOT_INO);
    assert_eq!(&names[..2], &[".", ".."]);
    names.drain(..2);
    names.sort();
    assert_eq!(names, vec!["Movies", "Other", "a.txt", "b.txt"]);
}

#[test]
fn test_readdir_dotdot_points_at_parent() {
    let fx = Fixture::new();
    fx.seed_dir("Movies");
    let movies = fx.lookup(ROOT_INO, "Movies");
    let fh = fx.fs.open_dir(movies).unwrap();
    let rows = fx.fs.dir_rows(fh).unwrap();
    assert_eq!(rows[0].ino, movies);
    assert_eq!(rows[1].ino, ROOT_INO);
}

#[test]
fn test_unlink_removes_file() {
    let fx = Fixture::new();
    let file = fx.seed_file("gone.txt", b"bye");
    fx.fs.remove_entry(ROOT_INO, "gone.txt").unwrap();
    assert!(fx.store.entry(file.id).is_none());
    assert_eq!(fx.store.calls().delete, 1);
}

#[test]
fn test_rmdir_removes_subtree() {
    let fx = Fixture::new();
    let dir = fx.seed_dir("Old");
    let nested = fx.store.add_file(dir.id, "inside.txt", b"x");
    fx.fs.remove_entry(ROOT_INO, "Old").unwrap();
    assert!(fx.store.entry(dir.id).is_none());
    assert!(fx.store.entry(nested.id).is_none());
}

#[test]
fn test_remove_protected_name_is_einval() {
    let fx = Fixture::new();
    let err = fx.fs.remove_entry(ROOT_INO, "Your Files").unwrap_err();
    assert_eq!(err.to_errno(), libc::EINVAL);
    assert_eq!(fx.store.calls().delete, 0);
}

#[test]
fn test_rename_to_same_name_costs_nothing() {
    let fx = Fixture::new();
    fx.seed_file("same.txt", b"x");
    fx.fs
        .rename_entry(ROOT_INO, "same.txt", ROOT_INO, "same.txt")
        .unwrap();
    assert_eq!(fx.store.calls().total(), 0);
}

#[test]
fn test_rename_within_directory() {
    let fx = Fixture::new();
    let file = fx.seed_file("old.txt", b"x");
    fx.fs
        .rename_entry(ROOT_INO, "old.txt", ROOT_INO, "new.txt")
        .unwrap();
    let calls = fx.store.calls();
    assert_eq!(calls.rename, 1);
    assert_eq!(calls.moves, 0);
    assert_eq!(fx.store.entry(file.id).unwrap().name, "new.txt");
}

#[test]
fn test_rename_across_directories() {
    let fx = Fixture::new();
    let file = fx.seed_file("clip.mp4", b"x");
    fx.seed_dir("Videos");
    let videos = fx.lookup(ROOT_INO, "Videos");
    fx.store.reset_calls();

    fx.fs
        .rename_entry(ROOT_INO, "clip.mp4", videos, "clip.mp4")
        .unwrap();
    let calls = fx.store.calls();
    assert_eq!(calls.moves, 1);
    assert_eq!(calls.rename, 0);
    assert_eq!(fx.store.ops(), vec!["list", "move"]);
    let moved = fx.store.entry(file.id).unwrap();
    assert_eq!(moved.parent_id, videos as i64 - 1);
    assert!(fx.fs.lookup_entry(videos, "clip.mp4").is_ok());
    assert!(matches!(
        fx.fs.lookup_entry(ROOT_INO, "clip.mp4"),
        Err(FsError::NotFound { .. })
    ));

    fx.store.reset_calls();
    fx.fs
        .rename_entry(videos, "clip.mp4", ROOT_INO, "renamed.mp4")
        .unwrap();
    let calls = fx.store.calls();
    assert_eq!(calls.moves, 1);
    assert_eq!(calls.rename, 1);
    assert_eq!(fx.store.ops(), vec!["list", "move", "rename"]);
    let back = fx.store.entry(file.id).unwrap();
    assert_eq!(back.parent_id, ROOT_ID);
    assert_eq!(back.name, "renamed.mp4");
}

#[test]
fn test_rename_missing_source_is_enoent() {
    let fx = Fixture::new();
    let err = fx
        .fs
        .rename_entry(ROOT_INO, "ghost", ROOT_INO, "spirit")
        .unwrap_err();
    assert_eq!(err.to_errno(), libc::ENOENT);
}

#[test]
fn test_symlink_is_unsupported() {
    let fx = Fixture::new();
    let err = fx
        .fs
        .symlink_entry(ROOT_INO, "link", std::path::Path::new("target"))
        .unwrap_err();
    assert_eq!(err.to_errno(), libc::ENOTSUP);
}

#[test]
fn test_fsync_is_unsupported() {
    let fx = Fixture::new();
    fx.seed_file("a.txt", b"a");
    let ino = fx.lookup(ROOT_INO, "a.txt");
    assert_eq!(fx.fs.fsync_file(ino).unwrap_err().to_errno(), libc::ENOTSUP);
}

#[test]
fn test_truncate_is_local_only() {
    let fx = Fixture::new();
    fx.seed_file("a.txt", b"abcdef");
    let ino = fx.lookup(ROOT_INO, "a.txt");
    fx.store.reset_calls();

    let attr = fx.fs.set_size(ino, Some(2)).unwrap();
    assert_eq!(attr.size, 2);
    assert_eq!(fx.store.calls().total(), 0);
}

#[test]
fn test_remote_failure_is_eio() {
    let fx = Fixture::new();
    fx.seed_file("a.txt", b"a");
    fx.store.set_failing(true);
    let err = fx.fs.lookup_entry(ROOT_INO, "a.txt").unwrap_err();
    assert_eq!(err.to_errno(), libc::EIO);
}

#[test]
fn test_account_file_renders_account() {
    let store = MemoryStore::new();
    store.set_account(AccountInfo {
        username: "alice".to_string(),
        ..Default::default()
    });
    let fx = Fixture::with_store(store);

    let (attr, ttl) = fx.fs.lookup_entry(ROOT_INO, ".account").unwrap();
    assert!(ttl.is_zero());
    assert_eq!(fx.store.calls().account_info, 1);

    let (fh, flags) = fx.fs.open_file(attr.ino, libc::O_RDONLY).unwrap();
    assert_ne!(flags & fuser::consts::FOPEN_DIRECT_IO, 0);
    let data = fx.fs.read_file(fh, 0, 64 * 1024).unwrap();
    assert_eq!(data.len() as u64, attr.size);
    let text = String::from_utf8(data).unwrap();
    assert!(text.contains("\"alice\""));
}

#[test]
fn test_each_diagnostic_lookup_gets_fresh_inode() {
    let fx = Fixture::new();
    let a = fx.lookup(ROOT_INO, ".transfers");
    let b = fx.lookup(ROOT_INO, ".transfers");
    assert_ne!(a, b);
}

#[test]
fn test_transfers_file_without_transfers() {
    let fx = Fixture::new();
    let ino = fx.lookup(ROOT_INO, ".transfers");
    let (fh, _) = fx.fs.open_file(ino, libc::O_RDONLY).unwrap();
    assert_eq!(fx.fs.read_file(fh, 0, 4096).unwrap(), NO_TRANSFERS.as_bytes());
}

#[test]
fn test_transfers_file_lists_transfers() {
    let store = MemoryStore::new();
    store.set_transfers(vec![Transfer {
        id: 1,
        name: "ubuntu.iso".to_string(),
        status: "DOWNLOADING".to_string(),
        downloaded: 500,
        size: 1000,
        download_speed: 100,
        upload_speed: 0,
        percent_done: 50,
    }]);
    let fx = Fixture::with_store(store);
    let ino = fx.lookup(ROOT_INO, ".transfers");
    let (fh, _) = fx.fs.open_file(ino, libc::O_RDONLY).unwrap();
    let text = String::from_utf8(fx.fs.read_file(fh, 0, 4096).unwrap()).unwrap();
    assert!(text.contains("ubuntu.iso"));
    assert!(text.contains("500B/1.0kB"));
    assert!(text.contains("100B/s"));
}

#[test]
fn test_stat_file_describes_directory() {
    let fx = Fixture::new();
    fx.seed_dir("Movies");
    let movies = fx.lookup(ROOT_INO, "Movies");
    let ino = fx.lookup(movies, ".stat");
    let (fh, _) = fx.fs.open_file(ino, libc::O_RDONLY).unwrap();
    let text = String::from_utf8(fx.fs.read_file(fh, 0, 4096).unwrap()).unwrap();
    assert!(text.contains("Movies"));
}

#[test]
fn test_diagnostic_files_are_read_only() {
    let fx = Fixture::new();
    let ino = fx.lookup(ROOT_INO, ".account");
    let err = fx.fs.open_file(ino, libc::O_WRONLY).unwrap_err();
    assert_eq!(err.to_errno(), libc::EINVAL);
}

#[test]
fn test_statfs_reports_account_disk() {
    let store = MemoryStore::new();
    store.set_account(AccountInfo {
        disk: DiskUsage {
            avail: 4096 * 10,
            size: 4096 * 100,
            used: 4096 * 90,
        },
        ..Default::default()
    });
    let fx = Fixture::with_store(store);
    let info = fx.fs.statfs_info();
    assert_eq!(info.blocks, 100);
    assert_eq!(info.bfree, 10);
    assert_eq!(info.bavail, 10);
}

#[test]
fn test_forget_keeps_root() {
    let fx = Fixture::new();
    fx.fs.forget_entry(ROOT_INO, 100).unwrap();
    assert!(fx.fs.get_attr(ROOT_INO).is_ok());
}

#[test]
fn test_forget_drops_looked_up_inode() {
    let fx = Fixture::new();
    fx.seed_file("a.txt", b"a");
    let ino = fx.lookup(ROOT_INO, "a.txt");
    fx.fs.forget_entry(ino, 1).unwrap();
    assert_eq!(fx.fs.get_attr(ino).unwrap_err().to_errno(), libc::ENOENT);
}
