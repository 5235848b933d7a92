//! Directory nodes.
//!
//! Every operation re-lists the directory on the remote store: nothing below
//! a node's own snapshot is cached.

use crate::attr::entry_attr;
use crate::diag::{is_diagnostic_name, DiagnosticNode};
use crate::error::{FsError, Result};
use crate::file::FileNode;
use crate::inode::{ino_for_id, InodeId};
use crate::junk::is_junk_name;
use crate::node::{Node, NodeKey};
use crate::root::FileSystemRoot;
use crate::write_handle::WriteHandle;
use fuser::{FileAttr, FileType};
use parking_lot::RwLock;
use putiofs_remote::{Entry, EntryId};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One child as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Store id of the child.
    pub id: EntryId,
    /// Child name.
    pub name: String,
    /// Folder or file.
    pub is_dir: bool,
}

impl DirEntry {
    /// Inode the child maps to.
    pub fn ino(&self) -> InodeId {
        ino_for_id(self.id)
    }

    /// Kernel file type of the child.
    pub fn file_type(&self) -> FileType {
        if self.is_dir {
            FileType::Directory
        } else {
            FileType::RegularFile
        }
    }
}

impl From<&Entry> for DirEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.clone(),
            is_dir: entry.is_dir,
        }
    }
}

/// A remote folder.
#[derive(Clone)]
pub struct DirectoryNode {
    ino: InodeId,
    key: NodeKey,
    entry: Arc<RwLock<Entry>>,
    root: Arc<FileSystemRoot>,
}

impl DirectoryNode {
    /// A node with a snapshot of its own.
    pub fn new(entry: Entry, root: Arc<FileSystemRoot>) -> Self {
        let ino = ino_for_id(entry.id);
        Self::with_snapshot(ino, Arc::new(RwLock::new(entry)), root)
    }

    /// A node sharing `entry` with whoever else holds it.
    pub fn with_snapshot(ino: InodeId, entry: Arc<RwLock<Entry>>, root: Arc<FileSystemRoot>) -> Self {
        let key = NodeKey::of(&entry.read());
        Self {
            ino,
            key,
            entry,
            root,
        }
    }

    /// Kernel inode number.
    pub fn ino(&self) -> InodeId {
        self.ino
    }

    /// Remote identity.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Store id of the folder.
    pub fn id(&self) -> EntryId {
        self.key.id
    }

    /// Mount-scoped state.
    pub fn root(&self) -> &Arc<FileSystemRoot> {
        &self.root
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> Entry {
        self.entry.read().clone()
    }

    /// Overwrites the shared snapshot.
    pub fn replace_snapshot(&self, entry: Entry) {
        *self.entry.write() = entry;
    }

    /// Kernel attributes from the snapshot.
    pub fn attr(&self) -> FileAttr {
        entry_attr(self.ino, &self.entry.read(), self.root.config())
    }

    fn children(&self) -> Result<Vec<Entry>> {
        self.root
            .store()
            .list(self.id())
            .map_err(|e| FsError::from_remote(e, &self.snapshot().name))
    }

    fn find_child(&self, name: &str) -> Result<Option<Entry>> {
        Ok(self.children()?.into_iter().find(|e| e.name == name))
    }

    /// Resolves `name` to a child node.
    ///
    /// Junk names are rejected without contacting the store; reserved
    /// diagnostic names resolve to synthesized content.
    pub fn lookup(&self, name: &str) -> Result<Node> {
        if is_junk_name(name) {
            return Err(FsError::not_found(name));
        }
        debug!(dir = self.id(), name, "lookup");

        if let Some(diag) = DiagnosticNode::build(name, self.id(), &self.root)? {
            return Ok(Node::Diagnostic(diag));
        }

        match self.find_child(name)? {
            Some(entry) => Ok(Node::from_entry(entry, &self.root)),
            None => Err(FsError::not_found(name)),
        }
    }

    /// Lists the children. Stored objects whose names collide with the
    /// diagnostic files are left out, since lookups resolve those names to
    /// synthesized content.
    pub fn read_dir_all(&self) -> Result<Vec<DirEntry>> {
        debug!(dir = self.id(), "read_dir_all");
        Ok(self
            .children()?
            .iter()
            .filter(|e| !is_diagnostic_name(&e.name))
            .map(DirEntry::from)
            .collect())
    }

    /// Creates a sub-folder. The existence check and the creation are two
    /// separate remote calls; concurrent callers can both pass the check.
    pub fn mkdir(&self, name: &str) -> Result<DirectoryNode> {
        debug!(dir = self.id(), name, "mkdir");
        if self.find_child(name)?.is_some() {
            return Err(FsError::AlreadyExists {
                name: name.to_string(),
            });
        }
        let created = self.root.store().create_folder(name, self.id())?;
        Ok(DirectoryNode::new(created, self.root.clone()))
    }

    /// Creates an empty file on the store and opens it for writing.
    ///
    /// The zero-byte placeholder makes the name visible to listings right
    /// away; the first flush replaces it.
    pub fn create(&self, name: &str) -> Result<(FileNode, WriteHandle)> {
        debug!(dir = self.id(), name, "create");
        if self.find_child(name)?.is_some() {
            return Err(FsError::AlreadyExists {
                name: name.to_string(),
            });
        }
        let placeholder = self.root.store().upload(tempfile::tempfile()?, name, self.id())?;
        let file = FileNode::new(placeholder, self.root.clone());
        let handle = WriteHandle::new(file.shared_snapshot(), self.root.store().clone())?;
        Ok((file, handle))
    }

    /// Deletes the child called `name`; folders go with their contents.
    pub fn remove(&self, name: &str) -> Result<()> {
        debug!(dir = self.id(), name, "remove");
        if self.root.config().is_protected(name) {
            return Err(FsError::InvalidRequest {
                msg: format!("refusing to remove {:?}", name),
            });
        }
        let child = self
            .find_child(name)?
            .ok_or_else(|| FsError::not_found(name))?;
        self.root
            .store()
            .delete(child.id)
            .map_err(|e| FsError::from_remote(e, name))
    }

    /// Renames `old_name` in this directory to `new_name` in `new_dir`.
    ///
    /// A cross-directory rename moves first and renames afterwards, so the
    /// entry never shows up under its old name in the target directory.
    pub fn rename(&self, old_name: &str, new_dir: &DirectoryNode, new_name: &str) -> Result<()> {
        debug!(
            from_dir = self.id(),
            old_name,
            to_dir = new_dir.id(),
            new_name,
            "rename"
        );
        let same_dir = new_dir.id() == self.id();
        if same_dir && old_name == new_name {
            return Ok(());
        }

        let child = self
            .find_child(old_name)?
            .ok_or_else(|| FsError::not_found(old_name))?;
        let store = self.root.store();

        if !same_dir {
            store
                .move_entry(new_dir.id(), child.id)
                .map_err(|e| FsError::from_remote(e, old_name))?;
        }
        if old_name != new_name {
            store
                .rename(child.id, new_name)
                .map_err(|e| FsError::from_remote(e, old_name))?;
        }
        Ok(())
    }

    /// Always `NotSupported`.
    pub fn symlink(&self, name: &str, target: &Path) -> Result<Node> {
        debug!(dir = self.id(), name, target = %target.display(), "symlink");
        Err(FsError::not_supported("symlink"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FsConfig;
    use putiofs_remote::{MemoryStore, RemoteStore, ROOT_ID};

    fn setup() -> (Arc<MemoryStore>, DirectoryNode) {
        let store = Arc::new(MemoryStore::new());
        let root = FileSystemRoot::mount(store.clone(), FsConfig::default()).unwrap();
        store.reset_calls();
        (store, root.root_node())
    }

    #[test]
    fn test_lookup_file_and_directory() {
        let (store, dir) = setup();
        store.add_dir(ROOT_ID, "Movies");
        store.add_file(ROOT_ID, "notes.txt", b"hi");
        assert!(matches!(dir.lookup("Movies").unwrap(), Node::Directory(_)));
        assert!(matches!(dir.lookup("notes.txt").unwrap(), Node::File(_)));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let (store, dir) = setup();
        store.add_file(ROOT_ID, "Notes.txt", b"hi");
        assert!(matches!(dir.lookup("notes.txt"), Err(FsError::NotFound { .. })));
    }

    #[test]
    fn test_lookup_junk_skips_store() {
        let (store, dir) = setup();
        assert!(matches!(dir.lookup("._foo"), Err(FsError::NotFound { .. })));
        assert!(matches!(dir.lookup(".DS_Store"), Err(FsError::NotFound { .. })));
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn test_lookup_remote_failure_is_io() {
        let (store, dir) = setup();
        store.set_failing(true);
        let err = dir.lookup("anything").unwrap_err();
        assert!(err.is_io_failure());
    }

    #[test]
    fn test_read_dir_all_tags_kinds() {
        let (store, dir) = setup();
        store.add_dir(ROOT_ID, "d");
        store.add_file(ROOT_ID, "f", b"");
        let entries = dir.read_dir_all().unwrap();
        assert_eq!(entries.len(), 2);
        let d = entries.iter().find(|e| e.name == "d").unwrap();
        let f = entries.iter().find(|e| e.name == "f").unwrap();
        assert_eq!(d.file_type(), FileType::Directory);
        assert_eq!(f.file_type(), FileType::RegularFile);
    }

    #[test]
    fn test_mkdir_creates_folder() {
        let (store, dir) = setup();
        let created = dir.mkdir("new").unwrap();
        assert!(created.snapshot().is_dir);
        assert!(store.find(ROOT_ID, "new").unwrap().is_dir);
        assert_eq!(store.calls().create_folder, 1);
    }

    #[test]
    fn test_create_uploads_placeholder() {
        let (store, dir) = setup();
        let (file, handle) = dir.create("draft.txt").unwrap();
        assert!(!handle.is_dirty());
        assert_eq!(file.snapshot().size, 0);
        assert_eq!(store.calls().upload, 1);
        assert!(store.find(ROOT_ID, "draft.txt").is_some());
    }

    #[test]
    fn test_create_existing_name_is_rejected() {
        let (store, dir) = setup();
        store.add_file(ROOT_ID, "a.txt", b"x");
        assert!(matches!(dir.create("a.txt"), Err(FsError::AlreadyExists { .. })));
        assert_eq!(store.calls().upload, 0);
    }

    #[test]
    fn test_remove_deletes_by_name() {
        let (store, dir) = setup();
        let file = store.add_file(ROOT_ID, "a.txt", b"x");
        dir.remove("a.txt").unwrap();
        assert!(store.entry(file.id).is_none());
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let (store, dir) = setup();
        assert!(matches!(dir.remove("ghost"), Err(FsError::NotFound { .. })));
        assert_eq!(store.calls().delete, 0);
    }

    #[test]
    fn test_remove_protected_names() {
        let (store, dir) = setup();
        assert!(matches!(dir.remove("/"), Err(FsError::InvalidRequest { .. })));
        assert!(matches!(dir.remove("Your Files"), Err(FsError::InvalidRequest { .. })));
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn test_rename_in_place() {
        let (store, dir) = setup();
        let file = store.add_file(ROOT_ID, "a.txt", b"x");
        dir.rename("a.txt", &dir, "b.txt").unwrap();
        assert_eq!(store.entry(file.id).unwrap().name, "b.txt");
        let calls = store.calls();
        assert_eq!(calls.rename, 1);
        assert_eq!(calls.moves, 0);
    }

    #[test]
    fn test_rename_move_keeps_name() {
        let (store, dir) = setup();
        let target = store.add_dir(ROOT_ID, "target");
        let file = store.add_file(ROOT_ID, "a.txt", b"x");
        let target_node = DirectoryNode::new(store.get(target.id).unwrap(), dir.root().clone());
        store.reset_calls();
        dir.rename("a.txt", &target_node, "a.txt").unwrap();
        assert_eq!(store.entry(file.id).unwrap().parent_id, target.id);
        let calls = store.calls();
        assert_eq!(calls.moves, 1);
        assert_eq!(calls.rename, 0);
        assert_eq!(store.ops(), vec!["list", "move"]);
    }

    #[test]
    fn test_rename_across_directories_moves_before_renaming() {
        let (store, dir) = setup();
        let target = store.add_dir(ROOT_ID, "target");
        let file = store.add_file(ROOT_ID, "a.txt", b"x");
        let target_node = DirectoryNode::new(store.get(target.id).unwrap(), dir.root().clone());
        store.reset_calls();
        dir.rename("a.txt", &target_node, "b.txt").unwrap();
        let moved = store.entry(file.id).unwrap();
        assert_eq!((moved.parent_id, moved.name.as_str()), (target.id, "b.txt"));
        assert_eq!(store.ops(), vec!["list", "move", "rename"]);
    }

    #[test]
    fn test_read_dir_all_hides_stored_diagnostic_names() {
        let (store, dir) = setup();
        store.add_file(ROOT_ID, ".account", b"uploaded by hand");
        store.add_file(ROOT_ID, "a.txt", b"x");
        let names: Vec<String> = dir.read_dir_all().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_lookup_in_remotely_deleted_directory_is_not_found() {
        let (store, dir) = setup();
        let gone = store.add_dir(ROOT_ID, "gone");
        let gone_node = DirectoryNode::new(store.get(gone.id).unwrap(), dir.root().clone());
        store.delete(gone.id).unwrap();

        let err = gone_node.lookup("anything").unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
        assert_eq!(err.to_errno(), libc::ENOENT);
        assert!(matches!(gone_node.read_dir_all(), Err(FsError::NotFound { .. })));
    }

    #[test]
    fn test_remove_of_object_deleted_meanwhile_is_not_found() {
        let (store, dir) = setup();
        let gone = store.add_dir(ROOT_ID, "gone");
        let gone_node = DirectoryNode::new(store.get(gone.id).unwrap(), dir.root().clone());
        store.delete(gone.id).unwrap();
        assert!(matches!(gone_node.remove("child"), Err(FsError::NotFound { .. })));
    }

    #[test]
    fn test_rename_missing_source() {
        let (_store, dir) = setup();
        assert!(matches!(
            dir.rename("ghost", &dir, "other"),
            Err(FsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_symlink_not_supported() {
        let (store, dir) = setup();
        assert!(matches!(
            dir.symlink("link", Path::new("/tmp")),
            Err(FsError::NotSupported { .. })
        ));
        assert_eq!(store.calls().total(), 0);
    }
}
