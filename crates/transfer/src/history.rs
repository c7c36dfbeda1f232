use std::sync::{Arc, RwLock};

use bledrop_protocol::{FileHandle, TAG_LEN};
use chrono::{DateTime, Utc};

use crate::integrity::IntegrityTag;

/// A transfer that was persisted and verified.
#[derive(Debug, Clone)]
pub struct CompletedFile {
    pub handle: FileHandle,
    /// Full reassembled content, trailer included.
    pub content: Arc<[u8]>,
    pub tag: IntegrityTag,
    pub completed_at: DateTime<Utc>,
}

impl CompletedFile {
    /// Content without the trailing hex digest.
    pub fn body(&self) -> &[u8] {
        &self.content[..self.content.len().saturating_sub(TAG_LEN)]
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Append-only list of completed transfers, shareable with readers.
#[derive(Debug, Clone, Default)]
pub struct CompletedFiles {
    inner: Arc<RwLock<Vec<CompletedFile>>>,
}

impl CompletedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, file: CompletedFile) {
        self.inner.write().unwrap().push(file);
    }

    /// Returns a copy of the list in completion order.
    pub fn snapshot(&self) -> Vec<CompletedFile> {
        self.inner.read().unwrap().clone()
    }

    /// Most recently completed transfer.
    pub fn latest(&self) -> Option<CompletedFile> {
        self.inner.read().unwrap().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DigestScope;
    use crate::integrity::{IntegrityVerifier, seal_body};

    fn completed(name: &str, body: &[u8]) -> CompletedFile {
        let content = seal_body(body);
        let tag = IntegrityVerifier::new(DigestScope::Body)
            .verify(&content)
            .unwrap();
        CompletedFile {
            handle: FileHandle::new(name),
            content: content.into(),
            tag,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn body_strips_trailer() {
        let file = completed("a", b"payload");
        assert_eq!(file.body(), b"payload");
        assert_eq!(file.size(), 7 + TAG_LEN);
    }

    #[test]
    fn snapshot_preserves_order() {
        let files = CompletedFiles::new();
        assert!(files.is_empty());
        files.push(completed("a", b"1"));
        files.push(completed("b", b"2"));

        let names: Vec<String> = files
            .snapshot()
            .iter()
            .map(|f| f.handle.to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(files.latest().unwrap().handle.as_str(), "b");
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let files = CompletedFiles::new();
        files.push(completed("a", b"1"));
        let snap = files.snapshot();
        files.push(completed("b", b"2"));
        assert_eq!(snap.len(), 1);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn clones_share_the_list() {
        let files = CompletedFiles::new();
        let reader = files.clone();
        files.push(completed("a", b"1"));
        assert_eq!(reader.len(), 1);
    }
}
