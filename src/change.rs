//! Decides whether a generated file needs to be rewritten

use crate::normalize::{default_normalizer, ContentNormalizer};

/// Compares remote generated content with what is on disk
#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector<'a> {
    normalizer: &'a ContentNormalizer,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(normalizer: &'a ContentNormalizer) -> Self {
        Self { normalizer }
    }

    /// `local` is the empty string when the file does not exist yet.
    pub fn differs(&self, remote: &str, local: &str) -> bool {
        if remote.trim() == local.trim() {
            return false;
        }

        self.normalizer.normalize(remote) != self.normalizer.normalize(local)
    }
}

impl Default for ChangeDetector<'static> {
    fn default() -> Self {
        Self::new(default_normalizer())
    }
}

/// [`ChangeDetector::differs`] with the built-in normalization rules
pub fn differs(remote: &str, local: &str) -> bool {
    ChangeDetector::default().differs(remote, local)
}
