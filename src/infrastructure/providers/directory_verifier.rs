use crate::domain::errors::UpstreamError;
use crate::domain::ports::identity_verifier::IdentityVerifier;
use async_trait::async_trait;
use std::collections::HashMap;

/// Identity verifier backed by a static identifier -> subject directory.
/// Identifiers match case-insensitively.
#[derive(Default)]
pub struct DirectoryVerifier {
    entries: HashMap<String, String>,
}

impl DirectoryVerifier {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(identifier, subject)| (normalize(&identifier), subject))
                .collect(),
        }
    }

    pub fn with_entry(mut self, identifier: &str, subject: &str) -> Self {
        self.entries.insert(normalize(identifier), subject.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

#[async_trait]
impl IdentityVerifier for DirectoryVerifier {
    async fn verify(&self, identifier: &str) -> Result<Option<String>, UpstreamError> {
        Ok(self.entries.get(&normalize(identifier)).cloned())
    }
}
