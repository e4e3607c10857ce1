//! Scope-namespaced index names.
//!
//! Every resolved name is `{readable}-{hash}-{logical}` where `readable` is a
//! short sanitised slice of the scope id and `hash` is a SHA-256 prefix of
//! the full scope id. Independent deployments sharing one remote account
//! therefore never collide, and listing remote indexes by prefix yields
//! exactly the indexes a scope owns.
//!
//! When the length budget is tight the logical part is truncated first; the
//! prefix is only cut when the budget is smaller than the prefix itself.

use crate::primitives::{IndexName, ScopeId};
use sha2::{Digest, Sha256};
use std::fmt;

/// Maximum index name length accepted by the remote control API.
pub const MAX_INDEX_NAME_LENGTH: usize = 45;

/// Hex characters of the scope hash kept in the prefix.
pub const SCOPE_HASH_CHARS: usize = 15;

/// Sanitised scope characters kept in the prefix.
pub const SCOPE_READABLE_CHARS: usize = 10;

/// Smallest name budget that keeps the full managed prefix plus one suffix character.
pub const MIN_INDEX_NAME_LENGTH: usize = SCOPE_READABLE_CHARS + SCOPE_HASH_CHARS + 3;

/// Logical name used when neither the spec nor the event provide one.
pub const DEFAULT_LOGICAL_NAME: &str = "index";

/// Prefix shared by every index that belongs to one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedPrefix(Box<str>);

impl ManagedPrefix {
    /// Access the prefix string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when `name` belongs to the owning scope.
    #[must_use]
    pub fn owns(&self, name: &IndexName) -> bool {
        name.as_str().starts_with(self.as_str())
    }

    /// Prefix length in characters (always ASCII).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the prefix is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ManagedPrefix {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Compute the managed prefix for a scope.
#[must_use]
pub fn managed_prefix(scope_id: &ScopeId) -> ManagedPrefix {
    let mut hasher = Sha256::new();
    hasher.update(scope_id.as_str().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let hash = digest.get(..SCOPE_HASH_CHARS).unwrap_or(&digest);

    let readable = sanitize(scope_id.as_str());
    let readable = truncate_slug(&readable, SCOPE_READABLE_CHARS);
    let prefix = if readable.is_empty() {
        format!("{hash}-")
    } else {
        format!("{readable}-{hash}-")
    };
    ManagedPrefix(prefix.into_boxed_str())
}

/// Resolve the remote name for `logical_name` within `scope_id`.
///
/// Deterministic and infallible: the same inputs always yield the same name,
/// and the output is never longer than `max_length` (minimum one character).
#[must_use]
pub fn resolve(scope_id: &ScopeId, logical_name: &str, max_length: usize) -> IndexName {
    resolve_with_prefix(&managed_prefix(scope_id), logical_name, max_length)
}

/// Resolve a name against an already computed prefix.
#[must_use]
pub fn resolve_with_prefix(
    prefix: &ManagedPrefix,
    logical_name: &str,
    max_length: usize,
) -> IndexName {
    let max_length = max_length.max(1);
    if max_length <= prefix.len() {
        return IndexName::from_resolved(prefix.as_str().chars().take(max_length).collect());
    }

    let mut logical = sanitize(logical_name);
    if logical.is_empty() {
        DEFAULT_LOGICAL_NAME.clone_into(&mut logical);
    }
    let suffix = truncate_slug(&logical, max_length - prefix.len());

    let mut name = String::with_capacity(prefix.len() + suffix.len());
    name.push_str(prefix.as_str());
    name.push_str(suffix);
    IndexName::from_resolved(name)
}

/// Lowercase, map anything outside `[a-z0-9]` to `-`, collapse and trim dashes.
fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = true;
    for ch in raw.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn truncate_slug(slug: &str, max_chars: usize) -> &str {
    // `sanitize` output is ASCII, so byte and char offsets agree.
    slug.get(..max_chars).unwrap_or(slug).trim_end_matches('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::PrimitiveError;
    use proptest::prelude::*;

    fn scope(raw: &str) -> Result<ScopeId, PrimitiveError> {
        ScopeId::parse(raw)
    }

    #[test]
    fn resolve_is_deterministic() -> Result<(), PrimitiveError> {
        let scope = scope("pinecone-stack")?;
        let first = resolve(&scope, "docs", MAX_INDEX_NAME_LENGTH);
        let second = resolve(&scope, "docs", MAX_INDEX_NAME_LENGTH);
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn prefix_has_readable_and_hash_parts() -> Result<(), PrimitiveError> {
        let prefix = managed_prefix(&scope("PineconeStack-Prod")?);
        let parts: Vec<&str> = prefix.as_str().split('-').collect();

        assert_eq!(parts.first().copied(), Some("pineconest"));
        assert_eq!(parts.get(1).map(|hash| hash.len()), Some(SCOPE_HASH_CHARS));
        assert!(prefix.as_str().ends_with('-'));
        Ok(())
    }

    #[test]
    fn different_scopes_get_different_prefixes() -> Result<(), PrimitiveError> {
        let first = managed_prefix(&scope("stack-one-long-name-a")?);
        let second = managed_prefix(&scope("stack-one-long-name-b")?);
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn minimum_budget_keeps_the_whole_prefix() -> Result<(), PrimitiveError> {
        let prod = scope("PineconeStack-Prod")?;
        let staging = scope("PineconeStack-Staging")?;
        let prefix = managed_prefix(&prod);
        assert_eq!(prefix.len() + 1, MIN_INDEX_NAME_LENGTH);

        let name = resolve(&prod, "documents", MIN_INDEX_NAME_LENGTH);
        assert!(prefix.owns(&name));
        assert_eq!(name.as_str().len(), MIN_INDEX_NAME_LENGTH);
        assert_ne!(name, resolve(&staging, "documents", MIN_INDEX_NAME_LENGTH));
        Ok(())
    }

    #[test]
    fn unreadable_scope_still_has_hash_prefix() -> Result<(), PrimitiveError> {
        let prefix = managed_prefix(&scope("::::")?);
        assert_eq!(prefix.len(), SCOPE_HASH_CHARS + 1);
        Ok(())
    }

    #[test]
    fn logical_name_is_sanitised() -> Result<(), PrimitiveError> {
        let scope = scope("stack1")?;
        let name = resolve(&scope, "My_Index Name", MAX_INDEX_NAME_LENGTH);
        assert!(name.as_str().ends_with("-my-index-name"));
        Ok(())
    }

    #[test]
    fn empty_logical_name_falls_back_to_default() -> Result<(), PrimitiveError> {
        let scope = scope("stack1")?;
        let name = resolve(&scope, "___", MAX_INDEX_NAME_LENGTH);
        assert!(name.as_str().ends_with(DEFAULT_LOGICAL_NAME));
        Ok(())
    }

    #[test]
    fn tight_budget_cuts_prefix_only_when_unavoidable() -> Result<(), PrimitiveError> {
        let scope = scope("stack1")?;
        let prefix = managed_prefix(&scope);
        let name = resolve(&scope, "docs", 5);
        assert_eq!(Some(name.as_str()), prefix.as_str().get(..5));

        let name = resolve(&scope, "docs", 0);
        assert_eq!(name.as_str().len(), 1);
        Ok(())
    }

    #[test]
    fn prefix_owns_resolved_names() -> Result<(), PrimitiveError> {
        let scope = scope("stack1")?;
        let prefix = managed_prefix(&scope);
        let name = resolve(&scope, "docs", MAX_INDEX_NAME_LENGTH);
        assert!(prefix.owns(&name));
        assert!(!prefix.owns(&IndexName::parse("someone-else")?));
        Ok(())
    }

    proptest! {
        #[test]
        fn resolve_keeps_full_prefix_and_respects_budget(
            raw_scope in "[A-Za-z0-9:/_-]{1,40}",
            logical in "[A-Za-z0-9 _-]{0,80}",
            extra in 0usize..40,
        ) {
            let Ok(scope) = ScopeId::parse(&raw_scope) else { return Ok(()); };
            let prefix = managed_prefix(&scope);
            let max_length = prefix.len() + extra;

            let name = resolve(&scope, &logical, max_length);
            prop_assert!(name.as_str().starts_with(prefix.as_str()));
            prop_assert!(name.as_str().len() <= max_length);
            prop_assert_eq!(name.clone(), resolve(&scope, &logical, max_length));
        }

        #[test]
        fn resolve_output_uses_remote_alphabet(
            raw_scope in "\\PC{1,30}",
            logical in "\\PC{0,30}",
        ) {
            let Ok(scope) = ScopeId::parse(&raw_scope) else { return Ok(()); };
            let name = resolve(&scope, &logical, MAX_INDEX_NAME_LENGTH);
            prop_assert!(name
                .as_str()
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-'));
        }
    }
}
