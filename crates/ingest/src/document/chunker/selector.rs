//! Backend availability and selection.
//!
//! Availability is probed once per process and is read-only afterwards. The
//! selector is built from a probe result and passed around explicitly, so
//! tests can hand it any capability set.

use chatvid_core::BackendPreference;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::backend::BackendKind;

/// Availability and rank of one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCapability {
    pub kind: BackendKind,
    pub available: bool,
    pub rank: u8,
}

/// Capability records for every backend, highest rank first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCapabilities {
    entries: Vec<BackendCapability>,
}

static PROCESS_CAPABILITIES: OnceCell<BackendCapabilities> = OnceCell::new();

impl BackendCapabilities {
    /// Availability from compiled features, minus the `disabled` backends.
    /// The pattern backend cannot be disabled.
    pub fn probe(disabled: &[BackendPreference]) -> Self {
        let entries = BackendKind::BY_PRIORITY
            .iter()
            .map(|&kind| {
                let switched_off = kind != BackendKind::Pattern
                    && disabled
                        .iter()
                        .any(|&pref| BackendKind::from_preference(pref) == Some(kind));
                BackendCapability {
                    kind,
                    available: kind.is_compiled() && !switched_off,
                    rank: kind.rank(),
                }
            })
            .collect();
        Self { entries }
    }

    /// The process-wide probe. Computed on first call; later calls return the
    /// same record regardless of `disabled`.
    pub fn process(disabled: &[BackendPreference]) -> &'static Self {
        PROCESS_CAPABILITIES.get_or_init(|| {
            let caps = Self::probe(disabled);
            tracing::info!(
                available = ?caps.available_kinds(),
                "sentence backend availability probed"
            );
            caps
        })
    }

    /// Every backend marked available, whatever this build includes.
    pub fn all_available() -> Self {
        Self {
            entries: BackendKind::BY_PRIORITY
                .iter()
                .map(|&kind| BackendCapability {
                    kind,
                    available: true,
                    rank: kind.rank(),
                })
                .collect(),
        }
    }

    /// Mark `kind` unavailable. Ignored for the pattern backend.
    pub fn without(mut self, kind: BackendKind) -> Self {
        if kind != BackendKind::Pattern {
            for entry in self.entries.iter_mut().filter(|e| e.kind == kind) {
                entry.available = false;
            }
        }
        self
    }

    pub fn is_available(&self, kind: BackendKind) -> bool {
        kind == BackendKind::Pattern
            || self.entries.iter().any(|e| e.kind == kind && e.available)
    }

    pub fn entries(&self) -> &[BackendCapability] {
        &self.entries
    }

    /// Available kinds, highest rank first.
    pub fn available_kinds(&self) -> Vec<BackendKind> {
        self.entries
            .iter()
            .filter(|e| e.available)
            .map(|e| e.kind)
            .collect()
    }
}

/// Resolves a configured preference to the backends to try, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSelector {
    capabilities: BackendCapabilities,
}

impl BackendSelector {
    pub fn new(capabilities: BackendCapabilities) -> Self {
        Self { capabilities }
    }

    /// Selector over the process-wide probe.
    pub fn from_process(disabled: &[BackendPreference]) -> Self {
        Self::new(BackendCapabilities::process(disabled).clone())
    }

    pub fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    /// The backend that will run first for `preference`.
    pub fn resolve(&self, preference: BackendPreference) -> BackendKind {
        self.fallback_chain(preference)
            .first()
            .copied()
            .unwrap_or(BackendKind::Pattern)
    }

    /// Available backends at or below the preferred rank, highest first.
    /// `Auto` starts from the top. Always ends with the pattern backend.
    pub fn fallback_chain(&self, preference: BackendPreference) -> Vec<BackendKind> {
        let ceiling = BackendKind::from_preference(preference)
            .map(BackendKind::rank)
            .unwrap_or(u8::MAX);

        let mut chain: Vec<BackendKind> = self
            .capabilities
            .entries
            .iter()
            .filter(|e| e.available && e.rank <= ceiling && e.kind != BackendKind::Pattern)
            .map(|e| e.kind)
            .collect();
        chain.sort_by_key(|k| std::cmp::Reverse(k.rank()));
        chain.push(BackendKind::Pattern);
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_picks_highest_available() {
        let selector = BackendSelector::new(BackendCapabilities::all_available());
        assert_eq!(selector.resolve(BackendPreference::Auto), BackendKind::Linguistic);

        let selector = BackendSelector::new(
            BackendCapabilities::all_available().without(BackendKind::Linguistic),
        );
        assert_eq!(selector.resolve(BackendPreference::Auto), BackendKind::Statistical);
    }

    #[test]
    fn unavailable_preference_falls_to_next_rank() {
        let caps = BackendCapabilities::all_available().without(BackendKind::Linguistic);
        let selector = BackendSelector::new(caps);
        assert_eq!(
            selector.fallback_chain(BackendPreference::Linguistic),
            vec![BackendKind::Statistical, BackendKind::Pattern]
        );
    }

    #[test]
    fn pattern_is_last_resort() {
        let caps = BackendCapabilities::all_available()
            .without(BackendKind::Linguistic)
            .without(BackendKind::Statistical)
            .without(BackendKind::Pattern);
        let selector = BackendSelector::new(caps);
        assert_eq!(selector.resolve(BackendPreference::Auto), BackendKind::Pattern);
        assert_eq!(
            selector.fallback_chain(BackendPreference::Linguistic),
            vec![BackendKind::Pattern]
        );
        assert!(selector.capabilities().is_available(BackendKind::Pattern));
    }

    #[test]
    fn explicit_preference_never_climbs_the_ladder() {
        let selector = BackendSelector::new(BackendCapabilities::all_available());
        assert_eq!(
            selector.fallback_chain(BackendPreference::Statistical),
            vec![BackendKind::Statistical, BackendKind::Pattern]
        );
        assert_eq!(
            selector.fallback_chain(BackendPreference::Pattern),
            vec![BackendKind::Pattern]
        );
    }

    #[test]
    fn probe_respects_disabled_list() {
        let caps = BackendCapabilities::probe(&[
            BackendPreference::Statistical,
            BackendPreference::Pattern,
        ]);
        assert!(!caps.is_available(BackendKind::Statistical));
        assert!(caps.is_available(BackendKind::Pattern));
        assert_eq!(
            caps.is_available(BackendKind::Linguistic),
            BackendKind::Linguistic.is_compiled()
        );
    }

    #[test]
    fn process_probe_is_cached() {
        let first = BackendCapabilities::process(&[]);
        let second = BackendCapabilities::process(&[BackendPreference::Linguistic]);
        assert!(std::ptr::eq(first, second));
    }
}
