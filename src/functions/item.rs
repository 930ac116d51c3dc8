use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::functions::action::Action;

/// Marks the accelerator character in a menu label, e.g. `Say _Hello`.
const ACCELERATOR_MARKER: char = '_';

/// One user-invocable function exposed through menu, hotkey and REST.
pub struct FunctionItem {
    label: String,
    enabled: AtomicBool,
    hidden: AtomicBool,
    action: Arc<dyn Action>,
}

impl FunctionItem {
    pub fn new(label: impl Into<String>, action: impl Action + 'static) -> Self {
        Self {
            label: label.into(),
            enabled: AtomicBool::new(true),
            hidden: AtomicBool::new(false),
            action: Arc::new(action),
        }
    }

    pub fn hidden(self, hidden: bool) -> Self {
        self.hidden.store(hidden, Ordering::SeqCst);
        self
    }

    pub fn enabled(self, enabled: bool) -> Self {
        self.enabled.store(enabled, Ordering::SeqCst);
        self
    }

    /// Raw label as registered, accelerator marker included.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn display_label(&self) -> String {
        self.label.replacen(ACCELERATOR_MARKER, "", 1)
    }

    /// The character following the accelerator marker, lowercased.
    pub fn mnemonic(&self) -> Option<char> {
        let (_, rest) = self.label.split_once(ACCELERATOR_MARKER)?;
        rest.chars().next().map(|ch| ch.to_ascii_lowercase())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    /// Flips `enabled` atomically and returns the new value.
    pub fn toggle_enabled(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::SeqCst)
    }

    pub(crate) fn action(&self) -> Arc<dyn Action> {
        Arc::clone(&self.action)
    }

    pub fn view(&self, index: usize) -> ItemView {
        ItemView {
            index,
            label: self.display_label(),
            mnemonic: self.mnemonic(),
            enabled: self.is_enabled(),
            hidden: self.is_hidden(),
        }
    }
}

impl fmt::Debug for FunctionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionItem")
            .field("label", &self.label)
            .field("enabled", &self.is_enabled())
            .field("hidden", &self.is_hidden())
            .finish_non_exhaustive()
    }
}

/// Point-in-time copy of an item's display state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub index: usize,
    pub label: String,
    pub mnemonic: Option<char>,
    pub enabled: bool,
    pub hidden: bool,
}
