//! Sync preferences.
//!
//! The coordinator reads two boolean keys through the [`Preferences`] trait,
//! both defaulting to `true` when unset.

use serde::{Deserialize, Serialize};

/// Whether triggered (non-manual) syncs may run at all.
pub const AUTO_SYNC: &str = "auto_sync";
/// Whether triggered syncs may run over a mobile connection.
pub const AUTO_SYNC_MOBILE: &str = "auto_sync_mobile";

/// Default for [`AUTO_SYNC`].
pub const AUTO_SYNC_DEFAULT: bool = true;
/// Default for [`AUTO_SYNC_MOBILE`].
pub const AUTO_SYNC_MOBILE_DEFAULT: bool = true;

/// Read access to a boolean preference store.
pub trait Preferences: Send + Sync {
    /// Value of `key`, or `default` when the key is unset.
    fn get_bool(&self, key: &str, default: bool) -> bool;
}

/// Fixed sync preferences, as loaded from a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPreferences {
    /// See [`AUTO_SYNC`].
    pub auto_sync: bool,
    /// See [`AUTO_SYNC_MOBILE`].
    pub auto_sync_mobile: bool,
}

impl Default for SyncPreferences {
    fn default() -> Self {
        Self {
            auto_sync: AUTO_SYNC_DEFAULT,
            auto_sync_mobile: AUTO_SYNC_MOBILE_DEFAULT,
        }
    }
}

impl Preferences for SyncPreferences {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match key {
            AUTO_SYNC => self.auto_sync,
            AUTO_SYNC_MOBILE => self.auto_sync_mobile,
            _ => default,
        }
    }
}
