//! `nixio` global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the nixio crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Validate Write Size
///  > default: [`true`]
///
/// If enabled, writing to an array checks that the number of bytes supplied matches the number of elements of the resolved region.
/// If disabled, a mismatch surfaces as whatever error the store raises, or is silently truncated.
///
/// ## Virtual Concurrent Reads
///  > default: [`true`]
///
/// If enabled, reading a virtual array fetches the regions of its mapped source arrays concurrently.
/// The fetched regions are always applied to the output in mapping order.
#[derive(Debug)]
pub struct Config {
    validate_write_size: bool,
    virtual_concurrent_reads: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Config {
            validate_write_size: true,
            virtual_concurrent_reads: true,
        }
    }
}

impl Config {
    /// Get the [validate write size](#validate-write-size) configuration.
    #[must_use]
    pub fn validate_write_size(&self) -> bool {
        self.validate_write_size
    }

    /// Set the [validate write size](#validate-write-size) configuration.
    pub fn set_validate_write_size(&mut self, validate_write_size: bool) {
        self.validate_write_size = validate_write_size;
    }

    /// Get the [virtual concurrent reads](#virtual-concurrent-reads) configuration.
    #[must_use]
    pub fn virtual_concurrent_reads(&self) -> bool {
        self.virtual_concurrent_reads
    }

    /// Set the [virtual concurrent reads](#virtual-concurrent-reads) configuration.
    pub fn set_virtual_concurrent_reads(&mut self, virtual_concurrent_reads: bool) {
        self.virtual_concurrent_reads = virtual_concurrent_reads;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global nixio configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global nixio configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_virtual_concurrent_reads() {
        assert!(global_config().virtual_concurrent_reads());
        global_config_mut().set_virtual_concurrent_reads(false);
        assert!(!global_config().virtual_concurrent_reads());
        global_config_mut().set_virtual_concurrent_reads(true);
    }
}
