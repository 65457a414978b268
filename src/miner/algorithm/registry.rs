// src/miner/algorithm/registry.rs
//! Algorithm registry
//!
//! A process-wide, read-only table built on first use. Lookups are
//! case-insensitive; listing preserves registration order.

use super::axiom::Axiom;
use super::groestl::{Groestl, MyrGroestl};
use super::keccak::Keccak;
use super::scrypt::{Scrypt, ScryptN};
use super::sha256d::Sha256d;
use super::skein::Skein;
use super::{Algorithm, Descriptor};
use crate::utils::error::MinerError;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    static ref BUILTIN: Registry = Registry::builtin();
}

/// Name-keyed collection of algorithms
#[derive(Default)]
pub struct Registry {
    algorithms: Vec<Arc<dyn Algorithm>>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn builtin() -> Self {
        let mut registry = Registry::new();
        let algorithms: Vec<Arc<dyn Algorithm>> = vec![
            Arc::new(Scrypt),
            Arc::new(ScryptN),
            Arc::new(Sha256d),
            Arc::new(Keccak),
            Arc::new(Skein),
            Arc::new(Groestl),
            Arc::new(MyrGroestl::new()),
            Arc::new(MyrGroestl::sha256d_merkle()),
            Arc::new(Axiom),
        ];
        for algorithm in algorithms {
            if let Err(e) = registry.register(algorithm) {
                log::error!("Skipping built-in algorithm: {}", e);
            }
        }
        registry
    }

    /// Adds an algorithm under its descriptor name
    ///
    /// Names must be lowercase and unique.
    pub fn register(&mut self, algorithm: Arc<dyn Algorithm>) -> Result<(), MinerError> {
        let name = algorithm.name();
        if name.is_empty() || name.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(MinerError::ConfigError(format!(
                "Algorithm name must be non-empty lowercase: {:?}",
                name
            )));
        }
        if self.index.contains_key(name) {
            return Err(MinerError::ConfigError(format!(
                "Algorithm {} registered twice",
                name
            )));
        }
        self.index.insert(name, self.algorithms.len());
        self.algorithms.push(algorithm);
        Ok(())
    }

    /// Finds an algorithm by name, ignoring ASCII case
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Algorithm>, MinerError> {
        let key = name.trim().to_ascii_lowercase();
        self.index
            .get(key.as_str())
            .map(|&i| self.algorithms[i].clone())
            .ok_or_else(|| MinerError::UnknownAlgorithm {
                name: name.to_string(),
            })
    }

    /// Algorithms in registration order
    pub fn algorithms(&self) -> &[Arc<dyn Algorithm>] {
        &self.algorithms
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.algorithms.iter().map(|a| a.descriptor())
    }
}

/// Looks up a built-in algorithm by name, ignoring ASCII case
pub fn lookup(name: &str) -> Result<Arc<dyn Algorithm>, MinerError> {
    BUILTIN.lookup(name)
}

/// Every built-in algorithm in registration order
pub fn list() -> &'static [Arc<dyn Algorithm>] {
    BUILTIN.algorithms()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_in_order() {
        let names: Vec<_> = list().iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            [
                "scrypt",
                "scrypt-n",
                "sha256d",
                "keccak",
                "skein",
                "groestl",
                "myr-groestl",
                "myr-groestl2",
                "axiom"
            ]
        );
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(lookup("SHA256D").unwrap().name(), "sha256d");
        assert_eq!(lookup("Myr-Groestl2").unwrap().name(), "myr-groestl2");
    }

    #[test]
    fn unknown_name_is_reported() {
        match lookup("x11") {
            Err(MinerError::UnknownAlgorithm { name }) => assert_eq!(name, "x11"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("x11 should not be registered"),
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = Registry::new();
        registry.register(Arc::new(Sha256d)).unwrap();
        assert!(registry.register(Arc::new(Sha256d)).is_err());
        assert_eq!(registry.algorithms().len(), 1);
    }

    #[test]
    fn every_builtin_has_merkle_digests() {
        for descriptor in BUILTIN.descriptors() {
            assert!(descriptor.primary_digest.is_some(), "{}", descriptor.name);
            assert!(descriptor.secondary_digest.is_some(), "{}", descriptor.name);
        }
    }
}
