//! Rule libraries and their lowering into CMake.
//!
//! Bzl libraries become available by loading modules: each module registers
//! the libraries it implements with a [`LibraryRegistry`]. Libraries the
//! workspace ignores resolve to a stand-in whose rules do nothing.

pub mod config;
pub mod errors;
pub mod helpers;
pub mod local_mirror;

use std::collections::BTreeMap;

use crate::core::label::TargetId;
use crate::core::workspace::Workspace;

pub use config::{BazelToCmakeOptions, LocalMirrorRule};
pub use errors::MirrorError;

/// Prefix for module names given relative to this crate (`.bzl_library.x`).
pub const MODULE_ROOT: &str = "bazel_to_cmake";

/// A bzl library this crate knows how to lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BzlLibrary {
    /// `bazel_local_mirror` from `local_mirror.bzl`.
    LocalMirror,
    /// Stand-in for an ignored library; its rules are skipped.
    Ignored,
}

/// Libraries available to the current pass, by label.
#[derive(Debug, Default)]
pub struct LibraryRegistry {
    libraries: BTreeMap<TargetId, BzlLibrary>,
}

impl LibraryRegistry {
    pub fn register(&mut self, target: TargetId, library: BzlLibrary) {
        self.libraries.insert(target, library);
    }

    /// Resolve a `load` of `target`.
    pub fn resolve(&self, workspace: &Workspace, target: &TargetId) -> Option<BzlLibrary> {
        if workspace.is_library_ignored(target) {
            return Some(BzlLibrary::Ignored);
        }
        self.libraries.get(target).copied()
    }
}

/// Registers the libraries provided by one module.
pub type RegisterFn = fn(&mut LibraryRegistry);

/// Modules that can be named with `Workspace::add_module`.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, RegisterFn>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The modules implemented by this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.add(local_mirror::MODULE_NAME, local_mirror::register);
        registry
    }

    /// Add a module under an absolute name.
    pub fn add(&mut self, name: &str, register: RegisterFn) {
        self.modules.insert(name.to_string(), register);
    }

    /// Look up a module. Names starting with `.` are relative to [`MODULE_ROOT`].
    pub fn get(&self, name: &str) -> Option<&RegisterFn> {
        if name.starts_with('.') {
            return self.modules.get(&format!("{MODULE_ROOT}{name}"));
        }
        self.modules.get(name)
    }
}
