//! Sectioned, append-only CMake script buffer.

use std::collections::HashSet;

/// Regions of the generated script, rendered in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// One-time setup: toolchains, downloads, nested projects.
    Declare,
    /// Making declared dependencies available.
    MakeAvailable,
    /// Per-target rules.
    Rules,
}

impl Section {
    const ALL: [Section; 3] = [Section::Declare, Section::MakeAvailable, Section::Rules];

    fn index(self) -> usize {
        self as usize
    }
}

/// Accumulates generated CMake text.
///
/// Text marked unique is emitted at most once per builder, whichever section
/// it was first added to.
#[derive(Debug, Default)]
pub struct CMakeBuilder {
    sections: [String; 3],
    unique: HashSet<String>,
}

impl CMakeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` to `section`.
    pub fn addtext(&mut self, text: &str, section: Section, unique: bool) {
        if unique && !self.unique.insert(text.to_string()) {
            return;
        }
        self.sections[section.index()].push_str(text);
    }

    /// Text accumulated so far in one section.
    pub fn section(&self, section: Section) -> &str {
        &self.sections[section.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(String::is_empty)
    }

    /// The complete script.
    pub fn render(&self) -> String {
        Section::ALL
            .iter()
            .map(|s| self.section(*s))
            .collect::<Vec<_>>()
            .concat()
    }
}
