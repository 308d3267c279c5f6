//! Documentation: an ordered collection of sections consumed by the generators.

use serde::{Deserialize, Serialize};
use theo_core::{ProofPolicy, TheoError};
use theo_graph::SymbolTable;
use theo_proof::ProofReport;
use tracing::{debug, error};

use crate::section::{Section, SectionBuilder};
use crate::view::SectionView;

/// A section that could not be assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionFailure {
    /// Name of the requested section.
    pub name: String,
    /// Why assembly failed.
    pub error: TheoError,
}

/// Named, ordered sections.
///
/// Failed sections are recorded next to the successful ones so a single
/// broken section never hides the rest of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Documentation {
    name: String,
    sections: Vec<Section>,
    failures: Vec<SectionFailure>,
}

impl Documentation {
    /// Creates an empty documentation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Creates a documentation from already assembled sections.
    pub fn with_sections(name: impl Into<String>, sections: impl IntoIterator<Item = Section>) -> Self {
        let mut documentation = Self::new(name);
        documentation.sections.extend(sections);
        documentation
    }

    /// Appends a section.
    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Appends the outcome of a section construction.
    ///
    /// Returns whether the section was added.
    pub fn push_result(&mut self, name: impl Into<String>, result: Result<Section, TheoError>) -> bool {
        match result {
            Ok(section) => {
                self.sections.push(section);
                true
            }
            Err(err) => {
                let name = name.into();
                error!(section = %name, error = %err, "section could not be built");
                self.failures.push(SectionFailure { name, error: err });
                false
            }
        }
    }

    /// Builds a section and appends it, recording a failure instead of returning it.
    pub fn build_section(&mut self, table: &SymbolTable, builder: SectionBuilder) -> bool {
        let name = builder.name().to_string();
        let result = builder.build(table);
        self.push_result(name, result)
    }

    /// Documentation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sections in insertion order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Mutable access for adding theorems after assembly.
    pub fn sections_mut(&mut self) -> &mut [Section] {
        &mut self.sections
    }

    /// First section with the given name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name() == name)
    }

    /// Sections that failed to assemble.
    pub fn failures(&self) -> &[SectionFailure] {
        &self.failures
    }

    /// Whether every requested section was assembled.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Verifies the theorems of every section that declares some.
    pub fn verify_theorems(
        &mut self,
        table: &SymbolTable,
        policy: &ProofPolicy,
    ) -> Result<Vec<ProofReport>, TheoError> {
        let mut reports = Vec::new();
        for section in &mut self.sections {
            if section.theorems().is_empty() {
                continue;
            }
            reports.push(section.verify_theorems(table, policy)?.clone());
        }
        debug!(documentation = %self.name, reports = reports.len(), "verified documentation");
        Ok(reports)
    }

    /// Generator facing views of every section, in order.
    pub fn views(&self, table: &SymbolTable) -> Result<Vec<SectionView>, TheoError> {
        self.sections
            .iter()
            .map(|section| SectionView::new(table, section))
            .collect()
    }
}
