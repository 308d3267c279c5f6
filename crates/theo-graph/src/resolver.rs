//! Dependency resolution: turns a target symbol into an ordered list of statements.
//!
//! The walk is depth first over free symbols in discovery order and keeps
//! its own frame stack, so chain length is not bounded by the thread stack. Symbols are
//! emitted in post order, so every statement follows the statements it uses,
//! and memoised, so shared dependencies appear once.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use theo_core::{ErrorInfo, TheoError};
use theo_expr::{Environment, SymbolId};
use tracing::debug;

use crate::table::SymbolTable;

/// Outcome of resolving one or more targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Computed symbols, each after everything it depends on.
    pub order: Vec<SymbolId>,
    /// Symbols treated as inputs because the caller declared them as arguments.
    pub arguments: Vec<SymbolId>,
    /// Leaves carrying a numeric value.
    pub constants: Vec<SymbolId>,
    /// Leaves with neither value nor expression.
    pub leaves: Vec<SymbolId>,
}

impl Resolution {
    /// Whether the symbol is emitted as a statement.
    pub fn computes(&self, id: SymbolId) -> bool {
        self.order.contains(&id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Read-only resolver over a symbol table.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'t> {
    table: &'t SymbolTable,
}

struct Frame {
    id: SymbolId,
    children: Vec<SymbolId>,
    next: usize,
}

struct Walk<'t, 'a> {
    table: &'t SymbolTable,
    frozen: &'a [SymbolId],
    states: HashMap<SymbolId, VisitState>,
    stack: Vec<SymbolId>,
    order: IndexSet<SymbolId>,
    arguments: IndexSet<SymbolId>,
    constants: IndexSet<SymbolId>,
    leaves: IndexSet<SymbolId>,
}

impl<'t> DependencyResolver<'t> {
    /// Creates a resolver borrowing the table.
    pub fn new(table: &'t SymbolTable) -> Self {
        Self { table }
    }

    /// Resolves a target without arguments.
    pub fn resolve(&self, target: SymbolId) -> Result<Resolution, TheoError> {
        self.resolve_all(&[target], &[])
    }

    /// Resolves a target, treating `arguments` as inputs that are never walked.
    pub fn resolve_with_arguments(
        &self,
        target: SymbolId,
        arguments: &[SymbolId],
    ) -> Result<Resolution, TheoError> {
        self.resolve_all(&[target], arguments)
    }

    /// Resolves several targets in order, sharing memoisation so the merged
    /// result lists every symbol once, in first-seen order.
    pub fn resolve_all(
        &self,
        targets: &[SymbolId],
        arguments: &[SymbolId],
    ) -> Result<Resolution, TheoError> {
        for id in arguments {
            self.table.get(*id)?;
        }
        let mut walk = Walk {
            table: self.table,
            frozen: arguments,
            states: HashMap::new(),
            stack: Vec::new(),
            order: IndexSet::new(),
            arguments: IndexSet::new(),
            constants: IndexSet::new(),
            leaves: IndexSet::new(),
        };
        for target in targets {
            walk.visit(*target)?;
        }
        let resolution = Resolution {
            order: walk.order.into_iter().collect(),
            arguments: walk.arguments.into_iter().collect(),
            constants: walk.constants.into_iter().collect(),
            leaves: walk.leaves.into_iter().collect(),
        };
        debug!(
            targets = targets.len(),
            statements = resolution.order.len(),
            arguments = resolution.arguments.len(),
            leaves = resolution.leaves.len(),
            "resolved dependencies"
        );
        Ok(resolution)
    }
}

impl<'t, 'a> Walk<'t, 'a> {
    /// Post-order walk from `root` with an explicit frame stack.
    fn visit(&mut self, root: SymbolId) -> Result<(), TheoError> {
        let mut frames = Vec::new();
        if let Some(frame) = self.enter(root)? {
            frames.push(frame);
        }
        while let Some(frame) = frames.last_mut() {
            if let Some(child) = frame.children.get(frame.next).copied() {
                frame.next += 1;
                if let Some(next) = self.enter(child)? {
                    frames.push(next);
                }
                continue;
            }
            let id = frame.id;
            frames.pop();
            self.stack.pop();
            self.states.insert(id, VisitState::Visited);
            self.order.insert(id);
        }
        Ok(())
    }

    /// Classifies `id`; returns a frame when its dependencies still need walking.
    fn enter(&mut self, id: SymbolId) -> Result<Option<Frame>, TheoError> {
        if self.frozen.contains(&id) {
            self.arguments.insert(id);
            return Ok(None);
        }
        match self.states.get(&id).copied() {
            Some(VisitState::Visited) => return Ok(None),
            Some(VisitState::Visiting) => return Err(self.cycle(id)),
            None => {}
        }
        let node = self.table.get(id)?;
        if node.is_leaf() {
            self.states.insert(id, VisitState::Visited);
            if node.value().is_some() {
                self.constants.insert(id);
            } else {
                self.leaves.insert(id);
            }
            return Ok(None);
        }
        self.states.insert(id, VisitState::Visiting);
        self.stack.push(id);
        let children = node
            .expression()
            .map(|expression| expression.free_symbols())
            .unwrap_or_default();
        Ok(Some(Frame {
            id,
            children,
            next: 0,
        }))
    }

    fn cycle(&self, id: SymbolId) -> TheoError {
        let start = self.stack.iter().position(|entry| *entry == id).unwrap_or(0);
        let chain: Vec<String> = self.stack[start..]
            .iter()
            .chain(std::iter::once(&id))
            .map(|entry| self.table.name_of(*entry))
            .collect();
        TheoError::CycleDetected(
            ErrorInfo::new("dependency-cycle", "symbol depends on itself")
                .with_context("symbol", self.table.name_of(id))
                .with_context("chain", chain.join(" -> "))
                .with_hint("declare one of the symbols in the chain as a section argument"),
        )
    }
}

/// Evaluates every statement of a resolution.
///
/// `inputs` must bind every argument and leaf; constants use their declared
/// value unless overridden by `inputs`. External statements cannot be
/// evaluated here and produce an error.
pub fn evaluate_resolution(
    table: &SymbolTable,
    resolution: &Resolution,
    inputs: &Environment,
) -> Result<Environment, TheoError> {
    let mut env: BTreeMap<SymbolId, f64> = inputs.clone();
    for id in &resolution.constants {
        if let Some(value) = table.get(*id)?.value() {
            env.entry(*id).or_insert(value);
        }
    }
    for id in &resolution.order {
        let node = table.get(*id)?;
        let Some(expression) = node.expression() else {
            return Err(TheoError::Expression(
                ErrorInfo::new("external-symbol", "external symbols have no expression")
                    .with_context("symbol", node.name()),
            ));
        };
        let value = expression
            .evaluate(&env)
            .map_err(|err| err.with_context("statement", node.name()))?;
        env.insert(*id, value);
    }
    Ok(env)
}
