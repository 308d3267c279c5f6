use std::collections::BTreeMap;

use proptest::prelude::*;
use theo_expr::{Expr, SymbolId};
use theo_graph::{DependencyResolver, SymbolSpec, SymbolTable};

/// Builds a table where symbol `i` may only reference symbols declared before it.
fn build(edges: &[Vec<usize>]) -> SymbolTable {
    let mut table = SymbolTable::new();
    for (idx, deps) in edges.iter().enumerate() {
        let mut spec = SymbolSpec::new(format!("s{idx}"));
        let refs: Vec<Expr> = deps
            .iter()
            .filter(|dep| **dep < idx)
            .map(|dep| Expr::symbol(SymbolId::from_raw(*dep as u32)))
            .collect();
        if !refs.is_empty() {
            spec = spec.expression(Expr::sum(refs));
        }
        table.declare(spec).unwrap();
    }
    table
}

fn arb_edges() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0usize..12, 0..4), 1..12)
}

proptest! {
    #[test]
    fn order_is_topological_and_unique(edges in arb_edges()) {
        let table = build(&edges);
        let target = SymbolId::from_raw((edges.len() - 1) as u32);
        let resolution = DependencyResolver::new(&table).resolve(target).unwrap();

        let position: BTreeMap<SymbolId, usize> = resolution
            .order
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos))
            .collect();
        prop_assert_eq!(position.len(), resolution.order.len());
        for id in &resolution.order {
            let expression = table.get(*id).unwrap().expression().unwrap();
            for dep in expression.free_symbols() {
                if let Some(dep_pos) = position.get(&dep) {
                    prop_assert!(*dep_pos < position[id]);
                } else {
                    prop_assert!(resolution.leaves.contains(&dep));
                }
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(edges in arb_edges()) {
        let table = build(&edges);
        let target = SymbolId::from_raw((edges.len() - 1) as u32);
        let resolver = DependencyResolver::new(&table);
        prop_assert_eq!(resolver.resolve(target).unwrap(), resolver.resolve(target).unwrap());
    }
}
