use crate::{Context, LinkerError, Sym};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Deferred effect executed when the symbol it was registered under is
/// resolved. Receives the context the link runs against.
pub(crate) type LinkAction = Box<dyn FnOnce(&Context) -> Result<(), LinkerError>>;

/// A deferred resolution: the symbol it resolves, the symbols that must be
/// resolved first, and the effect to run.
pub(crate) struct Resolver {
    sym: Sym,
    dependencies: Vec<Sym>,
    action: LinkAction,
}

impl Resolver {
    pub(crate) fn new(sym: Sym, dependencies: Vec<Sym>, action: LinkAction) -> Resolver {
        Resolver {
            sym,
            dependencies,
            action,
        }
    }

    pub(crate) fn run(self, context: &Context) -> Result<(), LinkerError> {
        (self.action)(context)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Registry of deferred resolutions and the dependencies between them.
///
/// Holds at most one [`Resolver`] per symbol; re-registration overwrites.
/// Iteration order is insertion order, which makes the emitted resolution
/// order and the cycle diagnostics deterministic.
pub(crate) struct ResolutionDag {
    resolutions: IndexMap<Sym, Resolver>,
}

impl ResolutionDag {
    pub(crate) fn new() -> ResolutionDag {
        ResolutionDag {
            resolutions: IndexMap::new(),
        }
    }

    /// Registers `resolver` to run once all of its dependencies have run.
    pub(crate) fn resolve_later(&mut self, resolver: Resolver) {
        self.resolutions.insert(resolver.sym.clone(), resolver);
    }

    /// Drops all registered resolutions.
    pub(crate) fn clear(&mut self) {
        self.resolutions.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.resolutions.len()
    }

    /// Removes and returns the resolver registered under `sym`.
    ///
    /// Only called with symbols from a previously computed order, so the
    /// insertion order of the remaining entries no longer matters.
    pub(crate) fn take(&mut self, sym: &Sym) -> Option<Resolver> {
        self.resolutions.swap_remove(sym)
    }

    /// Orders the registered symbols so that for every resolver, each of its
    /// dependencies that has a resolver of its own appears earlier.
    ///
    /// Depth-first traversal with tri-state marks, driven by an explicit
    /// work stack so that arbitrarily deep import chains cannot exhaust the
    /// call stack. Roots are visited in insertion order. Dependencies
    /// without a registered resolver are skipped: the graph only models the
    /// resolutions of the current link round, and eagerly-resolved symbols
    /// appear as dangling dependency targets.
    pub(crate) fn toposort(&self) -> Result<Vec<Sym>, LinkerError> {
        let mut marks: HashMap<Sym, Mark> = HashMap::new();
        let mut order: Vec<Sym> = Vec::with_capacity(self.resolutions.len());

        for root in self.resolutions.keys() {
            if marks.contains_key(root) {
                continue;
            }
            // Work stack of (symbol, index of the next dependency to visit).
            let mut stack: Vec<(Sym, usize)> = vec![(root.clone(), 0)];
            marks.insert(root.clone(), Mark::OnStack);

            while !stack.is_empty() {
                let top = stack.len() - 1;
                let sym = stack[top].0.clone();
                let dep_index = stack[top].1;
                let resolver = self
                    .resolutions
                    .get(&sym)
                    .expect("the traversal only visits registered symbols");

                if dep_index < resolver.dependencies.len() {
                    stack[top].1 += 1;
                    let dep = &resolver.dependencies[dep_index];
                    if !self.resolutions.contains_key(dep) {
                        continue;
                    }
                    match marks.get(dep) {
                        Some(Mark::Done) => {}
                        Some(Mark::OnStack) => return Err(cycle_error(&stack, dep)),
                        None => {
                            marks.insert(dep.clone(), Mark::OnStack);
                            stack.push((dep.clone(), 0));
                        }
                    }
                } else {
                    marks.insert(sym.clone(), Mark::Done);
                    order.push(sym);
                    stack.pop();
                }
            }
        }

        Ok(order)
    }
}

/// Renders the cycle closed by revisiting `dep`: the portion of the work
/// stack from `dep` onward, then `dep` again, so the chain starts and ends
/// at the same symbol.
fn cycle_error(stack: &[(Sym, usize)], dep: &Sym) -> LinkerError {
    let start = stack
        .iter()
        .position(|(sym, _)| sym == dep)
        .unwrap_or_default();
    let mut chain: Vec<String> = stack[start..].iter().map(|(sym, _)| sym.to_string()).collect();
    chain.push(dep.to_string());
    LinkerError::new(format!(
        "Detected a cycle in the import dependencies: {}.",
        chain.join(" -> ")
    ))
}

#[cfg(test)]
mod tests {
    use super::{ResolutionDag, Resolver};
    use crate::Sym;

    fn sym(name: &str) -> Sym {
        Sym::ExportFunction {
            module: "test".into(),
            name: name.into(),
        }
    }

    fn resolver(name: &str, deps: &[&str]) -> Resolver {
        Resolver::new(
            sym(name),
            deps.iter().map(|dep| sym(dep)).collect(),
            Box::new(|_| Ok(())),
        )
    }

    #[test]
    fn dependencies_precede_dependents() {
        let mut dag = ResolutionDag::new();
        dag.resolve_later(resolver("c", &["b"]));
        dag.resolve_later(resolver("b", &["a"]));
        dag.resolve_later(resolver("a", &[]));

        let order = dag.toposort().unwrap();
        for resolved in [("b", "a"), ("c", "b")] {
            let dependent = order.iter().position(|s| *s == sym(resolved.0)).unwrap();
            let dependency = order.iter().position(|s| *s == sym(resolved.1)).unwrap();
            assert!(dependency < dependent);
        }
    }

    #[test]
    fn order_is_deterministic() {
        let build = || {
            let mut dag = ResolutionDag::new();
            dag.resolve_later(resolver("x", &["shared"]));
            dag.resolve_later(resolver("y", &["shared"]));
            dag.resolve_later(resolver("shared", &[]));
            dag.toposort().unwrap()
        };
        assert_eq!(build(), build());
        assert_eq!(build(), vec![sym("shared"), sym("x"), sym("y")]);
    }

    #[test]
    fn reregistration_overwrites() {
        let mut dag = ResolutionDag::new();
        dag.resolve_later(resolver("a", &["b"]));
        dag.resolve_later(resolver("a", &[]));
        assert_eq!(dag.len(), 1);
        assert_eq!(dag.toposort().unwrap(), vec![sym("a")]);
    }

    #[test]
    fn dangling_dependencies_are_ignored() {
        let mut dag = ResolutionDag::new();
        dag.resolve_later(resolver("a", &["nowhere"]));
        assert_eq!(dag.toposort().unwrap(), vec![sym("a")]);
    }

    #[test]
    fn cycle_is_detected_and_trimmed() {
        let mut dag = ResolutionDag::new();
        dag.resolve_later(resolver("entry", &["a"]));
        dag.resolve_later(resolver("a", &["b"]));
        dag.resolve_later(resolver("b", &["a"]));

        let err = dag.toposort().unwrap_err();
        let rendered_a = sym("a").to_string();
        let rendered_b = sym("b").to_string();
        assert_eq!(
            err.message(),
            format!(
                "Detected a cycle in the import dependencies: {} -> {} -> {}.",
                rendered_a, rendered_b, rendered_a
            )
        );
    }

    #[test]
    fn self_cycle() {
        let mut dag = ResolutionDag::new();
        dag.resolve_later(resolver("a", &["a"]));
        let err = dag.toposort().unwrap_err();
        let rendered = sym("a").to_string();
        assert_eq!(
            err.message(),
            format!(
                "Detected a cycle in the import dependencies: {} -> {}.",
                rendered, rendered
            )
        );
    }

    #[test]
    fn clear_drops_everything() {
        let mut dag = ResolutionDag::new();
        dag.resolve_later(resolver("a", &[]));
        dag.clear();
        assert_eq!(dag.len(), 0);
        assert!(dag.toposort().unwrap().is_empty());
    }
}
