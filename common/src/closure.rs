//! Transitive dependency closure over provides/requires relations.

use std::collections::{BTreeSet, HashMap};

use crate::package::PackageView;

/// Compute the packages reachable from `seed` through its requirements.
///
/// Every requirement is matched against the `provides` of the packages in
/// `universe`; each matched provider contributes its own requirements until
/// no pass resolves anything new. When several packages provide the same
/// string, the first one in `universe` order is the provider.
///
/// The seed is never part of its own closure unless it is the chosen provider
/// of one of its own requirements. It is located in `universe` by address,
/// falling back to the first equal view for seeds cloned out of it.
/// Requirement cycles terminate because a requirement, once satisfied, is
/// never examined again.
///
/// The result is a set in `universe` order.
///
/// # Examples
///
/// ```
/// use assayer_common::{PackageView, dependency_closure};
///
/// let a = PackageView::source("a.src.tar", "a", "noarch").with_requires(["libx.so"]);
/// let b = PackageView::source("b.src.tar", "b", "noarch")
///     .with_provides(["libx.so"])
///     .with_requires(["liby.so"]);
/// let c = PackageView::source("c.src.tar", "c", "noarch").with_provides(["liby.so"]);
/// let universe = [a.clone(), b, c];
///
/// let names: Vec<&str> = dependency_closure(&a, &universe)
///     .into_iter()
///     .map(PackageView::name)
///     .collect();
/// assert_eq!(names, ["b", "c"]);
/// ```
#[must_use]
pub fn dependency_closure<'a>(
    seed: &PackageView,
    universe: &'a [PackageView],
) -> Vec<&'a PackageView> {
    let mut providers: HashMap<&str, usize> = HashMap::new();
    for (index, package) in universe.iter().enumerate() {
        for capability in package.provides() {
            providers.entry(capability.as_str()).or_insert(index);
        }
    }

    let mut reached = BTreeSet::new();
    let mut satisfied: BTreeSet<String> = BTreeSet::new();
    let mut unsatisfied: BTreeSet<String> = seed.requires().clone();

    loop {
        let mut discovered = BTreeSet::new();
        let mut changed = false;

        for requirement in &unsatisfied {
            let Some(&index) = providers.get(requirement.as_str()) else {
                continue;
            };
            changed = true;
            reached.insert(index);
            satisfied.insert(requirement.clone());
            if let Some(provider) = universe.get(index) {
                discovered.extend(provider.requires().iter().cloned());
            }
        }

        if !changed {
            break;
        }

        unsatisfied.extend(discovered);
        unsatisfied.retain(|requirement| !satisfied.contains(requirement));
    }

    let seed_index = universe
        .iter()
        .position(|package| std::ptr::eq(package, seed))
        .or_else(|| universe.iter().position(|package| package == seed));
    let self_satisfied = seed_index.is_some_and(|index| {
        seed.requires()
            .iter()
            .any(|requirement| providers.get(requirement.as_str()) == Some(&index))
    });

    reached
        .into_iter()
        .filter(|&index| self_satisfied || Some(index) != seed_index)
        .filter_map(|index| universe.get(index))
        .collect()
}
