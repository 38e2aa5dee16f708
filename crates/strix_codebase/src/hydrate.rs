//! Hydration: copying inherited members into each class's own tables.
//!
//! A class's own members win over members of its traits, which win over the
//! parent's, which win over interface members. Copies keep the defining
//! FQSEN of the original so visibility checks can find the declaring class.

use crate::codebase::{CodeBase, Members};
use strix_types::FullyQualifiedClassName;
use tracing::trace;

impl CodeBase {
    /// Hydrate every registered class.
    pub fn hydrate_all(&mut self) {
        for fqsen in self.class_fqsens() {
            self.hydrate_class(&fqsen);
        }
    }

    /// Copy inherited members into `fqsen` once. Cycles in the hierarchy
    /// terminate because a class is marked before its ancestors are visited.
    pub fn hydrate_class(&mut self, fqsen: &FullyQualifiedClassName) {
        if self.hydrated.contains(fqsen) {
            return;
        }
        let Some(clazz) = self.classes.get(fqsen) else {
            return;
        };
        let sources: Vec<FullyQualifiedClassName> = clazz
            .traits
            .iter()
            .chain(clazz.parent.iter())
            .chain(clazz.interfaces.iter())
            .cloned()
            .collect();
        self.hydrated.insert(fqsen.clone());
        trace!(class = %fqsen, ancestors = sources.len(), "hydrating class");

        for source in &sources {
            if !self.has_class_with_fqsen(source) {
                continue;
            }
            self.hydrate_class(source);
            self.inherit_members(source, fqsen);
        }
    }

    fn inherit_members(&mut self, from: &FullyQualifiedClassName, into: &FullyQualifiedClassName) {
        inherit(&mut self.methods, from, into, |method| method.fqsen = method.fqsen.with_class(into));
        inherit(&mut self.properties, from, into, |property| {
            property.fqsen = property.fqsen.with_class(into)
        });
        inherit(&mut self.class_constants, from, into, |constant| {
            constant.fqsen = constant.fqsen.with_class(into)
        });
    }

    /// Drop inherited copies and hydration marks. Registered members are
    /// kept; the next lookup hydrates again.
    pub fn reset_memoized_state(&mut self) {
        self.hydrated.clear();
        retain_own(&mut self.methods, |method| !method.is_inherited());
        retain_own(&mut self.properties, |property| !property.is_inherited());
        retain_own(&mut self.class_constants, |constant| !constant.is_inherited());
    }
}

fn inherit<T: Clone>(
    members: &mut Members<T>,
    from: &FullyQualifiedClassName,
    into: &FullyQualifiedClassName,
    rehome: impl Fn(&mut T),
) {
    let Some(source) = members.get(from) else {
        return;
    };
    let inherited: Vec<(String, T)> = source.iter().map(|(key, member)| (key.clone(), member.clone())).collect();
    let target = members.entry(into.clone()).or_default();
    for (key, mut member) in inherited {
        if target.contains_key(&key) {
            continue;
        }
        rehome(&mut member);
        target.insert(key, member);
    }
}

fn retain_own<T>(members: &mut Members<T>, keep: impl Fn(&T) -> bool) {
    for table in members.values_mut() {
        let dropped: Vec<String> = table
            .iter()
            .filter(|(_, member)| !keep(member))
            .map(|(key, _)| key.clone())
            .collect();
        for key in dropped {
            table.remove(&key);
        }
    }
}
