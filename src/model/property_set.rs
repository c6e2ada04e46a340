//! PropertySet: the property names attributed to one classification node.

use std::collections::BTreeSet;

/// Set of property names. Ordered so that dumps and rewritten documents are
/// deterministic; comparison is plain set equality.
pub type PropertySet = BTreeSet<String>;

/// Shared empty set, handed out for ids that carry no declaration.
pub static EMPTY: PropertySet = BTreeSet::new();

/// Build a PropertySet from anything string-like.
pub fn property_set<I, S>(names: I) -> PropertySet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

/// Intersection of all given sets; `None` when there are no sets at all.
pub fn intersect_all<'a, I>(sets: I) -> Option<PropertySet>
where
    I: IntoIterator<Item = &'a PropertySet>,
{
    let mut iter = sets.into_iter();
    let first = iter.next()?.clone();
    Some(iter.fold(first, |acc, set| acc.intersection(set).cloned().collect()))
}
