//! Attribute rewriting
//!
//! A user supplied [`AttrMapper`] sees every non-group attribute together with
//! the names of the groups that contain it. It can rename, replace or drop an
//! attribute; returning [`Attribute::elided`] drops it.

use super::attr::{AttrValue, Attribute};
use std::sync::Arc;

/// Rewrite function applied to each attribute before it is written
pub type AttrMapper = Arc<dyn Fn(&[String], Attribute) -> Attribute + Send + Sync>;

/// Lift a mapper so that it descends into groups
///
/// Groups are never handed to the mapper, only their children, with the
/// group key appended to the path. Children the mapper drops are removed,
/// and a group left without children collapses into the elided marker so
/// that chains of emptied groups disappear. No mapper means no rewriting.
pub fn wrap(mapper: Option<AttrMapper>) -> Option<AttrMapper> {
    let mapper = mapper?;
    Some(Arc::new(move |groups: &[String], attr: Attribute| {
        rewrite(&mapper, groups, attr)
    }))
}

fn rewrite(mapper: &AttrMapper, groups: &[String], attr: Attribute) -> Attribute {
    let attr = attr.resolve();
    match attr.value {
        AttrValue::Group(children) => {
            let mut path = Vec::with_capacity(groups.len() + 1);
            path.extend_from_slice(groups);
            path.push(attr.key.clone());

            let kept: Vec<Attribute> = children
                .into_iter()
                .map(|child| rewrite(mapper, &path, child))
                .filter(|mapped| !mapped.is_elided())
                .collect();

            if kept.is_empty() {
                Attribute::elided()
            } else {
                Attribute::group(attr.key, kept)
            }
        }
        _ => mapper(groups, attr),
    }
}
