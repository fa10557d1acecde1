use std::any::Any;
use std::collections::BTreeMap;

use crate::math::{Aabb, Point3};
use crate::selection::{SelectionTarget, SelectionTest, Selector};

use super::node::{SceneNode, Selectable, SelectionTestable};
use super::NodeId;

/// Key holding an entity's position as three space-separated numbers.
pub const ORIGIN_KEY: &str = "origin";

/// Half-size of the box drawn and selected around a point entity.
const POINT_ENTITY_EXTENT: f64 = 8.0;

/// An entity: a classname and ordered key/value pairs.
///
/// Brush entities hold their brushes as child nodes. Point entities carry
/// an `origin` key and are selected around that point.
#[derive(Debug, Clone)]
pub struct EntityNode {
    classname: String,
    key_values: BTreeMap<String, String>,
    selected: bool,
}

impl EntityNode {
    #[must_use]
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            key_values: BTreeMap::new(),
            selected: false,
        }
    }

    #[must_use]
    pub fn classname(&self) -> &str {
        &self.classname
    }

    #[must_use]
    pub fn key_value(&self, key: &str) -> Option<&str> {
        self.key_values.get(key).map(String::as_str)
    }

    /// Sets a key; an empty value removes it.
    pub fn set_key_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        if value.is_empty() {
            self.key_values.remove(&key);
        } else {
            self.key_values.insert(key, value);
        }
    }

    /// Key/value pairs in key order.
    pub fn key_values(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.key_values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The parsed `origin` key, if present and well formed.
    #[must_use]
    pub fn origin(&self) -> Option<Point3> {
        let mut parts = self.key_value(ORIGIN_KEY)?.split_whitespace().map(str::parse::<f64>);
        let x = parts.next()?.ok()?;
        let y = parts.next()?.ok()?;
        let z = parts.next()?.ok()?;
        parts.next().is_none().then(|| Point3::new(x, y, z))
    }

    pub fn set_origin(&mut self, origin: &Point3) {
        self.set_key_value(ORIGIN_KEY, format!("{} {} {}", origin.x, origin.y, origin.z));
    }
}

impl Selectable for EntityNode {
    fn is_selected(&self) -> bool {
        self.selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl SelectionTestable for EntityNode {
    fn test_select(&self, node: NodeId, selector: &mut dyn Selector, test: &SelectionTest) {
        let Some(origin) = self.origin() else {
            return;
        };
        if let Some(hit) = test.test_point(&origin, POINT_ENTITY_EXTENT) {
            selector.add_intersection(SelectionTarget::Object(node), hit);
        }
    }
}

impl SceneNode for EntityNode {
    fn name(&self) -> &str {
        &self.classname
    }

    fn local_aabb(&self) -> Aabb {
        self.origin().map_or_else(Aabb::empty, |origin| {
            let extent = nalgebra::Vector3::repeat(POINT_ENTITY_EXTENT);
            Aabb::from_points(&[origin - extent, origin + extent])
        })
    }

    fn clone_node(&self) -> Option<Box<dyn SceneNode>> {
        Some(Box::new(Self {
            selected: false,
            ..self.clone()
        }))
    }

    fn on_remove_from_scene(&mut self) {
        self.selected = false;
    }

    fn as_selectable(&self) -> Option<&dyn Selectable> {
        Some(self)
    }

    fn as_selectable_mut(&mut self) -> Option<&mut dyn Selectable> {
        Some(self)
    }

    fn as_selection_testable(&self) -> Option<&dyn SelectionTestable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_ordered_and_empty_removes() {
        let mut entity = EntityNode::new("light");
        entity.set_key_value("radius", "300");
        entity.set_key_value("color", "1 1 1");
        let keys: Vec<&str> = entity.key_values().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["color", "radius"]);
        entity.set_key_value("radius", "");
        assert!(entity.key_value("radius").is_none());
        assert_eq!(entity.name(), "light");
    }

    #[test]
    fn origin_round_trips_through_key() {
        let mut entity = EntityNode::new("info_player_start");
        assert!(entity.origin().is_none());
        assert!(!entity.local_aabb().is_valid());
        entity.set_origin(&Point3::new(16.0, -8.0, 0.5));
        assert_eq!(entity.key_value(ORIGIN_KEY), Some("16 -8 0.5"));
        assert_eq!(entity.origin(), Some(Point3::new(16.0, -8.0, 0.5)));
        assert_eq!(entity.local_aabb().max, Point3::new(24.0, 0.0, 8.5));

        entity.set_key_value(ORIGIN_KEY, "1 2");
        assert!(entity.origin().is_none());
    }

    #[test]
    fn clone_drops_selection() {
        let mut entity = EntityNode::new("func_static");
        entity.set_selected(true);
        let copy = entity.clone_node().unwrap();
        assert!(!copy.as_selectable().unwrap().is_selected());
        assert_eq!(copy.name(), "func_static");
    }
}
