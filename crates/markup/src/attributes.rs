//! Markup attribute to element property translation.

use vdom::{ATTRIBUTES, HostTree, Prop, PropMap, Value};

/// Attributes written as host properties, with the property name they map to.
const PROPERTY_NAMES: &[(&str, &str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("class", "className"),
    ("title", "title"),
    ("value", "value"),
    ("tabindex", "tabIndex"),
];

/// Property name for an attribute that maps onto a host property.
pub fn property_name(attribute: &str) -> Option<&'static str> {
    PROPERTY_NAMES
        .iter()
        .find(|(attr, _)| *attr == attribute)
        .map(|(_, prop)| *prop)
}

/// Split markup attributes into properties.
///
/// Attributes in the property table become top-level properties; the rest
/// are collected in the `attributes` group, which is written through the
/// host's attribute primitives. With `svg` set every attribute stays in the
/// group, since SVG elements take attributes rather than properties. A bare
/// attribute (`<input disabled>`) has the empty string as its value.
pub fn translate<H: HostTree>(
    attributes: impl IntoIterator<Item = (String, Option<String>)>,
    svg: bool,
) -> PropMap<H> {
    let mut properties = PropMap::new();
    let mut group = std::collections::BTreeMap::new();
    for (name, value) in attributes {
        let value = Value::from(value.unwrap_or_default());
        match property_name(&name).filter(|_| !svg) {
            Some(prop) => {
                properties.insert(prop.to_string(), Prop::Value(value));
            }
            None => {
                group.insert(name, value);
            }
        }
    }
    if !group.is_empty() {
        properties.insert(ATTRIBUTES.to_string(), Prop::Map(group));
    }
    properties
}
