use std::collections::BTreeMap;

/// Separator between component id and parameter name in a qualified name.
pub const QUALIFIER: char = '.';

/// A component's named numeric parameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    entries: Vec<(String, f64)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Finite value for `name`, if present. Non-finite values are treated as absent.
    pub fn get_finite(&self, name: &str) -> Option<f64> {
        self.get(name).filter(|v| v.is_finite())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut map = ParameterMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Flattened parameters of every component, keyed `componentId.paramName`.
///
/// Order follows engine registration order, then each component's declaration
/// order. The calibrator relies on that order to map between names and the
/// positions of a search vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterVector {
    entries: Vec<(String, f64)>,
}

impl ParameterVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn qualify(component: &str, name: &str) -> String {
        format!("{}{}{}", component, QUALIFIER, name)
    }

    /// Split a qualified name at the first separator into `(component, name)`.
    pub fn split(qualified: &str) -> Option<(&str, &str)> {
        qualified
            .split_once(QUALIFIER)
            .filter(|(c, n)| !c.is_empty() && !n.is_empty())
    }

    /// Append every parameter of `component`, qualified by its id.
    pub fn extend_component(&mut self, component: &str, params: &ParameterMap) {
        for (name, value) in params.iter() {
            self.insert(Self::qualify(component, name), value);
        }
    }

    pub fn insert(&mut self, qualified: impl Into<String>, value: f64) {
        let qualified = qualified.into();
        match self.entries.iter_mut().find(|(n, _)| *n == qualified) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((qualified, value)),
        }
    }

    pub fn get(&self, qualified: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == qualified)
            .map(|(_, v)| *v)
    }

    /// Unqualified parameters that belong to `component`.
    pub fn for_component(&self, component: &str) -> ParameterMap {
        self.entries
            .iter()
            .filter_map(|(qualified, value)| {
                Self::split(qualified)
                    .filter(|(c, _)| *c == component)
                    .map(|(_, name)| (name.to_string(), *value))
            })
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    /// Same names, new values by position. Extra values are ignored.
    pub fn with_values(&self, values: &[f64]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .zip(values)
                .map(|((name, _), value)| (name.clone(), *value))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.entries.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut vector = ParameterVector::new();
        for (name, value) in iter {
            vector.insert(name, value);
        }
        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_map_insert_replaces_in_place() {
        let mut map = ParameterMap::new().with("a", 1.0).with("b", 2.0);
        map.insert("a", 3.0);
        let names: Vec<_> = map.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(3.0));
    }

    #[test]
    fn test_get_finite_ignores_nan() {
        let map = ParameterMap::new().with("a", f64::NAN);
        assert_eq!(map.get_finite("a"), None);
    }

    #[test]
    fn test_qualified_names_route_to_component() {
        let mut vector = ParameterVector::new();
        vector.extend_component("duration", &ParameterMap::new().with("daily_rate", 100.0));
        vector.extend_component("distance", &ParameterMap::new().with("tier_1_rate", 0.58));

        assert_eq!(vector.get("duration.daily_rate"), Some(100.0));
        let distance = vector.for_component("distance");
        assert_eq!(distance.len(), 1);
        assert_eq!(distance.get("tier_1_rate"), Some(0.58));
    }

    #[test]
    fn test_split_requires_both_halves() {
        assert_eq!(ParameterVector::split("quirk.bonus"), Some(("quirk", "bonus")));
        assert_eq!(ParameterVector::split("quirk."), None);
        assert_eq!(ParameterVector::split(".bonus"), None);
        assert_eq!(ParameterVector::split("bonus"), None);
    }

    #[test]
    fn test_with_values_keeps_order() {
        let vector: ParameterVector = [("x.a", 1.0), ("x.b", 2.0)].into_iter().collect();
        let updated = vector.with_values(&[5.0, 6.0]);
        assert_eq!(updated.values(), vec![5.0, 6.0]);
        assert_eq!(updated.names().collect::<Vec<_>>(), vec!["x.a", "x.b"]);
    }
}
