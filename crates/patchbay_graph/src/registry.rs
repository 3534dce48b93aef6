// SPDX-License-Identifier: MIT OR Apache-2.0
//! Factory registry mapping delegate type names to constructors.

use crate::delegate::NodeDelegate;
use std::collections::{BTreeSet, HashMap};

/// Factory producing a fresh delegate instance.
pub type DelegateCreator = Box<dyn Fn() -> Box<dyn NodeDelegate>>;

/// Registry of node delegate factories, grouped into categories for
/// discovery (e.g. populating a node-creation menu).
///
/// The first registration of a name wins; later registrations under the same
/// name are silently ignored. Registries are shared across graph models and
/// treated as immutable once populated.
#[derive(Default)]
pub struct NodeDelegateRegistry {
    creators: HashMap<String, DelegateCreator>,
    categories: BTreeSet<String>,
    category_for: HashMap<String, String>,
}

impl NodeDelegateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delegate type constructible with `Default`.
    pub fn register<T>(&mut self, category: impl Into<String>)
    where
        T: NodeDelegate + Default + 'static,
    {
        self.register_with(category, || Box::new(T::default()));
    }

    /// Register a factory closure. Constructor arguments are bound by the
    /// closure's captures; the registration name is derived from a throwaway
    /// instance.
    pub fn register_with<F>(&mut self, category: impl Into<String>, creator: F)
    where
        F: Fn() -> Box<dyn NodeDelegate> + 'static,
    {
        let name = creator().name();
        if self.creators.contains_key(&name) {
            tracing::debug!(model = %name, "delegate already registered, keeping first registration");
            return;
        }
        let category = category.into();
        self.categories.insert(category.clone());
        self.category_for.insert(name.clone(), category);
        self.creators.insert(name, Box::new(creator));
    }

    /// Remove a registration and its category association. The category
    /// itself is dropped once no registered delegate references it.
    ///
    /// Returns false when the name is unknown.
    pub fn unregister(&mut self, name: &str) -> bool {
        if self.creators.remove(name).is_none() {
            return false;
        }
        if let Some(category) = self.category_for.remove(name) {
            let still_used = self.category_for.values().any(|c| *c == category);
            if !still_used {
                self.categories.remove(&category);
            }
        }
        true
    }

    /// Instantiate the delegate registered under `name`. Callers must handle
    /// the miss.
    pub fn create(&self, name: &str) -> Option<Box<dyn NodeDelegate>> {
        self.creators.get(name).map(|creator| creator())
    }

    /// Whether a delegate is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    /// All known category names, ordered.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    /// All registered delegate type names.
    pub fn registered_model_names(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }

    /// Category a delegate name was registered under.
    pub fn category_of(&self, name: &str) -> Option<&str> {
        self.category_for.get(name).map(String::as_str)
    }

    /// Name → category association, for menu population.
    pub fn registered_models_category_association(&self) -> &HashMap<String, String> {
        &self.category_for
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegates::calculator::{MathOperation, NumberDisplay, NumberSource};
    use crate::port::{NodeDataType, PortType, SharedNodeData};

    /// Registers under the same name as the real addition operator but with
    /// no ports at all.
    #[derive(Default)]
    struct ImpostorAddition;

    impl NodeDelegate for ImpostorAddition {
        fn name(&self) -> String {
            "Addition".into()
        }

        fn n_ports(&self, _port_type: PortType) -> u32 {
            0
        }

        fn data_type(&self, _port_type: PortType, _port_index: u32) -> NodeDataType {
            NodeDataType::new("void", "Void")
        }

        fn set_in_data(
            &mut self,
            _data: Option<SharedNodeData>,
            _port_index: u32,
            _updates: &mut crate::delegate::DelegateUpdates,
        ) {
        }

        fn out_data(&self, _port_index: u32) -> Option<SharedNodeData> {
            None
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    fn calculator_registry() -> NodeDelegateRegistry {
        let mut registry = NodeDelegateRegistry::new();
        registry.register::<NumberSource>("Sources");
        registry.register::<NumberDisplay>("Displays");
        registry.register_with("Operators", || Box::new(MathOperation::addition()));
        registry
    }

    #[test]
    fn test_create_known_and_unknown() {
        let registry = calculator_registry();
        assert!(registry.create("NumberSource").is_some());
        assert!(registry.create("NoSuchModel").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = calculator_registry();
        registry.register::<ImpostorAddition>("Other");

        assert_eq!(registry.category_of("Addition"), Some("Operators"));
        let created = registry.create("Addition").expect("still registered");
        assert_eq!(created.n_ports(PortType::In), 2);
        assert!(!registry.categories().any(|c| c == "Other"));
    }

    #[test]
    fn test_categories_are_ordered_and_deduplicated() {
        let mut registry = calculator_registry();
        registry.register_with("Operators", || Box::new(MathOperation::division()));
        let categories: Vec<&str> = registry.categories().collect();
        assert_eq!(categories, vec!["Displays", "Operators", "Sources"]);
    }

    #[test]
    fn test_unregister_removes_entry_and_orphaned_category() {
        let mut registry = calculator_registry();
        registry.register_with("Operators", || Box::new(MathOperation::division()));

        assert!(registry.unregister("Addition"));
        assert!(registry.create("Addition").is_none());
        assert!(registry.category_of("Addition").is_none());
        // "Division" still holds the category open.
        assert!(registry.categories().any(|c| c == "Operators"));

        assert!(registry.unregister("Division"));
        assert!(!registry.categories().any(|c| c == "Operators"));

        assert!(!registry.unregister("Addition"));
    }

    #[test]
    fn test_factory_binds_constructor_arguments() {
        let mut registry = NodeDelegateRegistry::new();
        registry.register_with("Sources", || Box::new(NumberSource::with_value(2.5)));
        let created = registry.create("NumberSource").expect("registered");
        let source = created
            .as_any()
            .downcast_ref::<NumberSource>()
            .expect("is a number source");
        assert_eq!(source.number(), Some(2.5));
    }
}
