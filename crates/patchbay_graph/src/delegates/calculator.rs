// SPDX-License-Identifier: MIT OR Apache-2.0
//! Calculator node set: a number source, four arithmetic operators and a
//! number display, all exchanging decimal payloads.

use crate::delegate::{DelegateUpdates, LoadError, NodeDelegate};
use crate::port::{NodeData, NodeDataType, PortIndex, PortType, SharedNodeData};
use crate::registry::NodeDelegateRegistry;
use std::any::Any;
use std::rc::Rc;

/// Decimal number payload exchanged by the calculator nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberData {
    value: f64,
}

impl NumberData {
    /// Wrap a number.
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    /// The wrapped number.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The shared `decimal` type tag.
    pub fn tag() -> NodeDataType {
        NodeDataType::new("decimal", "Decimal")
    }
}

impl NodeData for NumberData {
    fn data_type(&self) -> NodeDataType {
        Self::tag()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn as_number(data: &SharedNodeData) -> Option<f64> {
    data.as_any().downcast_ref::<NumberData>().map(NumberData::value)
}

/// Source node emitting a user-settable number on its single output.
#[derive(Default)]
pub struct NumberSource {
    number: Option<Rc<NumberData>>,
}

impl NumberSource {
    /// Source pre-loaded with a value.
    pub fn with_value(value: f64) -> Self {
        Self {
            number: Some(Rc::new(NumberData::new(value))),
        }
    }

    /// Current value, if one was set.
    pub fn number(&self) -> Option<f64> {
        self.number.as_ref().map(|n| n.value())
    }

    /// Set the value and announce the changed output.
    pub fn set_number(&mut self, value: f64, updates: &mut DelegateUpdates) {
        self.number = Some(Rc::new(NumberData::new(value)));
        updates.data_updated(0);
    }
}

impl NodeDelegate for NumberSource {
    fn name(&self) -> String {
        "NumberSource".into()
    }

    fn caption(&self) -> String {
        "Number Source".into()
    }

    fn n_ports(&self, port_type: PortType) -> u32 {
        match port_type {
            PortType::Out => 1,
            _ => 0,
        }
    }

    fn data_type(&self, _port_type: PortType, _port_index: PortIndex) -> NodeDataType {
        NumberData::tag()
    }

    fn set_in_data(
        &mut self,
        _data: Option<SharedNodeData>,
        _port_index: PortIndex,
        _updates: &mut DelegateUpdates,
    ) {
    }

    fn out_data(&self, port_index: PortIndex) -> Option<SharedNodeData> {
        if port_index != 0 {
            return None;
        }
        let number = self.number.clone()?;
        Some(number)
    }

    fn save(&self) -> serde_json::Value {
        serde_json::json!({ "name": self.name(), "value": self.number() })
    }

    fn load(&mut self, state: &serde_json::Value) -> Result<(), LoadError> {
        let value = state.get("value").ok_or(LoadError::InvalidField("value"))?;
        self.number = match value {
            serde_json::Value::Null => None,
            other => {
                let value = other.as_f64().ok_or(LoadError::InvalidField("value"))?;
                Some(Rc::new(NumberData::new(value)))
            }
        };
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Sink node showing the last number delivered to its single input.
#[derive(Default)]
pub struct NumberDisplay {
    data: Option<SharedNodeData>,
}

impl NumberDisplay {
    /// The displayed number, if any.
    pub fn number(&self) -> Option<f64> {
        self.data.as_ref().and_then(as_number)
    }

    /// The payload handle as delivered, shared with the producer.
    pub fn data(&self) -> Option<&SharedNodeData> {
        self.data.as_ref()
    }
}

impl NodeDelegate for NumberDisplay {
    fn name(&self) -> String {
        "NumberDisplay".into()
    }

    fn caption(&self) -> String {
        "Number Display".into()
    }

    fn n_ports(&self, port_type: PortType) -> u32 {
        match port_type {
            PortType::In => 1,
            _ => 0,
        }
    }

    fn data_type(&self, _port_type: PortType, _port_index: PortIndex) -> NodeDataType {
        NumberData::tag()
    }

    fn set_in_data(
        &mut self,
        data: Option<SharedNodeData>,
        _port_index: PortIndex,
        _updates: &mut DelegateUpdates,
    ) {
        self.data = data;
    }

    fn out_data(&self, _port_index: PortIndex) -> Option<SharedNodeData> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Two-input arithmetic operator with one result output.
///
/// The result is computed while inputs arrive; a missing operand or an
/// undefined operation (division by zero) invalidates the output and the
/// invalidation propagates downstream like any other update.
pub struct MathOperation {
    name: &'static str,
    operands: [Option<SharedNodeData>; 2],
    result: Option<Rc<NumberData>>,
    op: fn(f64, f64) -> Option<f64>,
}

impl MathOperation {
    fn new(name: &'static str, op: fn(f64, f64) -> Option<f64>) -> Self {
        Self {
            name,
            operands: [None, None],
            result: None,
            op,
        }
    }

    /// `A + B`.
    pub fn addition() -> Self {
        Self::new("Addition", |a, b| Some(a + b))
    }

    /// `A - B`.
    pub fn subtraction() -> Self {
        Self::new("Subtraction", |a, b| Some(a - b))
    }

    /// `A × B`.
    pub fn multiplication() -> Self {
        Self::new("Multiplication", |a, b| Some(a * b))
    }

    /// `A ÷ B`; undefined for `B == 0`.
    pub fn division() -> Self {
        Self::new("Division", |a, b| if b == 0.0 { None } else { Some(a / b) })
    }

    /// Current result, if both operands are present and the operation is
    /// defined.
    pub fn result(&self) -> Option<f64> {
        self.result.as_ref().map(|n| n.value())
    }

    fn operand(&self, index: usize) -> Option<f64> {
        self.operands[index].as_ref().and_then(as_number)
    }

    fn compute(&mut self, updates: &mut DelegateUpdates) {
        let result = match (self.operand(0), self.operand(1)) {
            (Some(a), Some(b)) => (self.op)(a, b),
            _ => None,
        };
        match result {
            Some(value) => {
                self.result = Some(Rc::new(NumberData::new(value)));
                updates.data_updated(0);
            }
            None => {
                self.result = None;
                updates.data_invalidated(0);
            }
        }
    }
}

impl NodeDelegate for MathOperation {
    fn name(&self) -> String {
        self.name.into()
    }

    fn n_ports(&self, port_type: PortType) -> u32 {
        match port_type {
            PortType::In => 2,
            PortType::Out => 1,
            PortType::None => 0,
        }
    }

    fn data_type(&self, _port_type: PortType, _port_index: PortIndex) -> NodeDataType {
        NumberData::tag()
    }

    fn port_caption(&self, port_type: PortType, port_index: PortIndex) -> String {
        match (port_type, port_index) {
            (PortType::In, 0) => "A".into(),
            (PortType::In, 1) => "B".into(),
            (PortType::Out, 0) => "Result".into(),
            _ => String::new(),
        }
    }

    fn port_caption_visible(&self, _port_type: PortType, _port_index: PortIndex) -> bool {
        true
    }

    fn set_in_data(
        &mut self,
        data: Option<SharedNodeData>,
        port_index: PortIndex,
        updates: &mut DelegateUpdates,
    ) {
        if let Some(slot) = self.operands.get_mut(port_index as usize) {
            *slot = data;
            self.compute(updates);
        }
    }

    fn out_data(&self, port_index: PortIndex) -> Option<SharedNodeData> {
        if port_index != 0 {
            return None;
        }
        let result = self.result.clone()?;
        Some(result)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry pre-loaded with the calculator node set.
pub fn create_calculator_registry() -> NodeDelegateRegistry {
    let mut registry = NodeDelegateRegistry::new();
    registry.register::<NumberSource>("Sources");
    registry.register::<NumberDisplay>("Displays");
    registry.register_with("Operators", || Box::new(MathOperation::addition()));
    registry.register_with("Operators", || Box::new(MathOperation::subtraction()));
    registry.register_with("Operators", || Box::new(MathOperation::multiplication()));
    registry.register_with("Operators", || Box::new(MathOperation::division()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(op: &mut MathOperation, port: PortIndex, value: f64) -> DelegateUpdates {
        let mut updates = DelegateUpdates::default();
        op.set_in_data(Some(Rc::new(NumberData::new(value))), port, &mut updates);
        updates
    }

    #[test]
    fn test_operation_computes_when_both_operands_present() {
        let mut op = MathOperation::subtraction();
        let updates = feed(&mut op, 0, 10.0);
        assert!(!updates.is_empty());
        assert_eq!(op.result(), None);

        feed(&mut op, 1, 4.0);
        assert_eq!(op.result(), Some(6.0));
        assert!(op.out_data(0).is_some());
    }

    #[test]
    fn test_missing_operand_invalidates_result() {
        let mut op = MathOperation::multiplication();
        feed(&mut op, 0, 3.0);
        feed(&mut op, 1, 5.0);
        assert_eq!(op.result(), Some(15.0));

        let mut updates = DelegateUpdates::default();
        op.set_in_data(None, 1, &mut updates);
        assert!(!updates.is_empty());
        assert_eq!(op.result(), None);
        assert!(op.out_data(0).is_none());
    }

    #[test]
    fn test_division_by_zero_is_undefined() {
        let mut op = MathOperation::division();
        feed(&mut op, 0, 1.0);
        feed(&mut op, 1, 0.0);
        assert_eq!(op.result(), None);

        feed(&mut op, 1, 2.0);
        assert_eq!(op.result(), Some(0.5));
    }

    #[test]
    fn test_source_save_load_round_trip() {
        let source = NumberSource::with_value(4.25);
        let state = source.save();
        assert_eq!(state["name"], "NumberSource");

        let mut restored = NumberSource::default();
        restored.load(&state).expect("state restores");
        assert_eq!(restored.number(), Some(4.25));

        let unset = NumberSource::default();
        let mut restored = NumberSource::with_value(1.0);
        restored.load(&unset.save()).expect("null value restores");
        assert_eq!(restored.number(), None);
    }

    #[test]
    fn test_source_load_rejects_wrong_type() {
        let mut source = NumberSource::default();
        let err = source
            .load(&serde_json::json!({ "name": "NumberSource", "value": "five" }))
            .expect_err("non-numeric value is rejected");
        assert!(matches!(err, LoadError::InvalidField("value")));
    }

    #[test]
    fn test_display_keeps_the_delivered_handle() {
        let mut display = NumberDisplay::default();
        let payload: SharedNodeData = Rc::new(NumberData::new(9.0));
        let mut updates = DelegateUpdates::default();
        display.set_in_data(Some(payload.clone()), 0, &mut updates);
        assert_eq!(display.number(), Some(9.0));
        assert!(Rc::ptr_eq(display.data().expect("payload kept"), &payload));
    }

    #[test]
    fn test_calculator_registry_contents() {
        let registry = create_calculator_registry();
        for name in [
            "NumberSource",
            "NumberDisplay",
            "Addition",
            "Subtraction",
            "Multiplication",
            "Division",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        let categories: Vec<&str> = registry.categories().collect();
        assert_eq!(categories, vec!["Displays", "Operators", "Sources"]);
    }
}
