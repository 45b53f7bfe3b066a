//! Effect definitions: named parameter trees describing emitters and groups

use crate::curves::{Curve, Gradient};
use crate::declaration::{self, EnumParameter, GROUP_DECLARATION, RANDOM};
use crate::noise::NoiseDescriptor;
use plume_core::{DefinitionId, PlumeError, Result, Vec2};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A parameter value. Numeric accessors are strict except that a float
/// accessor accepts an integer.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Bool(bool),
    Float(f32),
    String(String),
    Vec2(Vec2),
    FilePath(PathBuf),
    Gradient(Gradient),
    Curve(Curve),
    Noise(NoiseDescriptor),
}

impl ParamValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Int(_) => "int",
            ParamValue::Bool(_) => "bool",
            ParamValue::Float(_) => "float",
            ParamValue::String(_) => "string",
            ParamValue::Vec2(_) => "vec2",
            ParamValue::FilePath(_) => "path",
            ParamValue::Gradient(_) => "gradient",
            ParamValue::Curve(_) => "curve",
            ParamValue::Noise(_) => "noise",
        }
    }

    fn mismatch(&self, name: &str, expected: &str) -> PlumeError {
        PlumeError::wrong_type(name, expected, self.kind_name())
    }

    pub fn as_int(&self, name: &str) -> Result<i32> {
        match self {
            ParamValue::Int(v) => Ok(*v),
            other => Err(other.mismatch(name, "int")),
        }
    }

    pub fn as_float(&self, name: &str) -> Result<f32> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f32),
            other => Err(other.mismatch(name, "float")),
        }
    }

    pub fn as_bool(&self, name: &str) -> Result<bool> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(other.mismatch(name, "bool")),
        }
    }

    pub fn as_str(&self, name: &str) -> Result<&str> {
        match self {
            ParamValue::String(v) => Ok(v),
            other => Err(other.mismatch(name, "string")),
        }
    }

    pub fn as_vec2(&self, name: &str) -> Result<Vec2> {
        match self {
            ParamValue::Vec2(v) => Ok(*v),
            other => Err(other.mismatch(name, "vec2")),
        }
    }

    /// Paths also accept plain strings
    pub fn as_path(&self, name: &str) -> Result<&Path> {
        match self {
            ParamValue::FilePath(v) => Ok(v),
            ParamValue::String(v) => Ok(Path::new(v)),
            other => Err(other.mismatch(name, "path")),
        }
    }

    pub fn as_gradient(&self, name: &str) -> Result<&Gradient> {
        match self {
            ParamValue::Gradient(v) => Ok(v),
            other => Err(other.mismatch(name, "gradient")),
        }
    }

    pub fn as_curve(&self, name: &str) -> Result<&Curve> {
        match self {
            ParamValue::Curve(v) => Ok(v),
            other => Err(other.mismatch(name, "curve")),
        }
    }

    pub fn as_noise(&self, name: &str) -> Result<&NoiseDescriptor> {
        match self {
            ParamValue::Noise(v) => Ok(v),
            other => Err(other.mismatch(name, "noise")),
        }
    }

    pub fn as_enum<E: EnumParameter>(&self, name: &str) -> Result<E> {
        match self {
            ParamValue::Int(v) => E::from_int(name, *v),
            ParamValue::String(v) => E::from_name(name, v),
            other => Err(other.mismatch(name, "enum")),
        }
    }

    /// The neutral value of the same kind, used as a base when only a jitter is supplied
    fn zero_like(&self) -> ParamValue {
        match self {
            ParamValue::Int(_) => ParamValue::Int(0),
            ParamValue::Float(_) => ParamValue::Float(0.0),
            ParamValue::Vec2(_) => ParamValue::Vec2(Vec2::ZERO),
            other => other.clone(),
        }
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

impl From<Vec2> for ParamValue {
    fn from(v: Vec2) -> Self {
        ParamValue::Vec2(v)
    }
}

impl From<PathBuf> for ParamValue {
    fn from(v: PathBuf) -> Self {
        ParamValue::FilePath(v)
    }
}

impl From<Gradient> for ParamValue {
    fn from(v: Gradient) -> Self {
        ParamValue::Gradient(v)
    }
}

impl From<Curve> for ParamValue {
    fn from(v: Curve) -> Self {
        ParamValue::Curve(v)
    }
}

impl From<NoiseDescriptor> for ParamValue {
    fn from(v: NoiseDescriptor) -> Self {
        ParamValue::Noise(v)
    }
}

impl From<declaration::SortMode> for ParamValue {
    fn from(v: declaration::SortMode) -> Self {
        ParamValue::Int(v.to_int())
    }
}

impl From<declaration::LoopMode> for ParamValue {
    fn from(v: declaration::LoopMode) -> Self {
        ParamValue::Int(v.to_int())
    }
}

impl From<declaration::BlendMode> for ParamValue {
    fn from(v: declaration::BlendMode) -> Self {
        ParamValue::Int(v.to_int())
    }
}

/// A named value plus optional named sub-parameters (`Random`, `GraphEmitter`, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub value: ParamValue,
    pub parameters: HashMap<String, Parameter>,
}

impl Parameter {
    pub fn new(value: impl Into<ParamValue>) -> Self {
        Self {
            value: value.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn sub(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn set_sub(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.parameters
            .insert(name.to_string(), Parameter::new(value));
    }
}

/// Declaration kind of a definition node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationKind {
    /// A particle emitter using the named declaration's parameters
    Emitter(String),
    /// A container that only holds children
    Group,
}

impl DeclarationKind {
    pub fn name(&self) -> &str {
        match self {
            DeclarationKind::Emitter(name) => name,
            DeclarationKind::Group => GROUP_DECLARATION,
        }
    }
}

/// An immutable-once-shared description of an effect node and its children
#[derive(Debug, Clone)]
pub struct Definition {
    id: DefinitionId,
    pub name: String,
    pub kind: DeclarationKind,
    pub parameters: HashMap<String, Parameter>,
    pub children: Vec<Arc<Definition>>,
}

impl Definition {
    /// An emitter with every built-in declaration parameter at its default
    pub fn emitter(name: &str) -> Self {
        let mut def = Self::bare(
            name,
            DeclarationKind::Emitter(declaration::EMITTER_DECLARATION.to_string()),
        );
        for (param, value) in declaration::emitter_defaults() {
            def.parameters.insert(param.to_string(), Parameter::new(value));
        }
        def
    }

    /// A node of the given kind with no parameters at all
    pub fn bare(name: &str, kind: DeclarationKind) -> Self {
        Self {
            id: DefinitionId::new(),
            name: name.to_string(),
            kind,
            parameters: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn group(name: &str) -> Self {
        Self::bare(name, DeclarationKind::Group)
    }

    /// Replace the generated id, e.g. to keep pool partitioning across edits
    pub fn with_id(mut self, id: DefinitionId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    pub fn is_group(&self) -> bool {
        self.kind == DeclarationKind::Group
    }

    pub fn parameter(&self, name: &str) -> Result<&Parameter> {
        self.parameters
            .get(name)
            .ok_or_else(|| PlumeError::ParameterNotFound(format!("{}.{}", self.name, name)))
    }

    pub fn value(&self, name: &str) -> Result<&ParamValue> {
        Ok(&self.parameter(name)?.value)
    }

    pub fn int(&self, name: &str) -> Result<i32> {
        self.value(name)?.as_int(name)
    }

    pub fn float(&self, name: &str) -> Result<f32> {
        self.value(name)?.as_float(name)
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        self.value(name)?.as_bool(name)
    }

    pub fn enum_value<E: EnumParameter>(&self, name: &str) -> Result<E> {
        self.value(name)?.as_enum(name)
    }

    /// Set a parameter's value, keeping its sub-parameters
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> &mut Self {
        let value = value.into();
        match self.parameters.get_mut(name) {
            Some(param) => param.value = value,
            None => {
                self.parameters
                    .insert(name.to_string(), Parameter::new(value));
            }
        }
        self
    }

    /// Set the `Random` jitter of a parameter, creating a zero base if absent
    pub fn set_random(&mut self, name: &str, jitter: impl Into<ParamValue>) -> &mut Self {
        let jitter = jitter.into();
        self.parameters
            .entry(name.to_string())
            .or_insert_with(|| Parameter::new(jitter.zero_like()))
            .set_sub(RANDOM, jitter);
        self
    }

    /// Attach a named sub-parameter (a curve for `GraphEmitter`, say)
    pub fn set_sub(&mut self, name: &str, sub: &str, value: impl Into<ParamValue>) -> Result<&mut Self> {
        let display = self.name.clone();
        self.parameters
            .get_mut(name)
            .ok_or_else(|| PlumeError::ParameterNotFound(format!("{display}.{name}")))?
            .set_sub(sub, value);
        Ok(self)
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_random(mut self, name: &str, jitter: impl Into<ParamValue>) -> Self {
        self.set_random(name, jitter);
        self
    }

    pub fn with_child(mut self, child: impl Into<Arc<Definition>>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Depth-first search for a definition by name, including self
    pub fn find(&self, name: &str) -> Option<&Definition> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Number of nodes in this definition tree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{SortMode, EMITTER_LIFE, EMITTER_SPAWN_RATE, SORT_MODE};

    #[test]
    fn emitter_has_declaration_defaults() {
        let def = Definition::emitter("spark");
        assert_eq!(def.float(EMITTER_SPAWN_RATE).unwrap(), 10.0);
        assert_eq!(def.float(EMITTER_LIFE).unwrap(), 1.0);
        assert_eq!(def.enum_value::<SortMode>(SORT_MODE).unwrap(), SortMode::Unsorted);
        assert!(!def.is_group());
    }

    #[test]
    fn float_accessor_accepts_int() {
        assert_eq!(ParamValue::Int(3).as_float("x").unwrap(), 3.0);
        assert!(ParamValue::Float(3.0).as_int("x").is_err());
    }

    #[test]
    fn wrong_kind_reports_both_sides() {
        let err = ParamValue::Bool(true).as_float("EmitterLife").unwrap_err();
        match err {
            PlumeError::InvalidParameterType { expected, got, .. } => {
                assert_eq!(expected, "float");
                assert_eq!(got, "bool");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let def = Definition::group("root");
        assert!(matches!(
            def.float(EMITTER_LIFE),
            Err(PlumeError::ParameterNotFound(_))
        ));
    }

    #[test]
    fn set_keeps_sub_parameters() {
        let mut def = Definition::emitter("spark");
        def.set_random(EMITTER_LIFE, 0.5f32);
        def.set(EMITTER_LIFE, 2.0f32);
        let param = def.parameter(EMITTER_LIFE).unwrap();
        assert_eq!(param.value, ParamValue::Float(2.0));
        assert_eq!(param.sub(RANDOM).unwrap().value, ParamValue::Float(0.5));
    }

    #[test]
    fn random_without_base_gets_zero_base() {
        let def = Definition::bare("x", DeclarationKind::Emitter("Custom".into()))
            .with_random("Spin", 4);
        assert_eq!(def.int("Spin").unwrap(), 0);
    }

    #[test]
    fn enums_accept_names() {
        let def = Definition::emitter("spark").with(SORT_MODE, "oldest_on_top");
        assert_eq!(
            def.enum_value::<SortMode>(SORT_MODE).unwrap(),
            SortMode::OldestOnTop
        );
    }

    #[test]
    fn find_walks_children() {
        let def = Definition::group("root")
            .with_child(Definition::emitter("smoke"))
            .with_child(Definition::group("inner").with_child(Definition::emitter("ember")));
        assert!(def.find("ember").is_some());
        assert!(def.find("missing").is_none());
        assert_eq!(def.node_count(), 4);
    }
}
