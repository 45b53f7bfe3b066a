//! Simulation settings and TOML effect definition files.
//!
//! ```toml
//! [simulation]
//! max_emissions_per_frame = 200
//!
//! [[effect]]
//! name = "campfire"
//! declaration = "Group"
//!
//! [[effect.children]]
//! name = "flames"
//!
//! [effect.children.parameters]
//! EmitterSpawnRate = 40.0
//! ParticleLife = { value = 1.2, random = 0.3 }
//! BlendMode = "additive"
//! ParticleColor = { gradient = [[0.0, [1.0, 0.8, 0.2, 1.0]], [1.0, [1.0, 0.1, 0.0, 0.0]]] }
//! ```

use crate::curves::{Curve, Gradient, GradientStop};
use crate::declaration::{
    enum_value_by_name, GRAPH_EMITTER, GRAPH_PARTICLE, GROUP_DECLARATION, RANDOM, TEXTURE,
};
use crate::definition::{DeclarationKind, Definition, ParamValue, Parameter};
use crate::noise::NoiseDescriptor;
use plume_core::{Color, DefinitionId, PlumeError, Result, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Upper bound on particles a single node emits per update
    pub max_emissions_per_frame: usize,
    /// Nodes with a higher `QualityLevel` are not simulated
    pub quality_level: i32,
    /// Particle slots allocated for a new emitter node
    pub initial_capacity: usize,
    /// Seed of the default random sources
    pub seed: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_emissions_per_frame: 100,
            quality_level: 2,
            initial_capacity: 64,
            seed: 0xDEAD_BEEF,
        }
    }
}

impl SimulationConfig {
    /// Read the optional `[simulation]` table of a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(default)]
            simulation: SimulationConfig,
        }
        let wrapper: Wrapper = toml::from_str(source)?;
        Ok(wrapper.simulation)
    }
}

#[derive(Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    simulation: SimulationConfig,
    #[serde(default)]
    effect: Vec<EffectEntry>,
}

#[derive(Deserialize)]
struct EffectEntry {
    name: String,
    #[serde(default)]
    declaration: Option<String>,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    parameters: toml::Table,
    #[serde(default)]
    children: Vec<EffectEntry>,
}

/// Named top-level definitions loaded from a TOML file
#[derive(Debug, Clone, Default)]
pub struct DefinitionTable {
    pub simulation: SimulationConfig,
    definitions: Vec<Arc<Definition>>,
    by_name: HashMap<String, usize>,
}

impl DefinitionTable {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: DefinitionFile = toml::from_str(source)?;
        let mut table = Self {
            simulation: file.simulation,
            ..Self::default()
        };
        for entry in &file.effect {
            let definition = build_definition(entry)?;
            if table.by_name.contains_key(&definition.name) {
                return Err(PlumeError::ParseError(format!(
                    "duplicate effect name '{}'",
                    definition.name
                )));
            }
            table
                .by_name
                .insert(definition.name.clone(), table.definitions.len());
            table.definitions.push(definition.into_shared());
        }
        Ok(table)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn get(&self, name: &str) -> Result<&Arc<Definition>> {
        self.by_name
            .get(name)
            .map(|index| &self.definitions[*index])
            .ok_or_else(|| PlumeError::DefinitionNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Definition>> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn build_definition(entry: &EffectEntry) -> Result<Definition> {
    let mut definition = match entry.declaration.as_deref() {
        Some(GROUP_DECLARATION) => Definition::group(&entry.name),
        None => Definition::emitter(&entry.name),
        Some(custom) => {
            let mut def = Definition::emitter(&entry.name);
            def.kind = DeclarationKind::Emitter(custom.to_string());
            def
        }
    };
    if let Some(raw) = entry.id {
        DefinitionId::ensure_counter_above(raw);
        definition = definition.with_id(DefinitionId::from_raw(raw));
    }

    for (name, value) in &entry.parameters {
        let parameter = parse_parameter(name, value)?;
        match definition.parameters.get_mut(name) {
            // Integer literals for declared float parameters stay floats
            Some(existing) => {
                existing.value = match (&existing.value, parameter.value) {
                    (ParamValue::Float(_), ParamValue::Int(i)) => ParamValue::Float(i as f32),
                    (_, value) => value,
                };
                existing.parameters.extend(parameter.parameters);
            }
            None => {
                definition.parameters.insert(name.clone(), parameter);
            }
        }
    }

    for child in &entry.children {
        definition.children.push(build_definition(child)?.into_shared());
    }
    Ok(definition)
}

fn parse_error(name: &str, message: impl std::fmt::Display) -> PlumeError {
    PlumeError::ParseError(format!("parameter '{name}': {message}"))
}

fn as_f32(name: &str, value: &toml::Value) -> Result<f32> {
    match value {
        toml::Value::Float(f) => Ok(*f as f32),
        toml::Value::Integer(i) => Ok(*i as f32),
        other => Err(parse_error(name, format!("expected a number, got {}", other.type_str()))),
    }
}

/// Curve keys and gradient positions must be ordinary numbers
fn finite_f32(name: &str, value: &toml::Value) -> Result<f32> {
    let v = as_f32(name, value)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(parse_error(name, format!("{v} is not a finite position")))
    }
}

fn parse_pair(name: &str, value: &toml::Value) -> Result<[f32; 2]> {
    match value.as_array().map(Vec::as_slice) {
        Some([x, y]) => Ok([as_f32(name, x)?, as_f32(name, y)?]),
        _ => Err(parse_error(name, "expected a [x, y] pair")),
    }
}

fn parse_curve(name: &str, value: &toml::Value) -> Result<Curve> {
    let keys = value
        .as_array()
        .ok_or_else(|| parse_error(name, "curve must be an array of [x, y] keys"))?
        .iter()
        .map(|key| match key.as_array().map(Vec::as_slice) {
            Some([x, y]) => Ok([finite_f32(name, x)?, as_f32(name, y)?]),
            _ => Err(parse_error(name, "curve key must be [x, y]")),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Curve::new(keys))
}

fn parse_gradient(name: &str, value: &toml::Value) -> Result<Gradient> {
    let stops = value
        .as_array()
        .ok_or_else(|| parse_error(name, "gradient must be an array of [t, [r, g, b, a]] stops"))?
        .iter()
        .map(|stop| match stop.as_array().map(Vec::as_slice) {
            Some([t, color]) => {
                let channels = color
                    .as_array()
                    .filter(|c| c.len() == 4)
                    .ok_or_else(|| parse_error(name, "gradient color must be [r, g, b, a]"))?
                    .iter()
                    .map(|c| as_f32(name, c))
                    .collect::<Result<Vec<_>>>()?;
                Ok(GradientStop {
                    position: finite_f32(name, t)?,
                    color: Color::new(channels[0], channels[1], channels[2], channels[3]),
                })
            }
            _ => Err(parse_error(name, "gradient stop must be [t, [r, g, b, a]]")),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Gradient::new(stops))
}

fn parse_int(name: &str, i: i64) -> Result<i32> {
    i32::try_from(i).map_err(|_| parse_error(name, format!("{i} does not fit in 32 bits")))
}

/// A bare (non-table) value
fn parse_scalar(name: &str, value: &toml::Value) -> Result<ParamValue> {
    match value {
        toml::Value::Integer(i) => Ok(ParamValue::Int(parse_int(name, *i)?)),
        toml::Value::Float(f) => Ok(ParamValue::Float(*f as f32)),
        toml::Value::Boolean(b) => Ok(ParamValue::Bool(*b)),
        toml::Value::String(s) => {
            if let Some(resolved) = enum_value_by_name(name, s) {
                return resolved.map(ParamValue::Int);
            }
            if name == TEXTURE {
                return Ok(ParamValue::FilePath(PathBuf::from(s)));
            }
            Ok(ParamValue::String(s.clone()))
        }
        toml::Value::Array(_) => Ok(ParamValue::Vec2(Vec2::from_array(parse_pair(name, value)?))),
        other => Err(parse_error(name, format!("unsupported value type {}", other.type_str()))),
    }
}

fn parse_parameter(name: &str, value: &toml::Value) -> Result<Parameter> {
    let toml::Value::Table(table) = value else {
        return Ok(Parameter::new(parse_scalar(name, value)?));
    };

    if let Some(path) = table.get("path") {
        let path = path
            .as_str()
            .ok_or_else(|| parse_error(name, "path must be a string"))?;
        return Ok(Parameter::new(ParamValue::FilePath(PathBuf::from(path))));
    }
    if let Some(gradient) = table.get("gradient") {
        return Ok(Parameter::new(parse_gradient(name, gradient)?));
    }
    if let Some(curve) = table.get("curve") {
        return Ok(Parameter::new(parse_curve(name, curve)?));
    }
    if let Some(noise) = table.get("noise") {
        let noise: NoiseDescriptor = noise
            .clone()
            .try_into()
            .map_err(|e| parse_error(name, e))?;
        return Ok(Parameter::new(noise));
    }

    let base = table
        .get("value")
        .ok_or_else(|| parse_error(name, "table parameters need one of value, path, gradient, curve, noise"))?;
    let mut parameter = Parameter::new(parse_scalar(name, base)?);

    if let Some(random) = table.get("random") {
        let jitter = match (&parameter.value, parse_scalar(name, random)?) {
            (ParamValue::Float(_), ParamValue::Int(i)) => ParamValue::Float(i as f32),
            (_, jitter) => jitter,
        };
        parameter.parameters.insert(RANDOM.to_string(), Parameter::new(jitter));
    }
    if let Some(graph) = table.get("graph_emitter") {
        parameter
            .parameters
            .insert(GRAPH_EMITTER.to_string(), Parameter::new(parse_curve(name, graph)?));
    }
    if let Some(graph) = table.get("graph_particle") {
        parameter
            .parameters
            .insert(GRAPH_PARTICLE.to_string(), Parameter::new(parse_curve(name, graph)?));
    }
    Ok(parameter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::*;

    const SAMPLE: &str = r#"
[simulation]
max_emissions_per_frame = 250
quality_level = 1

[[effect]]
name = "campfire"
declaration = "Group"
id = 9001

[[effect.children]]
name = "flames"

[effect.children.parameters]
EmitterSpawnRate = 40
ParticleLife = { value = 1.2, random = 0.3 }
ParticleScale = { value = 1.0, graph_particle = [[0.0, 0.5], [1.0, 2.0]] }
BlendMode = "additive"
SortMode = "oldest_on_top"
EmitterLoop = 2
Texture = "fx/flame.png"
ParticleColor = { gradient = [[0.0, [1.0, 0.8, 0.2, 1.0]], [1.0, [1.0, 0.1, 0.0, 0.0]]] }
Wind = [3.0, -1.5]
Flicker = { noise = { base = 1.0, amplitude = 0.2, octaves = 3 } }

[[effect.children]]
name = "smoke"

[[effect]]
name = "spark"
[effect.parameters]
EmitterCount = { value = 10, random = 2 }
"#;

    #[test]
    fn simulation_table_is_read() {
        let table = DefinitionTable::from_toml_str(SAMPLE).unwrap();
        assert_eq!(table.simulation.max_emissions_per_frame, 250);
        assert_eq!(table.simulation.quality_level, 1);
        assert_eq!(table.simulation.initial_capacity, 64);
    }

    #[test]
    fn missing_simulation_table_uses_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.max_emissions_per_frame, 100);
    }

    #[test]
    fn effects_and_children_are_built() {
        let table = DefinitionTable::from_toml_str(SAMPLE).unwrap();
        assert_eq!(table.len(), 2);
        let campfire = table.get("campfire").unwrap();
        assert!(campfire.is_group());
        assert_eq!(campfire.id(), DefinitionId::from_raw(9001));
        assert_eq!(campfire.children.len(), 2);
        assert!(matches!(
            table.get("nope"),
            Err(PlumeError::DefinitionNotFound(_))
        ));
    }

    #[test]
    fn parameter_forms_are_parsed() {
        let table = DefinitionTable::from_toml_str(SAMPLE).unwrap();
        let flames = table.get("campfire").unwrap().find("flames").unwrap();

        assert_eq!(flames.float(EMITTER_SPAWN_RATE).unwrap(), 40.0);
        let life = flames.parameter(PARTICLE_LIFE).unwrap();
        assert_eq!(life.sub(RANDOM).unwrap().value, ParamValue::Float(0.3));
        assert!(flames
            .parameter(PARTICLE_SCALE)
            .unwrap()
            .sub(GRAPH_PARTICLE)
            .is_some());
        assert_eq!(
            flames.enum_value::<BlendMode>(BLEND_MODE).unwrap(),
            BlendMode::Additive
        );
        assert_eq!(
            flames.enum_value::<SortMode>(SORT_MODE).unwrap(),
            SortMode::OldestOnTop
        );
        assert_eq!(
            flames.enum_value::<LoopMode>(EMITTER_LOOP).unwrap(),
            LoopMode::Once
        );
        assert_eq!(
            flames.value(TEXTURE).unwrap(),
            &ParamValue::FilePath(PathBuf::from("fx/flame.png"))
        );
        assert_eq!(
            flames.value("Wind").unwrap().as_vec2("Wind").unwrap(),
            Vec2::new(3.0, -1.5)
        );
        let gradient = flames
            .value(PARTICLE_COLOR)
            .unwrap()
            .as_gradient(PARTICLE_COLOR)
            .unwrap();
        assert_eq!(gradient.stops().len(), 2);
        let noise = flames.value("Flicker").unwrap().as_noise("Flicker").unwrap();
        assert_eq!(noise.octaves, 3);
        assert_eq!(noise.scale, 1.0);
    }

    #[test]
    fn emitters_get_declaration_defaults() {
        let table = DefinitionTable::from_toml_str(SAMPLE).unwrap();
        let smoke = table.get("campfire").unwrap().find("smoke").unwrap();
        assert_eq!(smoke.float(EMITTER_SPAWN_RATE).unwrap(), 10.0);
        assert_eq!(smoke.float(PARTICLE_GRAVITY_SCALE).unwrap(), 1.0);

        let spark = table.get("spark").unwrap();
        let count = spark.parameter(EMITTER_COUNT).unwrap();
        assert_eq!(count.value, ParamValue::Int(10));
        assert_eq!(count.sub(RANDOM).unwrap().value, ParamValue::Int(2));
    }

    #[test]
    fn unknown_enum_name_is_rejected() {
        let source = r#"
[[effect]]
name = "bad"
[effect.parameters]
BlendMode = "multiply"
"#;
        assert!(matches!(
            DefinitionTable::from_toml_str(source),
            Err(PlumeError::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let source = r#"
[[effect]]
name = "a"
[[effect]]
name = "a"
"#;
        assert!(matches!(
            DefinitionTable::from_toml_str(source),
            Err(PlumeError::ParseError(_))
        ));
    }

    #[test]
    fn non_finite_curve_positions_are_rejected() {
        let curve = r#"
[[effect]]
name = "a"
[effect.parameters]
ParticleScale = { value = 1.0, graph_particle = [[-nan, 2.0], [1.0, 0.0]] }
"#;
        assert!(matches!(
            DefinitionTable::from_toml_str(curve),
            Err(PlumeError::ParseError(_))
        ));

        let gradient = r#"
[[effect]]
name = "a"
[effect.parameters]
ParticleColor = { gradient = [[inf, [1.0, 1.0, 1.0, 1.0]]] }
"#;
        assert!(matches!(
            DefinitionTable::from_toml_str(gradient),
            Err(PlumeError::ParseError(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_toml_error() {
        assert!(matches!(
            DefinitionTable::from_toml_str("[[effect]\nname ="),
            Err(PlumeError::TomlParseError(_))
        ));
    }
}
