//! Structure-of-arrays particle storage.
//!
//! Every particle attribute lives in its own column; slot `i` of each
//! column belongs to particle `i`. Columns are registered by name and
//! element type at runtime and addressed afterwards through typed
//! [`Column`] handles, so the simulator and consumers can add attributes
//! without the store knowing about them up front.

use plume_core::{PlumeError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Capacity multiplier applied by [`AttributeStore::resize`]
pub const GROWTH_FACTOR: f32 = 1.5;

/// Element types storable in a column
pub trait Attribute: Copy + Default + Send + Sync + 'static {}

impl<T: Copy + Default + Send + Sync + 'static> Attribute for T {}

/// Typed handle to a registered column
pub struct Column<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<T> {}

impl<T> PartialEq for Column<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column<{}>({})", std::any::type_name::<T>(), self.index)
    }
}

/// Shift `data[start..end]` one slot toward `end` (or the mirror when
/// `start > end`). The value at `end` is overwritten and slot `start`
/// keeps its old value, ready to be written by the caller.
pub(crate) fn shuffle_slice<T: Copy>(data: &mut [T], start: usize, end: usize) {
    if start < end {
        data.copy_within(start..end, start + 1);
    } else if start > end {
        data.copy_within(end + 1..=start, end);
    }
}

trait ErasedColumn: Send + Sync {
    fn grow_to(&mut self, len: usize);
    fn move_slot(&mut self, from: usize, to: usize);
    fn shuffle(&mut self, start: usize, end: usize);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Attribute> ErasedColumn for Vec<T> {
    fn grow_to(&mut self, len: usize) {
        Vec::resize(self, len, T::default());
    }

    fn move_slot(&mut self, from: usize, to: usize) {
        self[to] = self[from];
    }

    fn shuffle(&mut self, start: usize, end: usize) {
        shuffle_slice(self, start, end);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct NamedColumn {
    name: String,
    type_name: &'static str,
    data: Box<dyn ErasedColumn>,
}

/// Named, typed, equally sized columns plus the active-particle count
pub struct AttributeStore {
    columns: Vec<NamedColumn>,
    by_name: HashMap<String, usize>,
    max_particles: usize,
    active_particles: usize,
}

impl AttributeStore {
    pub fn new(max_particles: usize) -> Self {
        Self {
            columns: Vec::new(),
            by_name: HashMap::new(),
            max_particles,
            active_particles: 0,
        }
    }

    /// Register a new column sized to the current capacity
    pub fn register<T: Attribute>(&mut self, name: &str) -> Result<Column<T>> {
        if self.by_name.contains_key(name) {
            return Err(PlumeError::AttributeAlreadyRegistered(name.to_string()));
        }
        let index = self.columns.len();
        self.columns.push(NamedColumn {
            name: name.to_string(),
            type_name: std::any::type_name::<T>(),
            data: Box::new(vec![T::default(); self.max_particles]),
        });
        self.by_name.insert(name.to_string(), index);
        Ok(Column {
            index,
            _marker: PhantomData,
        })
    }

    /// Look up a previously registered column by name and element type
    pub fn get<T: Attribute>(&self, name: &str) -> Result<Column<T>> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| PlumeError::AttributeNotFound(name.to_string()))?;
        let entry = &self.columns[index];
        if !entry.data.as_any().is::<Vec<T>>() {
            return Err(PlumeError::AttributeTypeMismatch {
                name: entry.name.clone(),
                expected: std::any::type_name::<T>().to_string(),
            });
        }
        Ok(Column {
            index,
            _marker: PhantomData,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    fn mismatch<T>(&self, index: usize) -> PlumeError {
        match self.columns.get(index) {
            Some(entry) => PlumeError::AttributeTypeMismatch {
                name: entry.name.clone(),
                expected: std::any::type_name::<T>().to_string(),
            },
            None => PlumeError::AttributeNotFound(format!("column #{index}")),
        }
    }

    /// Full column contents, `max_particles` long
    pub fn column<T: Attribute>(&self, column: Column<T>) -> Result<&[T]> {
        self.columns
            .get(column.index)
            .and_then(|entry| entry.data.as_any().downcast_ref::<Vec<T>>())
            .map(Vec::as_slice)
            .ok_or_else(|| self.mismatch::<T>(column.index))
    }

    pub fn column_mut<T: Attribute>(&mut self, column: Column<T>) -> Result<&mut [T]> {
        let typed = self
            .columns
            .get(column.index)
            .is_some_and(|entry| entry.data.as_any().is::<Vec<T>>());
        if !typed {
            return Err(self.mismatch::<T>(column.index));
        }
        self.columns[column.index]
            .data
            .as_any_mut()
            .downcast_mut::<Vec<T>>()
            .map(Vec::as_mut_slice)
            .ok_or_else(|| PlumeError::AttributeNotFound(format!("column #{}", column.index)))
    }

    pub fn value<T: Attribute>(&self, column: Column<T>, index: usize) -> Result<T> {
        Ok(self.column(column)?[index])
    }

    pub fn set<T: Attribute>(&mut self, column: Column<T>, index: usize, value: T) -> Result<()> {
        self.column_mut(column)?[index] = value;
        Ok(())
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    pub fn active_particles(&self) -> usize {
        self.active_particles
    }

    pub fn set_active_particles(&mut self, active: usize) {
        debug_assert!(active <= self.max_particles);
        self.active_particles = active.min(self.max_particles);
    }

    /// Grow every column to `max`. Capacity never shrinks.
    pub fn set_max_particles(&mut self, max: usize) -> Result<()> {
        if max < self.max_particles {
            return Err(PlumeError::InvalidCapacity {
                current: self.max_particles,
                requested: max,
            });
        }
        self.grow_to(max);
        Ok(())
    }

    fn grow_to(&mut self, max: usize) {
        for entry in &mut self.columns {
            entry.data.grow_to(max);
        }
        self.max_particles = max;
    }

    /// Grow capacity by [`GROWTH_FACTOR`], always by at least one slot
    pub fn resize(&mut self) {
        let grown = (self.max_particles as f32 * GROWTH_FACTOR).round() as usize;
        let target = grown.max(self.max_particles + 1);
        log::debug!(
            "growing particle storage {} -> {}",
            self.max_particles,
            target
        );
        self.grow_to(target);
    }

    /// Copy slot `from` over slot `to` in every column
    pub fn move_slot(&mut self, from: usize, to: usize) {
        for entry in &mut self.columns {
            entry.data.move_slot(from, to);
        }
    }

    /// Shift slots between `start` and `end` by one in every column
    pub fn shuffle(&mut self, start: usize, end: usize) {
        for entry in &mut self.columns {
            entry.data.shuffle(start, end);
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names with their element type names, in registration order
    pub fn describe(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.columns
            .iter()
            .map(|entry| (entry.name.as_str(), entry.type_name))
    }
}

impl fmt::Debug for AttributeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeStore")
            .field("columns", &self.describe().collect::<Vec<_>>())
            .field("max_particles", &self.max_particles)
            .field("active_particles", &self.active_particles)
            .finish()
    }
}
