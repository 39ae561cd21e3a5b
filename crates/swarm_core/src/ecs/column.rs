// column.rs - Typed component columns behind a type-erased interface
//
// One column per component type per archetype. Row `i` of every column in an
// archetype belongs to the same entity.

use crate::ecs::{Component, ComponentId};
use std::any::Any;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error("column for component {component_id} holds a different Rust type")]
    TypeMismatch { component_id: ComponentId },

    #[error("row {row} out of bounds for column of length {len}")]
    RowOutOfBounds { row: usize, len: usize },
}

/// Object-safe view over a `TypedColumn<T>`.
pub trait Column: Send + Sync {
    fn component_id(&self) -> ComponentId;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `count` default-valued rows.
    fn push_default(&mut self, count: usize);

    /// Append `count` clones of the value at `row`.
    fn repeat_row(&mut self, row: usize, count: usize) -> Result<(), ColumnError>;

    /// Remove `row`, moving the last row into its place.
    fn swap_remove(&mut self, row: usize) -> Result<(), ColumnError>;

    /// Swap-remove `row` and append its value to `dst`.
    fn move_row(&mut self, row: usize, dst: &mut dyn Column) -> Result<(), ColumnError>;

    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense `Vec<T>` storage for one component type.
pub struct TypedColumn<T> {
    data: Vec<T>,
}

impl<T: Component> TypedColumn<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub(crate) fn boxed() -> Box<dyn Column> {
        Box::new(Self::new())
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.data.push(value);
    }

    fn check_row(&self, row: usize) -> Result<(), ColumnError> {
        if row >= self.data.len() {
            return Err(ColumnError::RowOutOfBounds {
                row,
                len: self.data.len(),
            });
        }
        Ok(())
    }
}

impl<T: Component> Default for TypedColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> Column for TypedColumn<T> {
    fn component_id(&self) -> ComponentId {
        T::ID
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn push_default(&mut self, count: usize) {
        self.data.resize_with(self.data.len() + count, T::default);
    }

    fn repeat_row(&mut self, row: usize, count: usize) -> Result<(), ColumnError> {
        self.check_row(row)?;
        let value = self.data[row].clone();
        self.data.reserve(count);
        self.data.extend(std::iter::repeat(value).take(count));
        Ok(())
    }

    fn swap_remove(&mut self, row: usize) -> Result<(), ColumnError> {
        self.check_row(row)?;
        self.data.swap_remove(row);
        Ok(())
    }

    fn move_row(&mut self, row: usize, dst: &mut dyn Column) -> Result<(), ColumnError> {
        self.check_row(row)?;
        let dst = dst
            .as_any_mut()
            .downcast_mut::<TypedColumn<T>>()
            .ok_or(ColumnError::TypeMismatch { component_id: T::ID })?;
        dst.data.push(self.data.swap_remove(row));
        Ok(())
    }

    fn clear(&mut self) {
        self.data.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
