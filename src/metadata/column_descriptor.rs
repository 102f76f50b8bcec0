#[cfg(feature = "serde_types")]
use serde::{Deserialize, Serialize};

use crate::parquet_bridge::Repetition;
use crate::schema::types::{PhysicalType, PrimitiveType};

/// A descriptor of a parquet column. It contains the necessary information to
/// shred and encode a leaf column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_types", derive(Deserialize, Serialize))]
pub struct Descriptor {
    /// The [`PrimitiveType`] of this column
    pub primitive_type: PrimitiveType,

    /// The maximum definition level
    pub max_def_level: i16,

    /// The maximum repetition level
    pub max_rep_level: i16,
}

/// A descriptor for leaf-level primitive columns.
/// This encapsulates information such as definition and repetition levels and is used to
/// encode nested data.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde_types", derive(Deserialize, Serialize))]
pub struct ColumnDescriptor {
    /// The descriptor of this columns' leaf.
    pub descriptor: Descriptor,

    /// The path of this column. For instance, "a.b.c.d".
    pub path_in_schema: Vec<String>,
}

impl ColumnDescriptor {
    /// Creates new descriptor for leaf-level column.
    pub fn new(descriptor: Descriptor, path_in_schema: Vec<String>) -> Self {
        Self {
            descriptor,
            path_in_schema,
        }
    }

    /// The [`PhysicalType`] of the leaf.
    pub fn physical_type(&self) -> PhysicalType {
        self.descriptor.primitive_type.physical_type
    }

    /// The maximum definition level of the leaf.
    pub fn max_def_level(&self) -> i16 {
        self.descriptor.max_def_level
    }

    /// The maximum repetition level of the leaf.
    pub fn max_rep_level(&self) -> i16 {
        self.descriptor.max_rep_level
    }

    /// Whether the leaf itself is optional (it may be null even when all its
    /// ancestors are defined).
    pub fn is_optional(&self) -> bool {
        self.descriptor.primitive_type.field_info.repetition == Repetition::Optional
    }

    /// The dotted path of this column, used to look up per-column policies.
    pub fn path(&self) -> String {
        self.path_in_schema.join(".")
    }
}
