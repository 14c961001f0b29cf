//! Entity descriptors
//!
//! This module holds the boot-time data model: per-entity column lists,
//! backend dialect, and relation descriptors. Descriptors are parsed from
//! configuration once at startup and are read-only afterwards.

use crate::errors::PolyStoreError;
use config::{ColumnConfig, EntityConfig, RelationConfig};
use serde::{Deserialize, Serialize};

/// Backend dialect an entity is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    Document,
    Relational,
    ObjectStore,
}

impl Dialect {
    pub fn parse(s: &str) -> Result<Self, PolyStoreError> {
        match s {
            "document" => Ok(Dialect::Document),
            "relational" => Ok(Dialect::Relational),
            "object_store" | "objectstore" => Ok(Dialect::ObjectStore),
            other => Err(PolyStoreError::Configuration(format!(
                "unknown dialect '{other}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Document => "document",
            Dialect::Relational => "relational",
            Dialect::ObjectStore => "object_store",
        }
    }
}

/// Scalar kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    Id,
    String,
    Int,
    Float,
    Boolean,
    Timestamp,
    Date,
    Object,
    Array,
}

impl ScalarKind {
    pub fn parse(s: &str) -> Result<Self, PolyStoreError> {
        match s {
            "id" => Ok(ScalarKind::Id),
            "string" => Ok(ScalarKind::String),
            "int" => Ok(ScalarKind::Int),
            "float" => Ok(ScalarKind::Float),
            "boolean" => Ok(ScalarKind::Boolean),
            "timestamp" => Ok(ScalarKind::Timestamp),
            "date" => Ok(ScalarKind::Date),
            "object" => Ok(ScalarKind::Object),
            "array" => Ok(ScalarKind::Array),
            other => Err(PolyStoreError::Configuration(format!(
                "unknown scalar kind '{other}'"
            ))),
        }
    }
}

/// Relation multiplicity, parsed from the 3-character token ("1:1", "1:n",
/// "n:1"). The last character is the authoritative single-vs-list
/// discriminator at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
}

impl Cardinality {
    pub fn parse(token: &str) -> Result<Self, PolyStoreError> {
        match token {
            "1:1" => Ok(Cardinality::OneToOne),
            "1:n" => Ok(Cardinality::OneToMany),
            "n:1" => Ok(Cardinality::ManyToOne),
            other => Err(PolyStoreError::Configuration(format!(
                "unknown cardinality token '{other}'"
            ))),
        }
    }

    /// True when the relation resolves to a list ('n' discriminator).
    pub fn is_many(&self) -> bool {
        matches!(self, Cardinality::OneToMany)
    }
}

/// Relation descriptor attached to a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub foreign_entity: String,
    /// Column name on the other side of the relation.
    pub foreign_key: String,
    pub cardinality: Cardinality,
}

impl RelationSpec {
    fn from_config(config: &RelationConfig) -> Result<Self, PolyStoreError> {
        Ok(Self {
            foreign_entity: config.foreign_entity.clone(),
            foreign_key: config.foreign_key.clone(),
            cardinality: Cardinality::parse(&config.cardinality)?,
        })
    }
}

/// One column of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ScalarKind,
    pub nullable: bool,
    pub primary_key: bool,
    pub relation: Option<RelationSpec>,
}

impl ColumnDescriptor {
    fn from_config(config: &ColumnConfig) -> Result<Self, PolyStoreError> {
        Ok(Self {
            name: config.name.clone(),
            kind: ScalarKind::parse(&config.kind)?,
            nullable: config.nullable,
            primary_key: config.primary_key,
            relation: config
                .relation
                .as_ref()
                .map(RelationSpec::from_config)
                .transpose()?,
        })
    }
}

/// Boot-time description of one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub dialect: Dialect,
    pub columns: Vec<ColumnDescriptor>,
    /// Opaque metadata; never interpreted by the core.
    pub metadata: Option<serde_json::Value>,
}

impl EntityDescriptor {
    pub fn from_config(config: &EntityConfig) -> Result<Self, PolyStoreError> {
        let columns = config
            .columns
            .iter()
            .map(ColumnDescriptor::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        let metadata = config
            .metadata
            .as_ref()
            .map(|value| {
                serde_json::to_value(value).map_err(|e| {
                    PolyStoreError::Configuration(format!(
                        "unreadable metadata on entity '{}': {e}",
                        config.name
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            name: config.name.clone(),
            dialect: Dialect::parse(&config.dialect)?,
            columns,
            metadata,
        })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The primary-key column name; defaults to "id" when none is flagged.
    pub fn primary_key(&self) -> &str {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .unwrap_or("id")
    }
}
