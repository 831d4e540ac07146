//! CMDB entity schema
//!
//! The CMDB stores a fixed five-level hierarchy:
//! `provider -> service -> tenant -> {image, flavor}`. Each entity type
//! knows the data field holding its business key, the data field that
//! points at its parent, and which entity types hang below it.

use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::SyncError;

/// One of the closed set of CMDB entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum EntityType {
    Provider,
    Service,
    Tenant,
    Image,
    Flavor,
}

/// Static metadata for an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Data field that identifies the record within its parent scope
    pub business_key_field: &'static str,
    /// Data field holding the parent's CMDB id (none for the root)
    pub parent_ref_field: Option<&'static str>,
    /// Entity types nested directly below this one
    pub children: &'static [EntityType],
}

impl EntityType {
    /// Top of the hierarchy
    pub const ROOT: EntityType = EntityType::Provider;

    /// All entity types in hierarchy order
    pub const ALL: [EntityType; 5] = [
        EntityType::Provider,
        EntityType::Service,
        EntityType::Tenant,
        EntityType::Image,
        EntityType::Flavor,
    ];

    /// Schema entry for this entity type
    pub const fn schema(self) -> EntitySchema {
        match self {
            EntityType::Provider => EntitySchema {
                business_key_field: "name",
                parent_ref_field: None,
                children: &[EntityType::Service],
            },
            EntityType::Service => EntitySchema {
                business_key_field: "endpoint",
                parent_ref_field: Some("provider_id"),
                children: &[EntityType::Tenant],
            },
            EntityType::Tenant => EntitySchema {
                business_key_field: "tenant_id",
                parent_ref_field: Some("service"),
                children: &[EntityType::Image, EntityType::Flavor],
            },
            EntityType::Image => EntitySchema {
                business_key_field: "image_id",
                parent_ref_field: Some("tenant_id"),
                children: &[],
            },
            EntityType::Flavor => EntitySchema {
                business_key_field: "flavor_id",
                parent_ref_field: Some("tenant_id"),
                children: &[],
            },
        }
    }

    pub const fn business_key_field(self) -> &'static str {
        self.schema().business_key_field
    }

    pub const fn parent_ref_field(self) -> Option<&'static str> {
        self.schema().parent_ref_field
    }

    pub const fn children(self) -> &'static [EntityType] {
        self.schema().children
    }

    /// Field used to decide whether a record belongs to a scope.
    ///
    /// The root has no parent, so a provider is scoped by its own business key:
    /// provider "site-A" lives in scope "site-A".
    pub const fn scope_field(self) -> &'static str {
        match self.parent_ref_field() {
            Some(field) => field,
            None => self.business_key_field(),
        }
    }

    /// Entity type one level up, if any
    pub fn parent(self) -> Option<EntityType> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.children().contains(&self))
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    pub fn is_leaf(self) -> bool {
        self.children().is_empty()
    }

    /// Name used in the `type` field of CIP and CMDB documents
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityType::Provider => "provider",
            EntityType::Service => "service",
            EntityType::Tenant => "tenant",
            EntityType::Image => "image",
            EntityType::Flavor => "flavor",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|entity| entity.as_str() == s)
            .ok_or_else(|| SyncError::UnknownEntityType {
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for EntityType {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for EntityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A data field that names a sibling record by business key instead of by CMDB id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossReference {
    /// Entity type carrying the reference
    pub entity: EntityType,
    /// Data field holding the referenced business key
    pub field: &'static str,
    /// Entity type being referenced (shares the referencing record's parent)
    pub refers_to: EntityType,
}

/// Cross references rewritten to CMDB ids after reconciliation
pub const CROSS_REFERENCES: &[CrossReference] = &[
    // Child services point at their parent service by endpoint
    CrossReference {
        entity: EntityType::Service,
        field: "service_parent_id",
        refers_to: EntityType::Service,
    },
];
