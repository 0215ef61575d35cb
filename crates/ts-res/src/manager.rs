//! The read-only, runtime-facing view over a `CompiledCollection`.
//!
//! Name-keyed lookups are rebuilt here rather than persisted: the
//! compiled collection stores only plain array indices, so every
//! qualifier/resource-type name index is reconstructed fresh from it.

use crate::collection::CompiledCollection;
use crate::error::{Error, Result};
use crate::qualifier::{Qualifier, QualifierType};
use crate::resource::ResourceType;
use crate::tree::{ResourceHandle, ResourceId, TreeView};
use fxhash::FxHashMap as HashMap;

/// An immutable, freely-shareable resolution target: the result of either
/// `ResourceManagerBuilder::compile` directly or `BundleLoader::load`.
/// Safe for concurrent readers without locks once constructed.
#[derive(Debug)]
pub struct ResourceManager {
    collection: CompiledCollection,
    qualifier_type_by_name: HashMap<String, usize>,
    qualifier_by_name: HashMap<String, usize>,
    qualifier_by_token: HashMap<String, usize>,
    resource_type_by_name: HashMap<String, usize>,
}

impl ResourceManager {
    pub fn from_collection(collection: CompiledCollection) -> Self {
        let qualifier_type_by_name = collection
            .qualifier_types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
        let qualifier_by_name = collection
            .qualifiers
            .iter()
            .enumerate()
            .map(|(i, q)| (q.name().to_string(), i))
            .collect();
        let qualifier_by_token = collection
            .qualifiers
            .iter()
            .enumerate()
            .filter_map(|(i, q)| q.token().map(|t| (t.to_string(), i)))
            .collect();
        let resource_type_by_name = collection
            .resource_types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
        Self {
            collection,
            qualifier_type_by_name,
            qualifier_by_name,
            qualifier_by_token,
            resource_type_by_name,
        }
    }

    pub fn collection(&self) -> &CompiledCollection {
        &self.collection
    }

    pub fn qualifier_type(&self, name: &str) -> Result<&QualifierType> {
        self.qualifier_type_by_name
            .get(name)
            .map(|&i| &self.collection.qualifier_types[i])
            .ok_or_else(|| Error::UnknownQualifierType(name.to_string()))
    }

    pub fn qualifier_by_name(&self, name: &str) -> Result<&Qualifier> {
        self.qualifier_by_name
            .get(name)
            .map(|&i| &self.collection.qualifiers[i])
            .ok_or_else(|| Error::UnknownQualifier(name.to_string()))
    }

    pub fn qualifier_by_name_or_token(&self, name_or_token: &str) -> Result<&Qualifier> {
        if let Some(&i) = self.qualifier_by_name.get(name_or_token) {
            return Ok(&self.collection.qualifiers[i]);
        }
        if let Some(&i) = self.qualifier_by_token.get(name_or_token) {
            return Ok(&self.collection.qualifiers[i]);
        }
        Err(Error::UnknownQualifier(name_or_token.to_string()))
    }

    pub fn resource_type(&self, name: &str) -> Result<&ResourceType> {
        self.resource_type_by_name
            .get(name)
            .map(|&i| &self.collection.resource_types[i])
            .ok_or_else(|| Error::UnknownResourceType(name.to_string()))
    }

    pub fn get_resource_handle(&self, id: &str) -> Result<ResourceHandle> {
        self.collection.tree.get_resource_handle(id)
    }

    pub fn get_resource_handle_parsed(&self, id: &ResourceId) -> Result<ResourceHandle> {
        self.collection.tree.get_resource_handle_parsed(id)
    }

    pub fn get_by_id(&self, id: &str) -> Result<TreeView<'_>> {
        self.collection.tree.get_by_id(id)
    }
}
