//! The hierarchical resource namespace.
//!
//! Branches and leaves form a tree, not a DAG, so an arena of integer
//! handles is sufficient; there are no parent back-pointers to maintain.
//! Leaves store a `ResourceHandle` — a dense index into the compiled
//! collection's `resources` array — rather than owning the `Resource`
//! directly, so that array position stays the single source of truth
//! for "the handle": arrays are never reordered once emitted.

use crate::error::{Error, Result};

/// A syntactically valid dotted resource path, already split and
/// validated component-by-component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId(Vec<String>);

impl ResourceId {
    /// Validates and parses a dotted path string. Callers holding an
    /// already-parsed `ResourceId` use the tree's internal view
    /// directly instead of re-parsing.
    pub fn parse(id: &str) -> Result<ResourceId> {
        let parts: Vec<String> = id.split('.').map(str::to_string).collect();
        for p in &parts {
            if !crate::qualifier::is_valid_identifier(p) {
                return Err(Error::InvalidResourceName(p.clone()));
            }
        }
        Ok(ResourceId(parts))
    }

    pub fn as_str(&self) -> String {
        self.0.join(".")
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }
}

/// A dense index into a `CompiledCollection::resources` array.
pub type ResourceHandle = u32;

type NodeIdx = u32;

#[derive(Debug)]
enum Node {
    Branch(std::collections::BTreeMap<String, NodeIdx>),
    Leaf(ResourceHandle),
}

/// A read accessor into a resolved tree location.
pub enum TreeView<'a> {
    Leaf(ResourceHandle),
    Branch(Vec<&'a str>),
}

/// The tree of resources, keyed by dotted path.
#[derive(Debug)]
pub struct ResourceTree {
    arena: Vec<Node>,
    root: NodeIdx,
}

impl Default for ResourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTree {
    pub fn new() -> Self {
        Self {
            arena: vec![Node::Branch(Default::default())],
            root: 0,
        }
    }

    /// Inserts a resource handle at `id`, creating intermediate branches
    /// as needed. Fails with `PathConflict` if `id` collides with an
    /// existing leaf, or if inserting would require turning an existing
    /// leaf into a branch.
    pub fn insert(&mut self, id: &str, handle: ResourceHandle) -> Result<()> {
        let id = ResourceId::parse(id)?;
        self.insert_parsed(&id, handle)
    }

    pub fn insert_parsed(&mut self, id: &ResourceId, handle: ResourceHandle) -> Result<()> {
        let mut cur = self.root;
        let parts = id.components();
        for (i, part) in parts.iter().enumerate() {
            let is_last = i == parts.len() - 1;
            let next = match &self.arena[cur as usize] {
                Node::Leaf(_) => return Err(Error::PathConflict(id.as_str())),
                Node::Branch(children) => children.get(part).copied(),
            };
            cur = match next {
                Some(idx) => {
                    if is_last || matches!(self.arena[idx as usize], Node::Leaf(_)) {
                        return Err(Error::PathConflict(id.as_str()));
                    }
                    idx
                }
                None => {
                    let node = if is_last {
                        Node::Leaf(handle)
                    } else {
                        Node::Branch(Default::default())
                    };
                    let idx = self.arena.len() as NodeIdx;
                    self.arena.push(node);
                    if let Node::Branch(children) = &mut self.arena[cur as usize] {
                        children.insert(part.clone(), idx);
                    }
                    idx
                }
            };
            if is_last {
                return Ok(());
            }
        }
        Ok(())
    }

    fn descend(&self, id: &ResourceId) -> Result<NodeIdx> {
        let mut cur = self.root;
        for part in id.components() {
            cur = match &self.arena[cur as usize] {
                Node::Branch(children) => children
                    .get(part)
                    .copied()
                    .ok_or_else(|| Error::NotFound(id.as_str()))?,
                Node::Leaf(_) => return Err(Error::NotFound(id.as_str())),
            };
        }
        Ok(cur)
    }

    /// Looks up `id`, validating it syntactically first.
    pub fn get_by_id(&self, id: &str) -> Result<TreeView<'_>> {
        self.get_by_parsed_id(&ResourceId::parse(id)?)
    }

    pub fn get_by_parsed_id(&self, id: &ResourceId) -> Result<TreeView<'_>> {
        let idx = self.descend(id)?;
        Ok(match &self.arena[idx as usize] {
            Node::Leaf(h) => TreeView::Leaf(*h),
            Node::Branch(children) => {
                TreeView::Branch(children.keys().map(String::as_str).collect())
            }
        })
    }

    pub fn get_resource_handle(&self, id: &str) -> Result<ResourceHandle> {
        self.get_resource_handle_parsed(&ResourceId::parse(id)?)
    }

    pub fn get_resource_handle_parsed(&self, id: &ResourceId) -> Result<ResourceHandle> {
        let idx = self.descend(id)?;
        match &self.arena[idx as usize] {
            Node::Leaf(h) => Ok(*h),
            Node::Branch(_) => Err(Error::IsABranch(id.as_str())),
        }
    }

    pub fn get_branch(&self, id: &str) -> Result<Vec<&str>> {
        let id = ResourceId::parse(id)?;
        let idx = self.descend(&id)?;
        match &self.arena[idx as usize] {
            Node::Branch(children) => Ok(children.keys().map(String::as_str).collect()),
            Node::Leaf(_) => Err(Error::IsALeaf(id.as_str())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_and_lookup_round_trips() {
        let mut tree = ResourceTree::new();
        tree.insert("app.messages.welcome", 0).unwrap();
        assert!(tree.get_resource_handle("app.messages.welcome").is_ok());
        assert!(tree.get_branch("app.messages").is_ok());
        assert!(tree.get_branch("app").is_ok());
    }

    #[test]
    fn leaf_and_branch_at_same_path_conflict() {
        let mut tree = ResourceTree::new();
        tree.insert("app.messages.welcome", 0).unwrap();
        let err = tree.insert("app.messages", 1).unwrap_err();
        assert!(matches!(err, Error::PathConflict(_)));
    }

    #[test]
    fn branch_cannot_become_leaf() {
        let mut tree = ResourceTree::new();
        tree.insert("app.messages", 0).unwrap();
        let err = tree.insert("app.messages.welcome", 1).unwrap_err();
        assert!(matches!(err, Error::PathConflict(_)));
    }

    #[test]
    fn get_resource_on_branch_is_an_error() {
        let mut tree = ResourceTree::new();
        tree.insert("app.messages.welcome", 0).unwrap();
        assert!(matches!(
            tree.get_resource_handle("app.messages"),
            Err(Error::IsABranch(_))
        ));
        assert!(matches!(
            tree.get_branch("app.messages.welcome"),
            Err(Error::IsALeaf(_))
        ));
    }
}
