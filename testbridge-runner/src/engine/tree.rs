// Copyright (c) The testbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::engine::TestName;
use indexmap::IndexMap;
use std::{borrow::Cow, collections::HashMap, fmt};

/// The property key under which the engine stores a node's categories.
pub const CATEGORIES_PROPERTY: &str = "_CATEGORIES";

/// The unique name the engine assigns to a node in its test tree.
///
/// Unique names are stable for the lifetime of an execution context and are used to correlate
/// lifecycle events with discovered nodes.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct UniqueName(String);

impl UniqueName {
    /// Creates a new unique name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the unique name as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a node is a suite (containing other nodes) or a leaf test.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum TestKind {
    /// A suite: an assembly, namespace or fixture.
    Suite,

    /// A leaf test.
    Test,
}

/// The value of a property attached to a node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PropertyValue {
    /// A single value.
    Text(String),

    /// A list of values, such as the categories of a node.
    List(Vec<String>),
}

impl PropertyValue {
    /// Iterates over the individual values in this property.
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        let values: &[String] = match self {
            Self::Text(value) => std::slice::from_ref(value),
            Self::List(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::List(values) => f.write_str(&values.join(",")),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The index of a node within a [`TestTree`].
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct NodeIndex(usize);

#[derive(Clone, Debug)]
struct NodeData {
    unique_name: UniqueName,
    name: String,
    full_name: String,
    kind: TestKind,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    properties: IndexMap<String, PropertyValue>,
}

/// The tree of tests discovered by the engine in one assembly.
///
/// The root of the tree is always a suite representing the assembly itself. Nodes only refer to
/// their parents by index, so the tree cannot contain cycles.
///
/// A `TestTree` is created with a [`TestTreeBuilder`] and is read-only afterwards.
#[derive(Clone, Debug)]
pub struct TestTree {
    nodes: Vec<NodeData>,
    by_unique_name: HashMap<UniqueName, NodeIndex>,
}

impl TestTree {
    /// Returns the root of the tree.
    pub fn root(&self) -> TestNodeRef<'_> {
        TestNodeRef {
            tree: self,
            index: NodeIndex(0),
        }
    }

    /// Returns the node at the given index.
    ///
    /// # Panics
    ///
    /// Panics if the index was produced by a different tree.
    pub fn node(&self, index: NodeIndex) -> TestNodeRef<'_> {
        assert!(index.0 < self.nodes.len(), "node index out of range");
        TestNodeRef { tree: self, index }
    }

    /// Looks up a node by its unique name.
    pub fn get(&self, unique_name: &UniqueName) -> Option<TestNodeRef<'_>> {
        self.by_unique_name
            .get(unique_name)
            .map(|&index| self.node(index))
    }

    /// Returns the total number of nodes, suites included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree only contains its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Returns the number of leaf tests in the tree.
    pub fn test_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.kind == TestKind::Test)
            .count()
    }

    /// Iterates over the leaf tests in depth-first order.
    pub fn leaves(&self) -> impl Iterator<Item = TestNodeRef<'_>> + '_ {
        self.root().descendants().filter(|node| !node.is_suite())
    }

    fn data(&self, index: NodeIndex) -> &NodeData {
        &self.nodes[index.0]
    }
}

/// A reference to a node within a [`TestTree`].
#[derive(Copy, Clone)]
pub struct TestNodeRef<'a> {
    tree: &'a TestTree,
    index: NodeIndex,
}

impl<'a> TestNodeRef<'a> {
    /// Returns the index of this node within its tree.
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// Returns the unique name of this node.
    pub fn unique_name(&self) -> &'a UniqueName {
        &self.data().unique_name
    }

    /// Returns the short name of this node.
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Returns the full name the engine assigned to this node.
    pub fn full_name(&self) -> &'a str {
        &self.data().full_name
    }

    /// Returns the kind of this node.
    pub fn kind(&self) -> TestKind {
        self.data().kind
    }

    /// Returns true if this node is a suite.
    pub fn is_suite(&self) -> bool {
        self.kind() == TestKind::Suite
    }

    /// Returns the properties attached to this node, in insertion order.
    pub fn properties(&self) -> &'a IndexMap<String, PropertyValue> {
        &self.data().properties
    }

    /// Returns the parent of this node, or `None` for the root.
    pub fn parent(&self) -> Option<TestNodeRef<'a>> {
        self.data().parent.map(|index| self.tree.node(index))
    }

    /// Iterates over the direct children of this node.
    pub fn children(&self) -> impl Iterator<Item = TestNodeRef<'a>> + 'a {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&index| tree.node(index))
    }

    /// Iterates over this node and all its descendants, depth-first.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants {
            tree: self.tree,
            stack: vec![self.index],
        }
    }

    /// Iterates over the ancestors of this node, nearest first. The node itself is not included.
    pub fn ancestors(&self) -> impl Iterator<Item = TestNodeRef<'a>> + 'a {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// Returns the full name of the suite enclosing this node, if any.
    pub fn class_name(&self) -> Option<&'a str> {
        self.parent().map(|parent| parent.full_name())
    }

    /// Returns the fully qualified name of this node.
    ///
    /// For a leaf test this is `<enclosing-suite-path>.<leaf-name>`. For suites and for tests
    /// directly under the root, the engine's full name is returned.
    pub fn fully_qualified_name(&self) -> Cow<'a, str> {
        match self.parent() {
            Some(parent) if !self.is_suite() && parent.parent().is_some() => {
                Cow::Owned(format!("{}.{}", parent.full_name(), self.name()))
            }
            _ => Cow::Borrowed(self.full_name()),
        }
    }

    /// Returns the name under which the engine reports events for this node.
    pub fn test_name(&self) -> TestName {
        TestName {
            unique_name: self.unique_name().clone(),
            full_name: self.full_name().to_owned(),
            name: self.name().to_owned(),
        }
    }

    fn data(&self) -> &'a NodeData {
        self.tree.data(self.index)
    }
}

impl fmt::Debug for TestNodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestNodeRef")
            .field("unique_name", self.unique_name())
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

/// A depth-first iterator over a node and its descendants.
///
/// Returned by [`TestNodeRef::descendants`].
#[derive(Clone, Debug)]
pub struct Descendants<'a> {
    tree: &'a TestTree,
    stack: Vec<NodeIndex>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = TestNodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        // Push in reverse so that children are visited in declaration order.
        self.stack
            .extend(self.tree.data(index).children.iter().rev().copied());
        Some(self.tree.node(index))
    }
}

/// Builds a [`TestTree`].
///
/// Engines use this to describe what they discovered in an assembly.
#[derive(Clone, Debug)]
pub struct TestTreeBuilder {
    nodes: Vec<NodeData>,
}

impl TestTreeBuilder {
    /// The first numeric identifier handed out to nodes.
    const FIRST_ID: usize = 1000;

    /// Creates a new builder whose root suite is named after the assembly.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root_name = root_name.into();
        let mut builder = Self { nodes: Vec::new() };
        builder.push(root_name.clone(), root_name, TestKind::Suite, None);
        builder
    }

    /// Returns the index of the root suite.
    pub fn root(&self) -> NodeIndex {
        NodeIndex(0)
    }

    /// Adds a suite under `parent`.
    pub fn add_suite(&mut self, parent: NodeIndex, name: impl Into<String>) -> NodeIndex {
        self.add_child(parent, name.into(), TestKind::Suite)
    }

    /// Adds a leaf test under `parent`.
    pub fn add_test(&mut self, parent: NodeIndex, name: impl Into<String>) -> NodeIndex {
        self.add_child(parent, name.into(), TestKind::Test)
    }

    /// Sets a property on a node, replacing any existing value.
    pub fn set_property(
        &mut self,
        node: NodeIndex,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> &mut Self {
        self.nodes[node.0]
            .properties
            .insert(key.into(), value.into());
        self
    }

    /// Adds a category to a node.
    pub fn add_category(&mut self, node: NodeIndex, category: impl Into<String>) -> &mut Self {
        let properties = &mut self.nodes[node.0].properties;
        let category = category.into();
        match properties.get_mut(CATEGORIES_PROPERTY) {
            Some(PropertyValue::List(categories)) => categories.push(category),
            Some(value @ PropertyValue::Text(_)) => {
                let existing = value.to_string();
                *value = PropertyValue::List(vec![existing, category]);
            }
            None => {
                properties.insert(
                    CATEGORIES_PROPERTY.to_owned(),
                    PropertyValue::List(vec![category]),
                );
            }
        }
        self
    }

    /// Finishes building the tree.
    pub fn build(self) -> TestTree {
        let by_unique_name = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.unique_name.clone(), NodeIndex(index)))
            .collect();
        TestTree {
            nodes: self.nodes,
            by_unique_name,
        }
    }

    fn add_child(&mut self, parent: NodeIndex, name: String, kind: TestKind) -> NodeIndex {
        let parent_data = &self.nodes[parent.0];
        debug_assert_eq!(
            parent_data.kind,
            TestKind::Suite,
            "only suites can have children"
        );
        // Children of the assembly root are named by themselves: the assembly path is not part
        // of any test's full name.
        let full_name = if parent_data.parent.is_none() {
            name.clone()
        } else {
            format!("{}.{}", parent_data.full_name, name)
        };
        let index = self.push(name, full_name, kind, Some(parent));
        self.nodes[parent.0].children.push(index);
        index
    }

    fn push(
        &mut self,
        name: String,
        full_name: String,
        kind: TestKind,
        parent: Option<NodeIndex>,
    ) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        let unique_name = UniqueName::new(format!(
            "[0-{}]{}",
            Self::FIRST_ID + index.0,
            full_name
        ));
        self.nodes.push(NodeData {
            unique_name,
            name,
            full_name,
            kind,
            parent,
            children: Vec::new(),
            properties: IndexMap::new(),
        });
        index
    }
}
