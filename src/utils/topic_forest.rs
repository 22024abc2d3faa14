// src/utils/topic_forest.rs

//! In-memory view of the topic taxonomy.
//!
//! Nodes live in an arena keyed by topic id; parent links are kept in a
//! separate index so that no node owns another. The store loads the whole
//! forest before a parent change and asks it whether the change would close
//! a cycle, since the database only checks that the parent exists.

use std::collections::{HashMap, HashSet};

use crate::models::topic::{Topic, TopicNode};

#[derive(Debug, Default)]
pub struct TopicForest {
    nodes: HashMap<i64, Topic>,
    parent_of: HashMap<i64, i64>,
    children_of: HashMap<i64, Vec<i64>>,
}

impl TopicForest {
    pub fn new(topics: impl IntoIterator<Item = Topic>) -> Self {
        let mut forest = Self::default();
        for topic in topics {
            if let Some(parent) = topic.parent_id {
                forest.parent_of.insert(topic.id, parent);
                forest.children_of.entry(parent).or_default().push(topic.id);
            }
            forest.nodes.insert(topic.id, topic);
        }
        for children in forest.children_of.values_mut() {
            children.sort_unstable();
        }
        forest
    }

    pub fn contains(&self, id: i64) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Walks from `id` up to its root, nearest ancestor first.
    /// Stops if the stored links already contain a loop.
    pub fn ancestors(&self, id: i64) -> Vec<i64> {
        let mut seen = HashSet::from([id]);
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(&parent) = self.parent_of.get(&current) {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Every topic below `id`, in breadth-first order.
    pub fn descendants(&self, id: i64) -> Vec<i64> {
        let mut out = Vec::new();
        let mut queue = std::collections::VecDeque::from([id]);
        let mut seen = HashSet::from([id]);
        while let Some(current) = queue.pop_front() {
            for &child in self.children_of.get(&current).into_iter().flatten() {
                if seen.insert(child) {
                    out.push(child);
                    queue.push_back(child);
                }
            }
        }
        out
    }

    /// True if making `new_parent` the parent of `id` would make `id` its
    /// own ancestor.
    pub fn would_create_cycle(&self, id: i64, new_parent: i64) -> bool {
        new_parent == id || self.ancestors(new_parent).contains(&id)
    }

    /// Nested representation, roots and siblings ordered by id.
    pub fn tree(&self) -> Vec<TopicNode> {
        let mut roots: Vec<i64> = self
            .nodes
            .values()
            .filter(|t| match t.parent_id {
                None => true,
                // Orphaned links are shown as roots rather than dropped.
                Some(parent) => !self.nodes.contains_key(&parent),
            })
            .map(|t| t.id)
            .collect();
        roots.sort_unstable();

        let mut visited = HashSet::new();
        roots
            .into_iter()
            .filter_map(|id| self.build_node(id, &mut visited))
            .collect()
    }

    fn build_node(&self, id: i64, visited: &mut HashSet<i64>) -> Option<TopicNode> {
        if !visited.insert(id) {
            return None;
        }
        let topic = self.nodes.get(&id)?;
        let children = self
            .children_of
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|&child| self.build_node(child, visited))
            .collect();
        Some(TopicNode {
            id: topic.id,
            name: topic.name.clone(),
            slug: topic.slug.clone(),
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: i64, parent_id: Option<i64>) -> Topic {
        Topic {
            id,
            name: format!("Topic {id}"),
            slug: format!("topic-{id}"),
            parent_id,
            created_at: chrono::Utc::now(),
        }
    }

    // 1 ── 2 ── 4
    //  └── 3
    // 5
    fn sample() -> TopicForest {
        TopicForest::new(vec![
            topic(1, None),
            topic(2, Some(1)),
            topic(3, Some(1)),
            topic(4, Some(2)),
            topic(5, None),
        ])
    }

    #[test]
    fn ancestors_walk_to_root() {
        let forest = sample();
        assert_eq!(forest.ancestors(4), vec![2, 1]);
        assert!(forest.ancestors(5).is_empty());
    }

    #[test]
    fn descendants_include_grandchildren() {
        let forest = sample();
        assert_eq!(forest.descendants(1), vec![2, 3, 4]);
        assert!(forest.descendants(4).is_empty());
    }

    #[test]
    fn reparenting_under_a_descendant_is_a_cycle() {
        let forest = sample();
        assert!(forest.would_create_cycle(1, 4));
        assert!(forest.would_create_cycle(2, 2));
        assert!(!forest.would_create_cycle(3, 4));
        assert!(!forest.would_create_cycle(1, 5));
    }

    #[test]
    fn tree_nests_children_under_parents() {
        let tree = sample().tree();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, 1);
        let child_ids: Vec<i64> = tree[0].children.iter().map(|c| c.id).collect();
        assert_eq!(child_ids, vec![2, 3]);
        assert_eq!(tree[0].children[0].children[0].id, 4);
        assert_eq!(tree[1].id, 5);
    }

    #[test]
    fn corrupt_loop_does_not_hang() {
        let forest = TopicForest::new(vec![topic(1, Some(2)), topic(2, Some(1))]);
        assert_eq!(forest.ancestors(1), vec![2]);
        assert!(forest.tree().is_empty());
    }
}
