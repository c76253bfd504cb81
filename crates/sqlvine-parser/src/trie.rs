//! Arena-backed prefix tree for longest-match keyword scanning.

use std::collections::HashMap;

pub(crate) type NodeId = usize;

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, NodeId>,
    terminal: bool,
}

/// Prefix tree over uppercased keys, stored as a flat arena. Built once per
/// dialect; lookups step one character at a time so the lexer can track the
/// longest terminal seen so far.
#[derive(Debug, Default)]
pub(crate) struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    pub(crate) fn from_keys<I, S>(keys: I) -> Trie
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Trie {
            nodes: vec![TrieNode::default()],
        };
        for key in keys {
            trie.insert(key.as_ref());
        }
        trie
    }

    fn insert(&mut self, key: &str) {
        let mut node = Trie::ROOT;
        for ch in key.chars() {
            node = match self.nodes[node].children.get(&ch) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(ch, next);
                    next
                }
            };
        }
        self.nodes[node].terminal = true;
    }

    pub(crate) const ROOT: NodeId = 0;

    pub(crate) fn step(&self, node: NodeId, ch: char) -> Option<NodeId> {
        self.nodes[node].children.get(&ch).copied()
    }

    pub(crate) fn is_terminal(&self, node: NodeId) -> bool {
        self.nodes[node].terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(trie: &Trie, key: &str) -> Option<NodeId> {
        let mut node = Trie::ROOT;
        for ch in key.chars() {
            node = trie.step(node, ch)?;
        }
        Some(node)
    }

    #[test]
    fn test_terminal_and_prefix() {
        let trie = Trie::from_keys(["GROUP BY", "::", ":="]);

        let group = walk(&trie, "GROUP").unwrap();
        assert!(!trie.is_terminal(group));
        let group_by = walk(&trie, "GROUP BY").unwrap();
        assert!(trie.is_terminal(group_by));

        assert!(trie.is_terminal(walk(&trie, "::").unwrap()));
        assert!(trie.is_terminal(walk(&trie, ":=").unwrap()));
        assert!(!trie.is_terminal(walk(&trie, ":").unwrap()));
    }

    #[test]
    fn test_miss() {
        let trie = Trie::from_keys(["--"]);
        assert!(walk(&trie, "-x").is_none());
        assert!(walk(&trie, "GROUP").is_none());
    }
}
