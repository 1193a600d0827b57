//! Reply trees for a single thread.
//!
//! Nodes live in one arena indexed by position; parents hold child indices.
//! A post quoting several earlier posts is listed under *each* of them, so
//! the structure is a DAG that renders as a tree with that post shown once
//! per parent. This duplication is intended.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    comment::{self, Comment},
    post::{Post, PostNo},
};

#[derive(Clone, Debug)]
pub struct ReplyNode {
    pub post: Post,
    pub comment: Comment,
    children: Vec<usize>,
    parents: usize,
}

impl ReplyNode {
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parents == 0
    }

    /// Whether the post takes part in a conversation, either by quoting or
    /// by being quoted.
    pub fn is_reply(&self) -> bool {
        !self.is_leaf() || self.comment.references().next().is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReplyTree {
    nodes: Vec<ReplyNode>,
    index: HashMap<PostNo, usize>,
    roots: Vec<usize>,
}

impl ReplyTree {
    /// Builds the tree from posts in thread order; `posts[0]` is the OP.
    pub fn build(posts: Vec<Post>) -> ReplyTree {
        let mut tree = ReplyTree {
            nodes: Vec::with_capacity(posts.len()),
            index: HashMap::with_capacity(posts.len()),
            roots: vec![],
        };
        for post in posts {
            let comment = comment::sanitize(post.com.as_deref());
            let idx = tree.nodes.len();
            let no = post.no;

            let mut parents: Vec<usize> = vec![];
            if idx != 0 {
                for target in comment.references() {
                    // Only posts seen so far resolve, which also rules out
                    // self references and keeps the graph acyclic.
                    // Quoting the same post twice attaches twice.
                    match tree.index.get(&target) {
                        Some(&parent) => parents.push(parent),
                        None => debug!("Post {} quotes unknown post {}", no, target),
                    }
                }
            }

            tree.nodes.push(ReplyNode {
                post,
                comment,
                children: vec![],
                parents: parents.len(),
            });
            tree.index.entry(no).or_insert(idx);

            if parents.is_empty() {
                tree.roots.push(idx);
            }
            for parent in parents {
                tree.nodes[parent].children.push(idx);
            }
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn op(&self) -> Option<&ReplyNode> {
        self.nodes.first()
    }

    pub fn roots(&self) -> impl Iterator<Item = &ReplyNode> {
        self.roots.iter().map(move |&idx| &self.nodes[idx])
    }

    pub fn get(&self, idx: usize) -> Option<&ReplyNode> {
        self.nodes.get(idx)
    }

    pub fn node(&self, no: PostNo) -> Option<&ReplyNode> {
        self.index.get(&no).map(|&idx| &self.nodes[idx])
    }

    /// The sanitized body of a post, as shown in the thread and in popups.
    pub fn comment(&self, no: PostNo) -> Option<&Comment> {
        self.node(no).map(|node| &node.comment)
    }

    pub fn children_of(&self, no: PostNo) -> Vec<&ReplyNode> {
        self.node(no)
            .map(|node| node.children.iter().map(|&idx| &self.nodes[idx]).collect())
            .unwrap_or_default()
    }

    /// Depth-first render order as `(depth, node)` pairs.
    pub fn walk(&self) -> Vec<(usize, &ReplyNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&idx| (0, idx)).collect();
        while let Some((depth, idx)) = stack.pop() {
            let node = &self.nodes[idx];
            out.push((depth, node));
            stack.extend(node.children.iter().rev().map(|&child| (depth + 1, child)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::post;

    fn quote(nos: &[PostNo]) -> String {
        nos.iter()
            .map(|no| format!("<a href=\"#p{no}\" class=\"quotelink\">&gt;&gt;{no}</a>"))
            .collect::<Vec<_>>()
            .join("<br>")
    }

    fn nos<'a>(nodes: impl IntoIterator<Item = &'a ReplyNode>) -> Vec<PostNo> {
        nodes.into_iter().map(|n| n.post.no).collect()
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_op_is_first_root_even_when_quoting() {
        let posts = vec![
            post(100, Some(&quote(&[101]))),
            post(101, Some(&quote(&[100]))),
            post(102, Some("no quotes")),
        ];
        let tree = ReplyTree::build(posts);
        assert_eq!(nos(tree.roots()), vec![100, 102]);
        assert_eq!(nos(tree.children_of(100)), vec![101]);
        assert!(tree.op().unwrap().is_root());
    }

    #[test]
    fn test_multi_parent_post_listed_under_each_parent() {
        let posts = vec![
            post(1, None),
            post(2, Some("a")),
            post(3, Some("b")),
            post(4, Some(&format!("{}<br>both of you", quote(&[2, 3])))),
        ];
        let tree = ReplyTree::build(posts);
        assert_eq!(nos(tree.roots()), vec![1, 2, 3]);
        assert_eq!(nos(tree.children_of(2)), vec![4]);
        assert_eq!(nos(tree.children_of(3)), vec![4]);
        let walked: Vec<_> = tree.walk().into_iter().map(|(d, n)| (d, n.post.no)).collect();
        assert_eq!(walked, vec![(0, 1), (0, 2), (1, 4), (0, 3), (1, 4)]);
    }

    #[test]
    fn test_unresolved_and_self_references_make_roots() {
        let posts = vec![
            post(1, None),
            post(2, Some(&quote(&[2]))),
            post(3, Some(&quote(&[4]))),
            post(4, Some(&quote(&[9999]))),
            post(5, Some(&quote(&[9999, 1]))),
        ];
        let tree = ReplyTree::build(posts);
        assert_eq!(nos(tree.roots()), vec![1, 2, 3, 4]);
        assert_eq!(nos(tree.children_of(1)), vec![5]);
        assert!(tree.children_of(2).is_empty());
    }

    #[test]
    fn test_children_keep_thread_order_and_nest() {
        let posts = vec![
            post(1, None),
            post(2, Some(&quote(&[1]))),
            post(3, Some(&quote(&[2]))),
            post(4, Some(&quote(&[1, 1]))),
        ];
        let tree = ReplyTree::build(posts);
        assert_eq!(nos(tree.children_of(1)), vec![2, 4, 4]);
        let walked: Vec<_> = tree
            .walk()
            .into_iter()
            .map(|(d, n)| (d, n.post.no))
            .collect();
        assert_eq!(walked, vec![(0, 1), (1, 2), (2, 3), (1, 4), (1, 4)]);
        assert!(tree.node(3).unwrap().is_reply());
        assert!(tree.node(1).unwrap().is_reply());
    }

    #[test]
    fn test_inline_quote_does_not_nest() {
        let posts = vec![post(1, None), post(2, Some("I agree with &gt;&gt;1"))];
        let tree = ReplyTree::build(posts);
        assert_eq!(nos(tree.roots()), vec![1, 2]);
        assert_eq!(tree.comment(2).unwrap().references().count(), 0);
    }

    #[test]
    fn test_quoting_same_post_twice_attaches_twice() {
        let posts = vec![post(1, None), post(2, Some("&gt;&gt;1<br>&gt;&gt;1"))];
        let tree = ReplyTree::build(posts);
        assert_eq!(nos(tree.children_of(1)), vec![2, 2]);
        assert_eq!(nos(tree.roots()), vec![1]);
        assert!(!tree.node(2).unwrap().is_root());
    }
}
