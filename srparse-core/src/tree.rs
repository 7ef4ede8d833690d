//! Partial and gold constituency trees
//!
//! Trees are immutable and reference counted, so a node built by one
//! transition can be shared by every hypothesis that descends from it.
//! Binarization artifacts carry the `@` label prefix and are called
//! temporary nodes.

use std::fmt;
use std::sync::Arc;

use crate::error::{CoreError, Result};

/// Interned-ish label type shared across trees and transitions
pub type Label = Arc<str>;

/// Prefix marking a temporary node introduced by binarization
pub const TEMPORARY_PREFIX: char = '@';

/// Returns true if `label` names a temporary node
pub fn is_temporary_label(label: &str) -> bool {
    label.starts_with(TEMPORARY_PREFIX)
}

/// Strips the temporary prefix, if any
pub fn base_label(label: &str) -> &str {
    label.strip_prefix(TEMPORARY_PREFIX).unwrap_or(label)
}

/// Builds the temporary form of `label`
pub fn temporary_label(label: &str) -> Label {
    Arc::from(format!("{TEMPORARY_PREFIX}{}", base_label(label)))
}

/// Which child of a binary node carries the head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// Head comes from the left child
    Left,
    /// Head comes from the right child
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "LEFT"),
            Side::Right => write!(f, "RIGHT"),
        }
    }
}

/// A word together with its part-of-speech tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaggedWord {
    /// Surface form
    pub word: Label,
    /// Part-of-speech tag
    pub tag: Label,
}

impl TaggedWord {
    /// Creates a tagged word
    pub fn new(word: &str, tag: &str) -> Self {
        Self {
            word: Arc::from(word),
            tag: Arc::from(tag),
        }
    }
}

/// Inclusive token span `[left, right]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    /// First token covered
    pub left: usize,
    /// Last token covered
    pub right: usize,
}

impl Span {
    /// Creates a span
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    /// Number of tokens covered
    pub fn len(&self) -> usize {
        self.right + 1 - self.left
    }

    /// Spans always cover at least one token
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug)]
enum Children {
    Preterminal { word: Label },
    Unary(Tree),
    Binary { left: Tree, right: Tree, side: Side },
}

#[derive(Debug)]
struct Node {
    label: Label,
    children: Children,
    span: Span,
    head: usize,
    head_word: Label,
    head_tag: Label,
}

/// Immutable constituent with head annotations
#[derive(Debug, Clone)]
pub struct Tree(Arc<Node>);

impl Tree {
    /// Preterminal for token `index`
    pub fn preterminal(word: &TaggedWord, index: usize) -> Self {
        Tree(Arc::new(Node {
            label: word.tag.clone(),
            children: Children::Preterminal {
                word: word.word.clone(),
            },
            span: Span::new(index, index),
            head: index,
            head_word: word.word.clone(),
            head_tag: word.tag.clone(),
        }))
    }

    /// Wraps `child` in a unary node
    pub fn unary(label: Label, child: Tree) -> Self {
        let node = &child.0;
        Tree(Arc::new(Node {
            label,
            span: node.span,
            head: node.head,
            head_word: node.head_word.clone(),
            head_tag: node.head_tag.clone(),
            children: Children::Unary(child),
        }))
    }

    /// Combines two adjacent constituents, taking the head from `side`
    pub fn binary(label: Label, side: Side, left: Tree, right: Tree) -> Self {
        debug_assert_eq!(left.span().right + 1, right.span().left);
        let span = Span::new(left.span().left, right.span().right);
        let head_node = match side {
            Side::Left => left.0.clone(),
            Side::Right => right.0.clone(),
        };
        Tree(Arc::new(Node {
            label,
            span,
            head: head_node.head,
            head_word: head_node.head_word.clone(),
            head_tag: head_node.head_tag.clone(),
            children: Children::Binary { left, right, side },
        }))
    }

    /// Node label
    pub fn label(&self) -> &Label {
        &self.0.label
    }

    /// Label without the temporary prefix
    pub fn base_label(&self) -> &str {
        base_label(&self.0.label)
    }

    /// True for binarization artifacts
    pub fn is_temporary(&self) -> bool {
        is_temporary_label(&self.0.label)
    }

    /// Token span covered by this node
    pub fn span(&self) -> Span {
        self.0.span
    }

    /// Index of the head token
    pub fn head_index(&self) -> usize {
        self.0.head
    }

    /// Head word
    pub fn head_word(&self) -> &Label {
        &self.0.head_word
    }

    /// Head tag
    pub fn head_tag(&self) -> &Label {
        &self.0.head_tag
    }

    /// True for a tag over a single word
    pub fn is_preterminal(&self) -> bool {
        matches!(self.0.children, Children::Preterminal { .. })
    }

    /// The word under a preterminal
    pub fn word(&self) -> Option<&Label> {
        match &self.0.children {
            Children::Preterminal { word } => Some(word),
            _ => None,
        }
    }

    /// The single child of a unary node
    pub fn unary_child(&self) -> Option<&Tree> {
        match &self.0.children {
            Children::Unary(child) => Some(child),
            _ => None,
        }
    }

    /// Children and head side of a binary node
    pub fn binary_children(&self) -> Option<(&Tree, &Tree, Side)> {
        match &self.0.children {
            Children::Binary { left, right, side } => Some((left, right, *side)),
            _ => None,
        }
    }

    /// Number of constituent children (preterminals have none)
    pub fn num_children(&self) -> usize {
        match &self.0.children {
            Children::Preterminal { .. } => 0,
            Children::Unary(_) => 1,
            Children::Binary { .. } => 2,
        }
    }

    /// Number of stacked unary layers at the top of this node
    pub fn unary_depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self;
        while let Some(child) = node.unary_child() {
            depth += 1;
            node = child;
        }
        depth
    }

    /// This node followed by every node below it through unary links
    pub fn unary_chain(&self) -> impl Iterator<Item = &Tree> {
        std::iter::successors(Some(self), |node| node.unary_child())
    }

    /// Tagged words under this node, left to right
    pub fn tagged_yield(&self) -> Vec<TaggedWord> {
        self.preterminals()
            .into_iter()
            .map(|pt| TaggedWord {
                word: pt.0.head_word.clone(),
                tag: pt.0.label.clone(),
            })
            .collect()
    }

    /// Preterminal nodes, left to right
    pub fn preterminals(&self) -> Vec<&Tree> {
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            match &node.0.children {
                Children::Preterminal { .. } => out.push(node),
                Children::Unary(child) => pending.push(child),
                Children::Binary { left, right, .. } => {
                    pending.push(right);
                    pending.push(left);
                }
            }
        }
        out
    }

    /// Every node in pre-order
    pub fn nodes(&self) -> Vec<&Tree> {
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            out.push(node);
            match &node.0.children {
                Children::Preterminal { .. } => {}
                Children::Unary(child) => pending.push(child),
                Children::Binary { left, right, .. } => {
                    pending.push(right);
                    pending.push(left);
                }
            }
        }
        out
    }

    /// Reads a binarized tree written in Penn bracket notation
    ///
    /// Binary nodes may mark their head side with a `^L` or `^R` label
    /// suffix. Without a marker the head follows a temporary child, or the
    /// left child when neither child is temporary. A label-less outer
    /// bracket around a single tree is accepted and dropped.
    pub fn from_bracketed(text: &str) -> Result<Tree> {
        let tokens = tokenize(text)?;
        let mut reader = Reader {
            tokens: &tokens,
            position: 0,
            next_token: 0,
        };
        let tree = reader.read_tree()?;
        if let Some(token) = reader.tokens.get(reader.position) {
            return Err(CoreError::MalformedTree {
                offset: token.offset,
                reason: "trailing input after tree".to_string(),
            });
        }
        Ok(tree)
    }

    /// Writes the tree with explicit head side markers on binary nodes
    pub fn to_headed_string(&self) -> String {
        let mut out = String::new();
        self.write_brackets(&mut out, true);
        out
    }

    fn write_brackets(&self, out: &mut String, headed: bool) {
        out.push('(');
        out.push_str(&self.0.label);
        match &self.0.children {
            Children::Preterminal { word } => {
                out.push(' ');
                out.push_str(word);
            }
            Children::Unary(child) => {
                out.push(' ');
                child.write_brackets(out, headed);
            }
            Children::Binary { left, right, side } => {
                if headed {
                    out.push_str(match side {
                        Side::Left => "^L",
                        Side::Right => "^R",
                    });
                }
                out.push(' ');
                left.write_brackets(out, headed);
                out.push(' ');
                right.write_brackets(out, headed);
            }
        }
        out.push(')');
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.0.label != other.0.label || self.0.span != other.0.span {
            return false;
        }
        match (&self.0.children, &other.0.children) {
            (Children::Preterminal { word: a }, Children::Preterminal { word: b }) => a == b,
            (Children::Unary(a), Children::Unary(b)) => a == b,
            (
                Children::Binary {
                    left: al,
                    right: ar,
                    side: a_side,
                },
                Children::Binary {
                    left: bl,
                    right: br,
                    side: b_side,
                },
            ) => a_side == b_side && al == bl && ar == br,
            _ => false,
        }
    }
}

impl Eq for Tree {}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_brackets(&mut out, false);
        f.write_str(&out)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Open,
    Close,
    Atom(String),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut atom_start: Option<usize> = None;
    for (offset, ch) in text.char_indices() {
        if ch == '(' || ch == ')' || ch.is_whitespace() {
            if let Some(start) = atom_start.take() {
                tokens.push(Token {
                    kind: TokenKind::Atom(text[start..offset].to_string()),
                    offset: start,
                });
            }
            match ch {
                '(' => tokens.push(Token {
                    kind: TokenKind::Open,
                    offset,
                }),
                ')' => tokens.push(Token {
                    kind: TokenKind::Close,
                    offset,
                }),
                _ => {}
            }
        } else if atom_start.is_none() {
            atom_start = Some(offset);
        }
    }
    if let Some(start) = atom_start {
        tokens.push(Token {
            kind: TokenKind::Atom(text[start..].to_string()),
            offset: start,
        });
    }
    if tokens.is_empty() {
        return Err(CoreError::MalformedTree {
            offset: 0,
            reason: "empty input".to_string(),
        });
    }
    Ok(tokens)
}

struct Reader<'a> {
    tokens: &'a [Token],
    position: usize,
    next_token: usize,
}

impl Reader<'_> {
    fn error(&self, reason: &str) -> CoreError {
        let offset = self
            .tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map_or(0, |token| token.offset);
        CoreError::MalformedTree {
            offset,
            reason: reason.to_string(),
        }
    }

    fn expect_open(&mut self) -> Result<()> {
        match self.tokens.get(self.position) {
            Some(Token {
                kind: TokenKind::Open,
                ..
            }) => {
                self.position += 1;
                Ok(())
            }
            _ => Err(self.error("expected '('")),
        }
    }

    fn read_tree(&mut self) -> Result<Tree> {
        let tokens = self.tokens;
        self.expect_open()?;
        let label = match tokens.get(self.position) {
            Some(Token {
                kind: TokenKind::Atom(atom),
                ..
            }) => {
                self.position += 1;
                Some(atom.clone())
            }
            _ => None,
        };

        // Preterminal: (TAG word)
        if let (
            Some(tag),
            Some(Token {
                kind: TokenKind::Atom(word),
                ..
            }),
        ) = (&label, tokens.get(self.position))
        {
            let word = TaggedWord::new(word, tag);
            self.position += 1;
            self.expect_close()?;
            let tree = Tree::preterminal(&word, self.next_token);
            self.next_token += 1;
            return Ok(tree);
        }

        let mut children = Vec::new();
        while let Some(Token {
            kind: TokenKind::Open,
            ..
        }) = tokens.get(self.position)
        {
            children.push(self.read_tree()?);
        }
        self.expect_close()?;

        let Some(label) = label else {
            return match children.len() {
                1 => Ok(children.remove(0)),
                _ => Err(self.error("unlabelled node must wrap exactly one tree")),
            };
        };
        let (label, marker) = split_head_marker(&label);

        match children.len() {
            0 => Err(self.error("internal node without children")),
            1 => Ok(Tree::unary(Arc::from(label), children.remove(0))),
            2 => {
                let right = children.remove(1);
                let left = children.remove(0);
                let side = marker.unwrap_or_else(|| infer_side(&left, &right));
                Ok(Tree::binary(Arc::from(label), side, left, right))
            }
            n => Err(CoreError::NotBinarized {
                label: label.to_string(),
                children: n,
            }),
        }
    }

    fn expect_close(&mut self) -> Result<()> {
        match self.tokens.get(self.position) {
            Some(Token {
                kind: TokenKind::Close,
                ..
            }) => {
                self.position += 1;
                Ok(())
            }
            _ => Err(self.error("expected ')'")),
        }
    }
}

fn split_head_marker(label: &str) -> (&str, Option<Side>) {
    if let Some(base) = label.strip_suffix("^L") {
        (base, Some(Side::Left))
    } else if let Some(base) = label.strip_suffix("^R") {
        (base, Some(Side::Right))
    } else {
        (label, None)
    }
}

fn infer_side(left: &Tree, right: &Tree) -> Side {
    if right.is_temporary() && !left.is_temporary() {
        Side::Right
    } else {
        Side::Left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_simple_tree() {
        let tree = Tree::from_bracketed("(ROOT (S (NP (DT the) (NN cat)) (VP (VBD sat))))").unwrap();
        assert_eq!(&**tree.label(), "ROOT");
        assert_eq!(tree.span(), Span::new(0, 2));
        assert_eq!(tree.unary_depth(), 1);
        let words: Vec<_> = tree.tagged_yield().iter().map(|w| w.word.to_string()).collect();
        assert_eq!(words, vec!["the", "cat", "sat"]);
        assert_eq!(tree.to_string(), "(ROOT (S (NP (DT the) (NN cat)) (VP (VBD sat))))");
    }

    #[test]
    fn test_head_annotations() {
        let tree = Tree::from_bracketed("(NP^R (DT the) (NN cat))").unwrap();
        assert_eq!(&**tree.head_word(), "cat");
        assert_eq!(&**tree.head_tag(), "NN");
        assert_eq!(tree.head_index(), 1);

        let left = Tree::from_bracketed("(NP (DT the) (NN cat))").unwrap();
        assert_eq!(&**left.head_word(), "the");
    }

    #[test]
    fn test_side_inferred_from_temporary_child() {
        let tree = Tree::from_bracketed("(NP (DT a) (@NP (JJ big) (NN dog)))").unwrap();
        let (_, right, side) = tree.binary_children().unwrap();
        assert_eq!(side, Side::Right);
        assert!(right.is_temporary());
        assert_eq!(right.base_label(), "NP");
    }

    #[test]
    fn test_headed_string_round_trip() {
        let text = "(S^R (NP^L (DT the) (NN cat)) (VP (VBD sat)))";
        let tree = Tree::from_bracketed(text).unwrap();
        assert_eq!(tree.to_headed_string(), text);
        assert_eq!(Tree::from_bracketed(&tree.to_headed_string()).unwrap(), tree);
    }

    #[test]
    fn test_outer_brackets_dropped() {
        let tree = Tree::from_bracketed("( (S (NN cat)) )").unwrap();
        assert_eq!(&**tree.label(), "S");
    }

    #[test]
    fn test_rejects_non_binarized() {
        let err = Tree::from_bracketed("(NP (DT a) (JJ big) (NN dog))").unwrap_err();
        assert!(matches!(err, CoreError::NotBinarized { children: 3, .. }));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(Tree::from_bracketed("(NP (DT a)").is_err());
        assert!(Tree::from_bracketed("").is_err());
        assert!(Tree::from_bracketed("(NP (DT a)) extra").is_err());
    }

    #[test]
    fn test_label_helpers() {
        assert!(is_temporary_label("@NP"));
        assert_eq!(base_label("@NP"), "NP");
        assert_eq!(base_label("NP"), "NP");
        assert_eq!(&*temporary_label("@NP"), "@NP");
        assert_eq!(&*temporary_label("VP"), "@VP");
    }

    #[test]
    fn test_structural_equality() {
        let a = Tree::from_bracketed("(S (NN cat) (VB ran))").unwrap();
        let b = Tree::from_bracketed("(S (NN cat) (VB ran))").unwrap();
        let c = Tree::from_bracketed("(S^R (NN cat) (VB ran))").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
