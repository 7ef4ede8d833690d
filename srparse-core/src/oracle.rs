//! Dynamic oracle over gold binarized trees
//!
//! Given any state built over a gold tree's sentence, the oracle names the
//! transition (or class of transitions) that keeps the parse as close to
//! the gold tree as possible.

use crate::error::{CoreError, Result};
use crate::labels::LabelSet;
use crate::state::State;
use crate::transition::Transition;
use crate::tree::{Label, Side, Span, Tree};

/// Answer from [`Oracle::gold_transition`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleTransition {
    /// Exact transition, if one is known
    pub transition: Option<Transition>,
    /// Any Shift is acceptable
    pub allows_shift: bool,
    /// Any Binary is acceptable
    pub allows_binary: bool,
    /// A Binary with the exact transition's label is acceptable on either side
    pub allows_either_side: bool,
}

impl OracleTransition {
    fn exact(transition: Transition) -> Self {
        Self {
            transition: Some(transition),
            allows_shift: false,
            allows_binary: false,
            allows_either_side: false,
        }
    }

    fn any_binary() -> Self {
        Self {
            transition: None,
            allows_shift: false,
            allows_binary: true,
            allows_either_side: false,
        }
    }

    fn shift_or_binary() -> Self {
        Self {
            transition: None,
            allows_shift: true,
            allows_binary: true,
            allows_either_side: true,
        }
    }

    /// True if `other` is among the acceptable transitions
    pub fn is_correct(&self, other: &Transition) -> bool {
        if self.transition.as_ref() == Some(other) {
            return true;
        }
        match other {
            Transition::Shift => self.allows_shift,
            Transition::Binary(binary) => {
                if self.allows_binary {
                    return true;
                }
                match &self.transition {
                    Some(Transition::Binary(gold)) => {
                        self.allows_either_side && gold.label == binary.label
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct GoldNode {
    label: Label,
    span: Span,
    parent: Option<usize>,
    is_left_child: bool,
    unary: bool,
    side: Option<Side>,
}

/// Gold tree flattened into an arena with parent links
#[derive(Debug, Clone)]
struct GoldTree {
    nodes: Vec<GoldNode>,
    preterminals: Vec<usize>,
}

impl GoldTree {
    fn new(tree: &Tree) -> Self {
        let mut gold = GoldTree {
            nodes: Vec::new(),
            preterminals: Vec::new(),
        };
        gold.add(tree, None, false);
        gold.preterminals.sort_by_key(|&node| gold.nodes[node].span.left);
        gold
    }

    fn add(&mut self, tree: &Tree, parent: Option<usize>, is_left_child: bool) {
        let id = self.nodes.len();
        let binary = tree.binary_children();
        self.nodes.push(GoldNode {
            label: tree.label().clone(),
            span: tree.span(),
            parent,
            is_left_child,
            unary: tree.unary_child().is_some(),
            side: binary.map(|(_, _, side)| side),
        });
        if tree.is_preterminal() {
            self.preterminals.push(id);
        } else if let Some(child) = tree.unary_child() {
            self.add(child, Some(id), true);
        } else if let Some((left, right, _)) = binary {
            self.add(left, Some(id), true);
            self.add(right, Some(id), false);
        }
    }

    fn node(&self, id: usize) -> &GoldNode {
        &self.nodes[id]
    }

    /// Lowest gold node containing `span`, climbing from its first token
    fn enclosing(&self, span: Span) -> Option<usize> {
        let mut node = *self.preterminals.get(span.left)?;
        while self.nodes[node].span.right < span.right {
            node = self.nodes[node].parent?;
        }
        Some(node)
    }
}

/// Oracle over a fixed list of gold trees
#[derive(Debug, Clone)]
pub struct Oracle {
    trees: Vec<GoldTree>,
    compound_unaries: bool,
    root_states: LabelSet,
    root_only_states: LabelSet,
}

impl Oracle {
    /// Precomputes parent links and leaves for every tree
    pub fn new(
        trees: &[Tree],
        compound_unaries: bool,
        root_states: LabelSet,
        root_only_states: LabelSet,
    ) -> Self {
        Self {
            trees: trees.iter().map(GoldTree::new).collect(),
            compound_unaries,
            root_states,
            root_only_states,
        }
    }

    /// Number of gold trees held
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// True if no trees are held
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Correct next step for `state` with respect to gold tree `index`
    pub fn gold_transition(&self, index: usize, state: &State) -> Result<OracleTransition> {
        let gold = self.trees.get(index).ok_or(CoreError::UnknownTree {
            index,
            len: self.trees.len(),
        })?;

        if state.is_finished() {
            return Ok(OracleTransition::exact(Transition::Idle));
        }
        let stack = state.stack();
        let Some(s0) = stack.peek() else {
            return Ok(OracleTransition::exact(Transition::Shift));
        };
        let Some(enclosing0) = gold.enclosing(s0.span()) else {
            return Ok(OracleTransition::shift_or_binary());
        };

        if let Some(unary) = self.unary_transition(gold, s0, enclosing0) {
            return Ok(OracleTransition::exact(unary));
        }

        if state.end_of_queue() && stack.len() == 1 {
            return Ok(OracleTransition::exact(Transition::finalize(
                self.root_states.clone(),
            )));
        }
        if stack.len() == 1 {
            return Ok(OracleTransition::exact(Transition::Shift));
        }

        let span0 = s0.span();
        let enclosing_span = gold.node(enclosing0).span;
        let s1 = stack.get(1);

        if enclosing_span == span0 {
            // Skip unary layers the stack missed
            let mut node = enclosing0;
            let mut parent = gold.node(node).parent;
            while let Some(p) = parent.filter(|&p| gold.node(p).span == span0) {
                node = p;
                parent = gold.node(p).parent;
            }
            let Some(parent) = parent else {
                return Ok(OracleTransition::shift_or_binary());
            };
            if gold.node(node).is_left_child {
                return Ok(OracleTransition::exact(Transition::Shift));
            }
            let s1_complete = s1
                .and_then(|s1| gold.enclosing(s1.span()).map(|e| gold.node(e).span == s1.span()))
                .unwrap_or(false);
            if s1_complete {
                return Ok(OracleTransition::exact(self.binary_for(gold, parent)));
            }
            return Ok(OracleTransition::any_binary());
        }

        if span0.left == enclosing_span.left {
            return Ok(OracleTransition::exact(Transition::Shift));
        }

        if span0.right == enclosing_span.right {
            let Some(s1) = s1 else {
                return Ok(OracleTransition::shift_or_binary());
            };
            if gold.enclosing(s1.span()) == Some(enclosing0) {
                let mut answer = OracleTransition::exact(self.binary_for(gold, enclosing0));
                answer.allows_either_side = true;
                return Ok(answer);
            }
            if s1.span().left > enclosing_span.left {
                let mut answer = OracleTransition::any_binary();
                answer.allows_either_side = true;
                return Ok(answer);
            }
            return Ok(OracleTransition::shift_or_binary());
        }

        Ok(OracleTransition::shift_or_binary())
    }

    fn binary_for(&self, gold: &GoldTree, node: usize) -> Transition {
        let node = gold.node(node);
        Transition::binary(
            &node.label,
            node.side.unwrap_or(Side::Left),
            self.root_only_states.contains(&node.label),
        )
    }

    /// Remaining unary layers above `s0` when it spans a gold unary chain
    fn unary_transition(&self, gold: &GoldTree, s0: &Tree, enclosing: usize) -> Option<Transition> {
        let span = s0.span();
        if gold.node(enclosing).span != span {
            return None;
        }
        // Gold nodes sharing the span, lowest first
        let mut chain = vec![enclosing];
        let mut node = enclosing;
        while let Some(parent) = gold.node(node).parent {
            if gold.node(parent).span != span || !gold.node(parent).unary {
                break;
            }
            chain.push(parent);
            node = parent;
        }
        let position = chain
            .iter()
            .position(|&id| gold.node(id).label == *s0.label())?;
        let remaining: Vec<Label> = chain[position + 1..]
            .iter()
            .rev()
            .map(|&id| gold.node(id).label.clone())
            .collect();
        let top = remaining.first()?;

        if self.compound_unaries {
            if s0.unary_depth() > 0 {
                return None;
            }
            let is_root = self.root_only_states.contains(top);
            Some(Transition::CompoundUnary {
                labels: remaining.into(),
                is_root,
            })
        } else {
            let next = remaining.last()?;
            Some(Transition::Unary {
                label: next.clone(),
                is_root: self.root_only_states.contains(next),
            })
        }
    }
}
