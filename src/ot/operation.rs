//! The operation algebra: insert / delete / retain over plain text.
//!
//! An edit is an [`OperationSeq`]: a list of operations walked left to
//! right against a document cursor. Retain copies characters, delete skips
//! them, insert emits new text. Anything past the last explicit operation
//! is passed through verbatim, so a sequence may be shorter than the
//! document it is applied to, but never longer.
//!
//! Lengths are counted in Unicode scalar values (`char`s), not bytes.
//!
//! Everything in this module is pure: sequences are built per edit,
//! consumed by [`OperationSeq::apply`], [`OperationSeq::compose`] and
//! [`crate::ot::transform`], and dropped.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// A primitive attribute value. Equality is structural.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

/// An ordered style map carried by inserts and retains.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// One atomic step of an edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    /// Emit `text` at the cursor without consuming the document.
    Insert {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<Attributes>,
    },
    /// Skip `length` characters of the document.
    Delete { length: usize },
    /// Copy `length` characters of the document.
    Retain {
        length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<Attributes>,
    },
}

impl Operation {
    pub fn insert(text: impl Into<String>) -> Operation {
        return Operation::Insert {
            text: text.into(),
            attributes: None,
        };
    }

    pub fn insert_with(text: impl Into<String>, attributes: Attributes) -> Operation {
        return Operation::Insert {
            text: text.into(),
            attributes: Some(attributes),
        };
    }

    pub fn delete(length: usize) -> Operation {
        return Operation::Delete { length };
    }

    pub fn retain(length: usize) -> Operation {
        return Operation::Retain {
            length,
            attributes: None,
        };
    }

    pub fn retain_with(length: usize, attributes: Attributes) -> Operation {
        return Operation::Retain {
            length,
            attributes: Some(attributes),
        };
    }

    /// Length in characters: inserted text for inserts, the run otherwise.
    pub fn len(&self) -> usize {
        match self {
            Operation::Insert { text, .. } => text.chars().count(),
            Operation::Delete { length } => *length,
            Operation::Retain { length, .. } => *length,
        }
    }

    /// True for zero-length operations, which normalization drops.
    pub fn is_empty(&self) -> bool {
        match self {
            Operation::Insert { text, .. } => text.is_empty(),
            Operation::Delete { length } => *length == 0,
            Operation::Retain { length, .. } => *length == 0,
        }
    }

    /// Split into the first `n` characters and the remainder.
    /// The remainder is empty when `n >= self.len()`.
    pub fn split(&self, n: usize) -> (Operation, Operation) {
        match self {
            Operation::Insert { text, attributes } => {
                let at = text
                    .char_indices()
                    .nth(n)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len());
                let head = Operation::Insert {
                    text: text[..at].to_string(),
                    attributes: attributes.clone(),
                };
                let tail = Operation::Insert {
                    text: text[at..].to_string(),
                    attributes: attributes.clone(),
                };
                return (head, tail);
            }
            Operation::Delete { length } => {
                let head = (*length).min(n);
                return (Operation::delete(head), Operation::delete(length - head));
            }
            Operation::Retain { length, attributes } => {
                let head = (*length).min(n);
                let left = Operation::Retain {
                    length: head,
                    attributes: attributes.clone(),
                };
                let right = Operation::Retain {
                    length: length - head,
                    attributes: attributes.clone(),
                };
                return (left, right);
            }
        }
    }
}

/// Consume `n` characters of `current`, pulling the next operation from
/// `rest` once the current one is used up.
pub(crate) fn consume(
    current: &mut Option<Operation>,
    rest: &mut impl Iterator<Item = Operation>,
    n: usize,
) {
    let remainder = match current.take() {
        Some(op) if op.len() > n => Some(op.split(n).1),
        _ => None,
    };
    *current = remainder.or_else(|| rest.next());
}

/// An ordered, normalized list of operations describing one edit.
///
/// Building through [`OperationSeq::push`] (or any of the chaining
/// helpers) keeps the sequence normalized: no empty operations and no two
/// adjacent operations of the same kind with equal attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Operation>", into = "Vec<Operation>")]
pub struct OperationSeq {
    ops: Vec<Operation>,
}

impl OperationSeq {
    /// Create an empty sequence (the identity edit).
    pub fn new() -> OperationSeq {
        return OperationSeq { ops: Vec::new() };
    }

    /// A sequence that inserts `text` into an empty document.
    pub fn from_text(text: &str) -> OperationSeq {
        return OperationSeq::new().insert(text);
    }

    /// Append an operation, merging it into the last one where possible.
    ///
    /// Runs whose combined length would overflow stay separate, and
    /// [`OperationSeq::base_len`] rejects the sequence.
    pub fn push(&mut self, op: Operation) {
        if op.is_empty() {
            return;
        }
        match (self.ops.last_mut(), &op) {
            (
                Some(Operation::Insert { text, attributes }),
                Operation::Insert {
                    text: more,
                    attributes: other,
                },
            ) if *attributes == *other => {
                text.push_str(more);
                return;
            }
            (Some(Operation::Delete { length }), Operation::Delete { length: more })
                if length.checked_add(*more).is_some() =>
            {
                *length += more;
                return;
            }
            (
                Some(Operation::Retain { length, attributes }),
                Operation::Retain {
                    length: more,
                    attributes: other,
                },
            ) if *attributes == *other && length.checked_add(*more).is_some() => {
                *length += more;
                return;
            }
            _ => {}
        }
        self.ops.push(op);
    }

    pub fn insert(mut self, text: impl Into<String>) -> OperationSeq {
        self.push(Operation::insert(text));
        return self;
    }

    pub fn insert_with(mut self, text: impl Into<String>, attributes: Attributes) -> OperationSeq {
        self.push(Operation::insert_with(text, attributes));
        return self;
    }

    pub fn delete(mut self, length: usize) -> OperationSeq {
        self.push(Operation::delete(length));
        return self;
    }

    pub fn retain(mut self, length: usize) -> OperationSeq {
        self.push(Operation::retain(length));
        return self;
    }

    pub fn retain_with(mut self, length: usize, attributes: Attributes) -> OperationSeq {
        self.push(Operation::retain_with(length, attributes));
        return self;
    }

    /// The operations, in order.
    pub fn ops(&self) -> &[Operation] {
        return &self.ops;
    }

    pub fn into_ops(self) -> Vec<Operation> {
        return self.ops;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        return self.ops.iter();
    }

    /// Number of operations (not characters).
    pub fn len(&self) -> usize {
        return self.ops.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.ops.is_empty();
    }

    /// True when applying the sequence leaves every document unchanged.
    pub fn is_noop(&self) -> bool {
        return self
            .ops
            .iter()
            .all(|op| matches!(op, Operation::Retain { attributes: None, .. }));
    }

    /// Characters of input the sequence walks over (deletes + retains).
    ///
    /// Fails with [`Error::LengthOverflow`] when the total does not fit.
    pub fn base_len(&self) -> Result<usize> {
        return checked_total(self.ops.iter().map(|op| match op {
            Operation::Insert { .. } => 0,
            Operation::Delete { length } => *length,
            Operation::Retain { length, .. } => *length,
        }));
    }

    /// Characters of output the sequence produces for its explicit span
    /// (inserts + retains).
    pub fn target_len(&self) -> Result<usize> {
        return checked_total(self.ops.iter().map(|op| match op {
            Operation::Insert { text, .. } => text.chars().count(),
            Operation::Delete { .. } => 0,
            Operation::Retain { length, .. } => *length,
        }));
    }

    /// Apply the sequence to `document`.
    ///
    /// The unwalked tail of the document is appended verbatim. Fails when
    /// the sequence walks past the end of the document.
    pub fn apply(&self, document: &str) -> Result<String> {
        let actual = document.chars().count();
        let required = self.base_len()?;
        if required > actual {
            return Err(Error::DocumentTooShort { required, actual });
        }

        let mut output = String::with_capacity(document.len());
        let mut rest = document.chars();
        for op in &self.ops {
            match op {
                Operation::Insert { text, .. } => output.push_str(text),
                Operation::Delete { length } => {
                    for _ in 0..*length {
                        rest.next();
                    }
                }
                Operation::Retain { length, .. } => {
                    output.extend(rest.by_ref().take(*length));
                }
            }
        }
        output.push_str(rest.as_str());
        return Ok(output);
    }

    /// Build the sequence that undoes `self`, given the document `self`
    /// was applied to.
    ///
    /// `apply(apply(d, ops), invert(ops, d)) == d`. Retains come back
    /// without attributes: a plain-text document carries no pre-image to
    /// restore them from.
    pub fn invert(&self, original: &str) -> Result<OperationSeq> {
        let actual = original.chars().count();
        let required = self.base_len()?;
        if required > actual {
            return Err(Error::DocumentTooShort { required, actual });
        }

        let mut inverted = OperationSeq::new();
        let mut rest = original.chars();
        for op in &self.ops {
            match op {
                Operation::Insert { text, .. } => {
                    inverted.push(Operation::delete(text.chars().count()));
                }
                Operation::Delete { length } => {
                    let removed: String = rest.by_ref().take(*length).collect();
                    inverted.push(Operation::insert(removed));
                }
                Operation::Retain { length, .. } => {
                    for _ in 0..*length {
                        rest.next();
                    }
                    inverted.push(Operation::retain(*length));
                }
            }
        }
        return Ok(inverted);
    }

    /// Merge `self` followed by `next` into one equivalent sequence.
    ///
    /// `next` operates on the document produced by `self`:
    /// `apply(d, a.compose(b)) == apply(apply(d, a), b)`.
    ///
    /// Lengths are not checked against each other. When one sequence is
    /// shorter, the other's excess acts on the pass-through tail instead of
    /// being rejected; a mismatch only surfaces once the result is applied.
    pub fn compose(&self, next: &OperationSeq) -> OperationSeq {
        let mut composed = OperationSeq::new();
        let mut ops_a = self.ops.iter().cloned();
        let mut ops_b = next.ops.iter().cloned();
        let mut maybe_a = ops_a.next();
        let mut maybe_b = ops_b.next();

        loop {
            match (&maybe_a, &maybe_b) {
                (None, None) => break,
                // New content from `next` never interacts with `self`.
                (_, Some(op @ Operation::Insert { .. })) => {
                    composed.push(op.clone());
                    maybe_b = ops_b.next();
                }
                // Content removed by `self` is never seen by `next`.
                (Some(op @ Operation::Delete { .. }), _) => {
                    composed.push(op.clone());
                    maybe_a = ops_a.next();
                }
                // One side ran out: the other side acts on the pass-through tail.
                (None, Some(op)) => {
                    composed.push(op.clone());
                    maybe_b = ops_b.next();
                }
                (Some(op), None) => {
                    composed.push(op.clone());
                    maybe_a = ops_a.next();
                }
                (Some(a @ Operation::Insert { .. }), Some(b @ Operation::Delete { .. })) => {
                    // Inserted then deleted: cancels out.
                    let n = a.len().min(b.len());
                    consume(&mut maybe_a, &mut ops_a, n);
                    consume(&mut maybe_b, &mut ops_b, n);
                }
                (
                    Some(a @ Operation::Insert { attributes, .. }),
                    Some(b @ Operation::Retain { attributes: relabel, .. }),
                ) => {
                    let n = a.len().min(b.len());
                    if let (Operation::Insert { text, .. }, _) = a.split(n) {
                        composed.push(Operation::Insert {
                            text,
                            attributes: relabel.clone().or_else(|| attributes.clone()),
                        });
                    }
                    consume(&mut maybe_a, &mut ops_a, n);
                    consume(&mut maybe_b, &mut ops_b, n);
                }
                (Some(a @ Operation::Retain { .. }), Some(b @ Operation::Delete { .. })) => {
                    let n = a.len().min(b.len());
                    composed.push(Operation::delete(n));
                    consume(&mut maybe_a, &mut ops_a, n);
                    consume(&mut maybe_b, &mut ops_b, n);
                }
                (
                    Some(a @ Operation::Retain { attributes, .. }),
                    Some(b @ Operation::Retain { attributes: relabel, .. }),
                ) => {
                    let n = a.len().min(b.len());
                    composed.push(Operation::Retain {
                        length: n,
                        attributes: relabel.clone().or_else(|| attributes.clone()),
                    });
                    consume(&mut maybe_a, &mut ops_a, n);
                    consume(&mut maybe_b, &mut ops_b, n);
                }
            }
        }

        return composed;
    }
}

impl FromIterator<Operation> for OperationSeq {
    fn from_iter<T: IntoIterator<Item = Operation>>(ops: T) -> Self {
        let mut seq = OperationSeq::new();
        for op in ops {
            seq.push(op);
        }
        return seq;
    }
}

/// Decoding path: rejects sequences whose lengths overflow.
impl TryFrom<Vec<Operation>> for OperationSeq {
    type Error = Error;

    fn try_from(ops: Vec<Operation>) -> Result<Self> {
        let seq: OperationSeq = ops.into_iter().collect();
        seq.base_len()?;
        seq.target_len()?;
        return Ok(seq);
    }
}

impl From<OperationSeq> for Vec<Operation> {
    fn from(seq: OperationSeq) -> Self {
        return seq.ops;
    }
}

impl<'a> IntoIterator for &'a OperationSeq {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        return self.ops.iter();
    }
}

/// Normalize a raw list of operations: drop empty operations and merge
/// adjacent operations of the same kind and attributes.
fn checked_total(lengths: impl Iterator<Item = usize>) -> Result<usize> {
    let mut total: usize = 0;
    for length in lengths {
        total = total.checked_add(length).ok_or(Error::LengthOverflow)?;
    }
    return Ok(total);
}

pub fn normalize(ops: impl IntoIterator<Item = Operation>) -> Vec<Operation> {
    return ops.into_iter().collect::<OperationSeq>().into_ops();
}

/// Compute a sequence turning `old` into `new` from their common prefix
/// and suffix. Not minimal for scattered edits, but always correct.
pub fn diff(old: &str, new: &str) -> OperationSeq {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();

    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let inserted: String = new[prefix..new.len() - suffix].iter().collect();
    let deleted = old.len() - prefix - suffix;

    return OperationSeq::new()
        .retain(prefix)
        .insert(inserted)
        .delete(deleted);
}
