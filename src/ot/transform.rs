//! Inclusion transformation of concurrent edits.
//!
//! Given two sequences `a` and `b` produced against the same document,
//! `transform(a, b, side)` rewrites `a` so it can be applied after `b`.
//! With opposite sides the pair satisfies TP1:
//!
//! ```text
//! apply(apply(d, a), transform(b, a, Right)) == apply(apply(d, b), transform(a, b, Left))
//! ```
//!
//! `side` only matters when both sequences insert at the same position:
//! the `Left` sequence's text lands first.

use serde::Deserialize;
use serde::Serialize;

use crate::ot::operation::consume;
use crate::ot::operation::Operation;
use crate::ot::operation::OperationSeq;

/// Which of two concurrent inserts at the same position goes first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Rewrite `a` to apply on top of the concurrent `b`.
///
/// Base lengths are not compared. If `b` walks further than `a`, the rest
/// of `b` only shifts the pass-through tail; if `a` walks further, its
/// excess is copied unchanged. A mismatch is therefore padded rather than
/// rejected and only fails once the result is applied.
pub fn transform(a: &OperationSeq, b: &OperationSeq, side: Side) -> OperationSeq {
    let mut transformed = OperationSeq::new();
    let mut ops_a = a.iter().cloned();
    let mut ops_b = b.iter().cloned();
    let mut maybe_a = ops_a.next();
    let mut maybe_b = ops_b.next();

    loop {
        match (&maybe_a, &maybe_b) {
            // Nothing left to rewrite; any remaining `b` only shifts the tail.
            (None, _) => break,
            (Some(op @ Operation::Insert { .. }), Some(Operation::Insert { .. }))
                if side == Side::Left =>
            {
                transformed.push(op.clone());
                maybe_a = ops_a.next();
            }
            (_, Some(Operation::Insert { text, .. })) => {
                transformed.push(Operation::retain(text.chars().count()));
                maybe_b = ops_b.next();
            }
            (Some(op @ Operation::Insert { .. }), _) => {
                transformed.push(op.clone());
                maybe_a = ops_a.next();
            }
            (Some(op), None) => {
                transformed.push(op.clone());
                maybe_a = ops_a.next();
            }
            (Some(x @ Operation::Delete { .. }), Some(y @ Operation::Delete { .. })) => {
                // Both removed the same text.
                let n = x.len().min(y.len());
                consume(&mut maybe_a, &mut ops_a, n);
                consume(&mut maybe_b, &mut ops_b, n);
            }
            (Some(x @ Operation::Delete { .. }), Some(y @ Operation::Retain { .. })) => {
                let n = x.len().min(y.len());
                transformed.push(Operation::delete(n));
                consume(&mut maybe_a, &mut ops_a, n);
                consume(&mut maybe_b, &mut ops_b, n);
            }
            (Some(x @ Operation::Retain { .. }), Some(y @ Operation::Delete { .. })) => {
                // `b` already removed what `a` meant to keep.
                let n = x.len().min(y.len());
                consume(&mut maybe_a, &mut ops_a, n);
                consume(&mut maybe_b, &mut ops_b, n);
            }
            (
                Some(x @ Operation::Retain { attributes, .. }),
                Some(y @ Operation::Retain { attributes: theirs, .. }),
            ) => {
                let n = x.len().min(y.len());
                transformed.push(Operation::Retain {
                    length: n,
                    attributes: theirs.clone().or_else(|| attributes.clone()),
                });
                consume(&mut maybe_a, &mut ops_a, n);
                consume(&mut maybe_b, &mut ops_b, n);
            }
        }
    }

    return transformed;
}

/// Transform both sides at once: returns `(a', b')` with `a` on the left.
pub fn transform_pair(a: &OperationSeq, b: &OperationSeq) -> (OperationSeq, OperationSeq) {
    return (
        transform(a, b, Side::Left),
        transform(b, a, Side::Right),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Apply both orders and check they meet.
    fn converge(doc: &str, a: &OperationSeq, b: &OperationSeq) -> String {
        let (a_prime, b_prime) = transform_pair(a, b);
        let via_a = b_prime.apply(&a.apply(doc).unwrap()).unwrap();
        let via_b = a_prime.apply(&b.apply(doc).unwrap()).unwrap();
        assert_eq!(via_a, via_b);
        return via_a;
    }

    #[test]
    fn concurrent_inserts_at_same_position() {
        let a = OperationSeq::new().retain(1).insert("X");
        let b = OperationSeq::new().retain(1).insert("Y");
        assert_eq!(converge("ABC", &a, &b), "AXYBC");
        // Swapping sides swaps the order.
        let (b_left, a_right) = transform_pair(&b, &a);
        let via_b = a_right.apply(&b.apply("ABC").unwrap()).unwrap();
        let via_a = b_left.apply(&a.apply("ABC").unwrap()).unwrap();
        assert_eq!(via_a, "AYXBC");
        assert_eq!(via_b, "AYXBC");
    }

    #[test]
    fn inserts_at_different_positions() {
        let a = OperationSeq::new().insert("X");
        let b = OperationSeq::new().retain(3).insert("Y");
        assert_eq!(converge("ABC", &a, &b), "XABCY");
    }

    #[test]
    fn insert_against_delete() {
        let a = OperationSeq::new().retain(2).insert("X");
        let b = OperationSeq::new().retain(1).delete(2);
        assert_eq!(converge("ABCD", &a, &b), "AXD");
    }

    #[test]
    fn overlapping_deletes() {
        let a = OperationSeq::new().retain(1).delete(3);
        let b = OperationSeq::new().retain(2).delete(3);
        assert_eq!(converge("ABCDEF", &a, &b), "AF");
    }

    #[test]
    fn identical_deletes() {
        let a = OperationSeq::new().retain(2).delete(2);
        let (a_prime, b_prime) = transform_pair(&a, &a);
        assert!(a_prime.is_noop());
        assert!(b_prime.is_noop());
        assert_eq!(converge("ABCDE", &a, &a), "ABE");
    }

    #[test]
    fn mixed_edits() {
        let a = OperationSeq::new()
            .insert("X")
            .retain(2)
            .delete(1)
            .insert("Y");
        let b = OperationSeq::new().retain(1).insert("Z").delete(2);
        assert_eq!(converge("ABCD", &a, &b), "XAZYD");
    }

    #[test]
    fn cjk_text() {
        let a = OperationSeq::new().retain(2).insert("，");
        let b = OperationSeq::new().retain(4).insert("！");
        assert_eq!(converge("你好世界", &a, &b), "你好，世界！");
    }

    #[test]
    fn sentence_edits() {
        let doc = "Hello World";
        let a = OperationSeq::new().retain(6).insert("Beautiful ");
        let b = OperationSeq::new().retain(6).delete(5).insert("TypeScript");
        assert_eq!(converge(doc, &a, &b), "Hello Beautiful TypeScript");
    }

    #[test]
    fn empty_side_is_identity() {
        let a = OperationSeq::new().retain(2).insert("!");
        let empty = OperationSeq::new();
        assert_eq!(transform(&a, &empty, Side::Left), a);
        assert!(transform(&empty, &a, Side::Right).is_empty());
    }

    #[test]
    fn shorter_sequences_use_the_tail() {
        // `a` stops early; `b` edits past where `a` ends.
        let a = OperationSeq::new().insert("-");
        let b = OperationSeq::new().retain(5).delete(1);
        assert_eq!(converge("abcdef", &a, &b), "-abcde");
    }

    #[test]
    fn retain_prefers_their_attributes() {
        let mut bold = crate::ot::operation::Attributes::new();
        bold.insert(
            "bold".to_string(),
            crate::ot::operation::AttributeValue::Bool(true),
        );
        let a = OperationSeq::new().retain(2);
        let b = OperationSeq::new().retain_with(2, bold.clone());
        assert_eq!(
            transform(&a, &b, Side::Left),
            OperationSeq::new().retain_with(2, bold)
        );
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.opposite(), Side::Left);
    }
}
