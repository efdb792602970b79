use nom::{
    IResult, Parser,
    character::complete::{char, multispace0},
    combinator::opt,
    multi::separated_list1,
    number::complete::float,
    sequence::delimited,
};
use crate::core::error::{Error, Result};
use crate::core::types::VectorRecord;

fn vector_literal(input: &str) -> IResult<&str, Vec<f32>> {
    let separator = (multispace0, char(','), multispace0);
    delimited(
        (multispace0, opt(char('[')), multispace0),
        separated_list1(separator, float),
        (multispace0, opt(char(']')), multispace0),
    )
    .parse(input)
}

/// Parse a vector literal of the form `[v1, v2, ...]`.
///
/// Brackets are optional; elements are separated by commas with any amount of
/// surrounding whitespace. Anything left over after the closing bracket makes
/// the whole literal malformed.
pub fn parse_vector(input: &str) -> Result<Vec<f32>> {
    match vector_literal(input) {
        Ok(("", values)) => Ok(values),
        Ok((rest, _)) => Err(Error::parse(format!(
            "unexpected trailing input in vector literal: '{}'",
            truncate_for_log(rest)
        ))),
        Err(e) => Err(Error::parse(format!(
            "malformed vector literal '{}': {}",
            truncate_for_log(input),
            e
        ))),
    }
}

/// Normalize `vector` to exactly `dim` components: truncate when longer,
/// zero-pad when shorter.
pub fn reduce_dimension_vector(mut vector: Vec<f32>, dim: usize) -> VectorRecord {
    vector.resize(dim, 0.0);
    VectorRecord(vector)
}

/// Parse then normalize in one step; a parse failure never yields a
/// partially normalized record.
pub fn parse_normalized(input: &str, dim: usize) -> Result<VectorRecord> {
    parse_vector(input).map(|v| reduce_dimension_vector(v, dim))
}

fn truncate_for_log(s: &str) -> &str {
    match s.char_indices().nth(48) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bracketed_literal() {
        let v = parse_vector("[0.5, -1.25, 3e-2]").unwrap();
        assert_eq!(v, vec![0.5, -1.25, 0.03]);
    }

    #[test]
    fn accepts_missing_brackets_and_tight_commas() {
        assert_eq!(parse_vector("1,2,3").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(parse_vector("  [ 4 ,5 ]  ").unwrap(), vec![4.0, 5.0]);
    }

    #[test]
    fn rejects_malformed_literals() {
        assert!(parse_vector("[]").is_err());
        assert!(parse_vector("[1.0, abc]").is_err());
        assert!(parse_vector("[1.0, 2.0] trailing").is_err());
        assert!(parse_vector("").is_err());
    }

    #[test]
    fn reduce_truncates_long_vectors() {
        let v = reduce_dimension_vector(vec![1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(v.0, vec![1.0, 2.0]);
    }

    #[test]
    fn reduce_pads_short_vectors_with_zeros() {
        let v = reduce_dimension_vector(vec![1.0, 2.0], 5);
        assert_eq!(v.0, vec![1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn reduce_always_yields_requested_length() {
        for len in 0..20 {
            let input: Vec<f32> = (0..len).map(|i| i as f32 + 0.5).collect();
            for dim in 0..20 {
                let out = reduce_dimension_vector(input.clone(), dim);
                assert_eq!(out.0.len(), dim);
                let shared = len.min(dim);
                assert_eq!(&out.0[..shared], &input[..shared]);
                assert!(out.0[shared..].iter().all(|&x| x == 0.0));
            }
        }
    }
}
