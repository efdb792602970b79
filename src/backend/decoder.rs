//! Native result buffer protocol.
//!
//! A native search call returns one buffer in native byte order holding
//! exactly `2 * N` 32-bit words for `N` results. The words form two
//! concatenated parallel arrays, not interleaved rows:
//!
//! ```text
//! byte offset   0 .. 4N      f32 score[0..N]   (result order)
//! byte offset  4N .. 8N      i32 id[0..N]      (same order)
//! ```
//!
//! `score[i]` lives at `4 * i` and `id[i]` at `4 * (N + i)`. The reported hit
//! count is exactly `N`.

use crate::backend::results::{ScoreDoc, TopDocs};
use crate::core::error::{Error, Result};

const WORD: usize = 4;

/// Number of results held by a buffer of `byte_len` bytes.
pub fn result_count(byte_len: usize) -> Result<usize> {
    if byte_len % (2 * WORD) != 0 {
        return Err(Error::parse(format!(
            "native result buffer of {} bytes is not a whole number of (score, id) pairs",
            byte_len
        )));
    }
    Ok(byte_len / (2 * WORD))
}

fn word_at(buf: &[u8], offset: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word.copy_from_slice(&buf[offset..offset + WORD]);
    word
}

pub fn score_at(buf: &[u8], n: usize, i: usize) -> f32 {
    debug_assert!(i < n);
    f32::from_ne_bytes(word_at(buf, WORD * i))
}

pub fn id_at(buf: &[u8], n: usize, i: usize) -> i32 {
    debug_assert!(i < n);
    i32::from_ne_bytes(word_at(buf, WORD * (n + i)))
}

/// Decode a native result buffer into ranked hits, preserving buffer order.
pub fn decode_top_docs(buf: &[u8]) -> Result<TopDocs> {
    let n = result_count(buf.len())?;
    let score_docs = (0..n)
        .map(|i| ScoreDoc::new(id_at(buf, n, i), score_at(buf, n, i)))
        .collect();
    Ok(TopDocs::new(score_docs))
}

/// Lay out `(score, id)` pairs the way a native search call returns them.
pub fn encode_top_docs(hits: &[ScoreDoc]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(hits.len() * 2 * WORD);
    for hit in hits {
        buf.extend_from_slice(&hit.score.to_ne_bytes());
    }
    for hit in hits {
        buf.extend_from_slice(&hit.doc.to_ne_bytes());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::results::TotalHitsRelation;
    use crate::core::error::ErrorKind;

    fn raw(scores: &[f32], ids: &[i32]) -> Vec<u8> {
        let mut buf = Vec::new();
        scores.iter().for_each(|s| buf.extend_from_slice(&s.to_ne_bytes()));
        ids.iter().for_each(|d| buf.extend_from_slice(&d.to_ne_bytes()));
        buf
    }

    #[test]
    fn reads_scores_then_ids() {
        let buf = raw(&[0.5, 0.25, 0.125], &[7, -3, 42]);
        let top = decode_top_docs(&buf).unwrap();
        assert_eq!(top.doc_ids(), vec![7, -3, 42]);
        assert_eq!(top.scores(), vec![0.5, 0.25, 0.125]);
        assert_eq!(top.total_hits.value, 3);
        assert_eq!(top.total_hits.relation, TotalHitsRelation::EqualTo);
    }

    #[test]
    fn forty_bytes_hold_exactly_five_hits() {
        let buf = raw(&[1.0, 2.0, 3.0, 4.0, 5.0], &[10, 11, 12, 13, 14]);
        assert_eq!(buf.len(), 40);
        let top = decode_top_docs(&buf).unwrap();
        assert_eq!(top.score_docs.len(), 5);
        assert_eq!(top.total_hits.value, 5);
        assert_eq!(top.total_hits.relation, TotalHitsRelation::EqualTo);
    }

    #[test]
    fn offsets_match_protocol_for_every_index() {
        let scores: Vec<f32> = (0..17).map(|i| i as f32 * 0.75 - 3.0).collect();
        let ids: Vec<i32> = (0..17).map(|i| 1000 - i * 13).collect();
        let buf = raw(&scores, &ids);
        let n = buf.len() / 8;
        let top = decode_top_docs(&buf).unwrap();
        for i in 0..n {
            let score = f32::from_ne_bytes(buf[4 * i..4 * i + 4].try_into().unwrap());
            let id = i32::from_ne_bytes(buf[4 * (n + i)..4 * (n + i) + 4].try_into().unwrap());
            assert_eq!(top.score_docs[i].score.to_bits(), score.to_bits());
            assert_eq!(top.score_docs[i].doc, id);
        }
    }

    #[test]
    fn interleaved_reading_is_not_the_protocol() {
        // Row-major (score, id) pairs would pair score[0] with score[1]'s bits.
        let scores = [0.9f32, 0.8, 0.7, 0.6];
        let ids = [100i32, 200, 300, 400];
        let buf = raw(&scores, &ids);

        let interleaved: Vec<(f32, i32)> = buf
            .chunks_exact(8)
            .map(|c| {
                (
                    f32::from_ne_bytes(c[..4].try_into().unwrap()),
                    i32::from_ne_bytes(c[4..].try_into().unwrap()),
                )
            })
            .collect();
        let top = decode_top_docs(&buf).unwrap();
        let decoded: Vec<(f32, i32)> = top.score_docs.iter().map(|h| (h.score, h.doc)).collect();

        assert_ne!(decoded, interleaved);
        assert_eq!(decoded, vec![(0.9, 100), (0.8, 200), (0.7, 300), (0.6, 400)]);
        // The interleaved view would report score bits as ids.
        assert_eq!(interleaved[0].1, 0.8f32.to_bits() as i32);
    }

    #[test]
    fn encode_round_trips() {
        let hits: Vec<ScoreDoc> = (0..9).map(|i| ScoreDoc::new(i * 3 - 4, 1.0 / (i as f32 + 1.0))).collect();
        let buf = encode_top_docs(&hits);
        assert_eq!(buf.len(), hits.len() * 8);
        assert_eq!(decode_top_docs(&buf).unwrap().score_docs, hits);
    }

    #[test]
    fn empty_buffer_is_zero_hits() {
        let top = decode_top_docs(&[]).unwrap();
        assert!(top.score_docs.is_empty());
        assert_eq!(top.total_hits.value, 0);
    }

    #[test]
    fn ragged_buffer_is_rejected() {
        let err = decode_top_docs(&[0u8; 12]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }
}
