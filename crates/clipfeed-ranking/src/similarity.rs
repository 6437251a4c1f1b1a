use clipfeed_dialect::DialectHandle;
use clipfeed_models::Id;
use sqlx::Row;

use crate::Error;

/// Decodes a little-endian float32 blob (§4.8). Returns `None` if the blob
/// is empty or its length isn't a multiple of 4 bytes.
pub fn blob_to_vec(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.is_empty() || blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

/// Encodes a float32 vector as a little-endian blob (§4.8).
pub fn vec_to_blob(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Cosine similarity between two vectors; 0 for differing lengths or a
/// zero-norm operand (§4.8).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// §4.8's blend weights between text and visual similarity.
const TEXT_WEIGHT: f32 = 0.6;
const VISUAL_WEIGHT: f32 = 0.4;

/// Maximum number of other ready clips' embeddings scanned per request
/// (§4.8) — a self-hosted-scale bound, not a configurable tunable.
const SCAN_LIMIT: i64 = 500;

#[derive(Clone, Debug, PartialEq)]
pub struct SimilarClip {
    pub clip_id: Id,
    pub similarity: f64,
}

/// Implements `GET /clips/{id}/similar` (§4.8): blends text and visual
/// cosine similarity against up to 500 other ready clips, returning the
/// top `limit` by blended score. Fails with [`Error::NoEmbedding`] if the
/// reference clip has neither embedding.
pub async fn find_similar_clips(
    handle: &DialectHandle,
    reference_clip_id: Id,
    limit: usize,
) -> Result<Vec<SimilarClip>, Error> {
    let reference_row = sqlx::query(
        handle
            .query("SELECT text_embedding, visual_embedding FROM clip_embeddings WHERE clip_id = ?")
            .as_str(),
    )
    .bind(reference_clip_id.to_string())
    .fetch_optional(handle.pool())
    .await?;

    let Some(reference_row) = reference_row else {
        return Err(Error::NoEmbedding);
    };

    let reference_text: Option<Vec<u8>> = reference_row.try_get("text_embedding")?;
    let reference_visual: Option<Vec<u8>> = reference_row.try_get("visual_embedding")?;
    let reference_text = reference_text.as_deref().and_then(blob_to_vec);
    let reference_visual = reference_visual.as_deref().and_then(blob_to_vec);

    if reference_text.is_none() && reference_visual.is_none() {
        return Err(Error::NoEmbedding);
    }

    let candidate_rows = sqlx::query(
        handle
            .query(
                "SELECT e.clip_id, e.text_embedding, e.visual_embedding \
                 FROM clip_embeddings e \
                 JOIN clips c ON c.id = e.clip_id \
                 WHERE c.status = 'ready' AND e.clip_id != ? \
                 LIMIT ?",
            )
            .as_str(),
    )
    .bind(reference_clip_id.to_string())
    .bind(SCAN_LIMIT)
    .fetch_all(handle.pool())
    .await?;

    let mut scored = Vec::with_capacity(candidate_rows.len());
    for row in &candidate_rows {
        let clip_id: String = row.try_get("clip_id")?;
        let clip_id = clip_id
            .parse::<Id>()
            .map_err(|err| Error::MalformedRow(format!("invalid id {clip_id:?}: {err}")))?;

        let candidate_text: Option<Vec<u8>> = row.try_get("text_embedding")?;
        let candidate_visual: Option<Vec<u8>> = row.try_get("visual_embedding")?;
        let candidate_text = candidate_text.as_deref().and_then(blob_to_vec);
        let candidate_visual = candidate_visual.as_deref().and_then(blob_to_vec);

        if let Some(similarity) = blend(
            reference_text.as_deref(),
            candidate_text.as_deref(),
            reference_visual.as_deref(),
            candidate_visual.as_deref(),
        ) {
            scored.push(SimilarClip {
                clip_id,
                similarity: similarity as f64,
            });
        }
    }

    scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    for item in &mut scored {
        item.similarity = (item.similarity * 10_000.0).round() / 10_000.0;
    }

    Ok(scored)
}

/// Blends text and visual similarity per §4.8: both present blends 0.6/0.4,
/// only one present uses it alone, neither present means no comparison.
fn blend(
    ref_text: Option<&[f32]>,
    candidate_text: Option<&[f32]>,
    ref_visual: Option<&[f32]>,
    candidate_visual: Option<&[f32]>,
) -> Option<f32> {
    let text_sim = match (ref_text, candidate_text) {
        (Some(a), Some(b)) => Some(cosine_similarity(a, b)),
        _ => None,
    };
    let visual_sim = match (ref_visual, candidate_visual) {
        (Some(a), Some(b)) => Some(cosine_similarity(a, b)),
        _ => None,
    };

    match (text_sim, visual_sim) {
        (Some(t), Some(v)) => Some(t * TEXT_WEIGHT + v * VISUAL_WEIGHT),
        (Some(t), None) => Some(t),
        (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_through_the_blob_encoding() {
        let values = vec![1.0f32, -2.5, 0.0, 3.25];
        let blob = vec_to_blob(&values);
        assert_eq!(blob_to_vec(&blob), Some(values));
    }

    #[test]
    fn empty_or_misaligned_blob_decodes_to_none() {
        assert_eq!(blob_to_vec(&[]), None);
        assert_eq!(blob_to_vec(&[1, 2, 3]), None);
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0f32, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn differing_lengths_or_zero_norm_score_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn blend_uses_whichever_modalities_are_present() {
        let a = vec![1.0f32, 0.0];
        let b = vec![1.0f32, 0.0];
        assert!(blend(Some(&a), Some(&b), None, None).unwrap() > 0.99);
        assert!(blend(None, None, Some(&a), Some(&b)).unwrap() > 0.99);
        assert_eq!(blend(None, None, None, None), None);
    }
}
