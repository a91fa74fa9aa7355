//! Reading-order recovery.
//!
//! The ordering model only sees a bounded window of words, so a page is cut
//! into fixed-size chunks. Each chunk is ordered independently and the chunk
//! texts are stitched back together in submission order; words never move
//! across a chunk boundary.
//!
//! The model itself sits behind [`OrderingBackend`]. A failing chunk keeps
//! its original word order rather than being dropped.

use crate::types::NormalizedBox;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of tokens handed to the ordering model at once
pub const DEFAULT_CHUNK_SIZE: usize = 350;

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("ordering backend failed: {0}")]
    Backend(String),

    #[error("backend returned an invalid permutation for {expected} words: {detail}")]
    InvalidPermutation { expected: usize, detail: String },
}

/// Backend trait for reading-order inference
///
/// Implementations receive one chunk at a time and return chunk-local
/// indices in reading order.
pub trait OrderingBackend {
    fn infer_order(
        &self,
        words: &[String],
        boxes: &[NormalizedBox],
    ) -> Result<Vec<usize>, OrderingError>;

    /// Backend identifier for logging/debugging
    fn name(&self) -> &str;
}

/// No-op backend: natural (extraction) order
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityOrdering;

impl OrderingBackend for IdentityOrdering {
    fn infer_order(
        &self,
        words: &[String],
        _boxes: &[NormalizedBox],
    ) -> Result<Vec<usize>, OrderingError> {
        Ok((0..words.len()).collect())
    }

    fn name(&self) -> &str {
        "identity"
    }
}

/// Geometric heuristic: top to bottom, then left to right
#[derive(Debug, Default, Clone, Copy)]
pub struct SpatialOrdering;

impl OrderingBackend for SpatialOrdering {
    fn infer_order(
        &self,
        words: &[String],
        boxes: &[NormalizedBox],
    ) -> Result<Vec<usize>, OrderingError> {
        if boxes.len() != words.len() {
            return Err(OrderingError::Backend(format!(
                "{} words but {} boxes",
                words.len(),
                boxes.len()
            )));
        }
        let mut order: Vec<usize> = (0..words.len()).collect();
        order.sort_by(|&a, &b| {
            boxes[a]
                .y1
                .cmp(&boxes[b].y1)
                .then_with(|| boxes[a].x1.cmp(&boxes[b].x1))
        });
        Ok(order)
    }

    fn name(&self) -> &str {
        "spatial"
    }
}

pub struct ReadingOrderEngine {
    backend: Box<dyn OrderingBackend>,
    chunk_size: usize,
}

impl Default for ReadingOrderEngine {
    fn default() -> Self {
        Self::new(Box::new(IdentityOrdering))
    }
}

impl ReadingOrderEngine {
    pub fn new(backend: Box<dyn OrderingBackend>) -> Self {
        Self::with_chunk_size(backend, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(backend: Box<dyn OrderingBackend>, chunk_size: usize) -> Self {
        Self {
            backend,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Produce the best-guess linear reading order of a page's words
    pub fn order(&self, words: &[String], boxes: &[NormalizedBox]) -> String {
        let len = if words.len() != boxes.len() {
            warn!(
                "{} words but {} boxes, ordering the first {}",
                words.len(),
                boxes.len(),
                words.len().min(boxes.len())
            );
            words.len().min(boxes.len())
        } else {
            words.len()
        };

        let mut ordered: Vec<&str> = Vec::with_capacity(len);
        for (chunk_index, start) in (0..len).step_by(self.chunk_size).enumerate() {
            let end = (start + self.chunk_size).min(len);
            let chunk_words = &words[start..end];
            let chunk_boxes = &boxes[start..end];
            if chunk_words.is_empty() {
                continue;
            }

            match self.order_chunk(chunk_words, chunk_boxes) {
                Ok(order) => {
                    debug!(
                        "Ordered chunk {} ({} words) with {}",
                        chunk_index,
                        chunk_words.len(),
                        self.backend.name()
                    );
                    ordered.extend(order.into_iter().map(|i| chunk_words[i].as_str()));
                }
                Err(e) => {
                    warn!(
                        "Reading-order inference failed on chunk starting at word {}: {} - keeping original order",
                        start, e
                    );
                    ordered.extend(chunk_words.iter().map(String::as_str));
                }
            }
        }

        ordered.join(" ")
    }

    fn order_chunk(
        &self,
        words: &[String],
        boxes: &[NormalizedBox],
    ) -> Result<Vec<usize>, OrderingError> {
        let order = self.backend.infer_order(words, boxes)?;
        validate_permutation(&order, words.len())?;
        Ok(order)
    }
}

/// A usable order mentions every chunk-local index exactly once
fn validate_permutation(order: &[usize], expected: usize) -> Result<(), OrderingError> {
    if order.len() != expected {
        return Err(OrderingError::InvalidPermutation {
            expected,
            detail: format!("got {} indices", order.len()),
        });
    }
    let mut seen = vec![false; expected];
    for &index in order {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(OrderingError::InvalidPermutation {
                    expected,
                    detail: format!("index {index} repeated"),
                })
            }
            None => {
                return Err(OrderingError::InvalidPermutation {
                    expected,
                    detail: format!("index {index} out of range"),
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Reverses every chunk and records chunk sizes
    #[derive(Clone)]
    struct ReverseBackend {
        calls: Rc<RefCell<Vec<usize>>>,
    }

    impl ReverseBackend {
        fn new() -> Self {
            Self {
                calls: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl OrderingBackend for ReverseBackend {
        fn infer_order(
            &self,
            words: &[String],
            _boxes: &[NormalizedBox],
        ) -> Result<Vec<usize>, OrderingError> {
            self.calls.borrow_mut().push(words.len());
            Ok((0..words.len()).rev().collect())
        }

        fn name(&self) -> &str {
            "reverse"
        }
    }

    /// Fails on every chunk whose first word matches
    struct FailOn(&'static str);

    impl OrderingBackend for FailOn {
        fn infer_order(
            &self,
            words: &[String],
            _boxes: &[NormalizedBox],
        ) -> Result<Vec<usize>, OrderingError> {
            if words.first().map(String::as_str) == Some(self.0) {
                return Err(OrderingError::Backend("model exploded".to_string()));
            }
            Ok((0..words.len()).rev().collect())
        }

        fn name(&self) -> &str {
            "fail-on"
        }
    }

    struct Constant(Vec<usize>);

    impl OrderingBackend for Constant {
        fn infer_order(
            &self,
            _words: &[String],
            _boxes: &[NormalizedBox],
        ) -> Result<Vec<usize>, OrderingError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "constant"
        }
    }

    fn words(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("w{i}")).collect()
    }

    #[test]
    fn test_single_chunk_applies_permutation() {
        let engine = ReadingOrderEngine::new(Box::new(Constant(vec![2, 0, 1])));
        let text = engine.order(&words(3), &[NormalizedBox::ZERO; 3]);
        assert_eq!(text, "w2 w0 w1");
    }

    #[test]
    fn test_chunks_never_cross_boundaries() {
        let backend = ReverseBackend::new();
        let engine = ReadingOrderEngine::with_chunk_size(Box::new(backend.clone()), 2);
        let text = engine.order(&words(5), &[NormalizedBox::ZERO; 5]);
        assert_eq!(text, "w1 w0 w3 w2 w4");
        assert_eq!(*backend.calls.borrow(), vec![2, 2, 1]);
    }

    #[test]
    fn test_default_chunk_size_is_350() {
        let backend = ReverseBackend::new();
        let engine = ReadingOrderEngine::new(Box::new(backend.clone()));
        engine.order(&words(800), &vec![NormalizedBox::ZERO; 800]);
        assert_eq!(*backend.calls.borrow(), vec![350, 350, 100]);
    }

    #[test]
    fn test_failed_chunk_keeps_original_order() {
        let engine = ReadingOrderEngine::with_chunk_size(Box::new(FailOn("w2")), 2);
        let text = engine.order(&words(6), &[NormalizedBox::ZERO; 6]);
        assert_eq!(text, "w1 w0 w2 w3 w5 w4");
    }

    #[test]
    fn test_invalid_permutation_falls_back() {
        let engine = ReadingOrderEngine::new(Box::new(Constant(vec![0, 0, 1])));
        assert_eq!(engine.order(&words(3), &[NormalizedBox::ZERO; 3]), "w0 w1 w2");

        let engine = ReadingOrderEngine::new(Box::new(Constant(vec![0, 7, 1])));
        assert_eq!(engine.order(&words(3), &[NormalizedBox::ZERO; 3]), "w0 w1 w2");

        let engine = ReadingOrderEngine::new(Box::new(Constant(vec![1, 0])));
        assert_eq!(engine.order(&words(3), &[NormalizedBox::ZERO; 3]), "w0 w1 w2");
    }

    #[test]
    fn test_empty_input_makes_no_calls() {
        let backend = ReverseBackend::new();
        let engine = ReadingOrderEngine::new(Box::new(backend.clone()));
        assert_eq!(engine.order(&[], &[]), "");
        assert!(backend.calls.borrow().is_empty());
    }

    #[test]
    fn test_spatial_ordering_reads_rows() {
        let boxes = [
            NormalizedBox::new(500, 100, 600, 120),
            NormalizedBox::new(100, 100, 200, 120),
            NormalizedBox::new(100, 10, 200, 30),
        ];
        let engine = ReadingOrderEngine::new(Box::new(SpatialOrdering));
        let text = engine.order(&["right".into(), "left".into(), "title".into()], &boxes);
        assert_eq!(text, "title left right");
    }
}
