use serde::{Deserialize, Serialize};

// ===== GEOMETRY =====
// Raw boxes come straight from extraction in page units (ALTO pixels, PDF
// points). Normalized boxes live on the 0-1000 grid the ordering model expects.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from an origin plus extent, the way ALTO stores geometry
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl NormalizedBox {
    pub const ZERO: NormalizedBox = NormalizedBox {
        x1: 0,
        y1: 0,
        x2: 0,
        y2: 0,
    };

    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// All-zero boxes mean "no usable layout" for this word
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

// ===== EXTRACTION TYPES =====

/// A word and where it sits on its page. Extractors never emit empty text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordToken {
    pub text: String,
    pub bbox: BoundingBox,
}

impl WordToken {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Everything a page-oriented extractor hands to the reading-order engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageWords {
    pub size: PageSize,
    pub words: Vec<WordToken>,
}

impl PageWords {
    pub fn texts(&self) -> Vec<String> {
        self.words.iter().map(|w| w.text.clone()).collect()
    }

    pub fn boxes(&self) -> Vec<BoundingBox> {
        self.words.iter().map(|w| w.bbox).collect()
    }
}

// ===== LANGUAGE =====

/// Produced once per document (or sampled prefix) and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetection {
    pub code: String,
    pub confidence: f32,
}
