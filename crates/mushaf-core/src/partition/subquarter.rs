//! Arithmetic between global sub-quarters and (sixtieth, offset) pairs

use serde::{Serialize, Deserialize};

/// Sub-quarters per sixtieth
pub const QUARTERS_PER_SIXTIETH: u32 = 4;

/// A quarter of a sixtieth, addressed by its sixtieth and a 0..=3 offset
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubQuarter {
    /// 1-based sixtieth index
    pub sixtieth: u32,
    /// Offset inside the sixtieth, 0..=3
    pub offset: u8,
}

impl SubQuarter {
    /// Build from a sixtieth index and an offset, rejecting offsets above 3
    pub fn new(sixtieth: u32, offset: u8) -> Option<Self> {
        if sixtieth == 0 || u32::from(offset) >= QUARTERS_PER_SIXTIETH {
            return None;
        }
        Some(Self { sixtieth, offset })
    }

    /// Split a 1-based global sub-quarter index.
    ///
    /// `sixtieth = q / 4 + (q % 4 > 0)`; a remainder `r > 0` is offset `r - 1`,
    /// a remainder of 0 is offset 3 of the previous sixtieth.
    pub fn from_global(q: u32) -> Option<Self> {
        if q == 0 {
            return None;
        }
        let remainder = q % QUARTERS_PER_SIXTIETH;
        let sixtieth = q / QUARTERS_PER_SIXTIETH + u32::from(remainder > 0);
        let offset = if remainder == 0 { 3 } else { remainder - 1 };
        Some(Self {
            sixtieth,
            offset: offset as u8,
        })
    }

    /// `(sixtieth - 1) * 4 + offset + 1`
    pub fn global(&self) -> u32 {
        (self.sixtieth - 1) * QUARTERS_PER_SIXTIETH + u32::from(self.offset) + 1
    }

    /// The first sub-quarter of a sixtieth
    pub fn first_of(sixtieth: u32) -> Option<Self> {
        Self::new(sixtieth, 0)
    }
}
