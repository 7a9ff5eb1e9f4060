//! Per-event feature derivation: category resolution, per-source running
//! aggregates, closed-set encoding.

mod aggregates;
mod deriver;

pub use aggregates::{SourceAggregate, SourceAggregates};
pub use deriver::{DropReason, EventFilter, FeatureDeriver, FourthSlot};

use serde::{Deserialize, Serialize};

/// Number of columns in the model input.
pub const FEATURE_WIDTH: usize = 4;

/// Fixed-width feature record handed to the model adapter. Values are kept
/// unscaled here; standardization is batch preprocessing inside the adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeature {
    /// Closed-set code of the resolved service token.
    pub service: u32,
    /// Closed-set code of the resolved flag token.
    pub flag: u32,
    /// Bytes sent toward the server on this flow.
    pub src_bytes: u64,
    /// Destination bytes or the source's distinct-port count, per [`FourthSlot`].
    pub secondary: u64,
}

impl DerivedFeature {
    /// Model-input view, column order fixed.
    pub fn to_vector(&self) -> [f32; FEATURE_WIDTH] {
        [
            self.service as f32,
            self.flag as f32,
            self.src_bytes as f32,
            self.secondary as f32,
        ]
    }
}

/// Side-channel fields echoed into every prediction record. Never part of
/// the model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub src_ip: String,
    pub dest_port: Option<u16>,
    pub proto: Option<String>,
    pub service: String,
    pub flag: String,
    pub timestamp: Option<String>,
}

/// One derived event waiting for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub features: DerivedFeature,
    pub metadata: Metadata,
}
