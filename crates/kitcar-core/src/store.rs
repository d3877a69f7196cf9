//! The inert, stored form of a part.
//!
//! Storing a part into an inventory destroys its world representation and
//! keeps only what is needed to respawn it: the definition id and the
//! runtime state. The binary form is `bitcode` behind a small versioned
//! header.

use crate::definition::PartDefinition;
use crate::graph::PartGraph;
use crate::id::{DefinitionId, PartId};
use crate::part::PartError;
use crate::state::RuntimeState;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying an encoded stored part.
pub const STORED_PART_MAGIC: u32 = 0x4B17_5701;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", STORED_PART_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
}

// ---------------------------------------------------------------------------
// StoredPart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPartHeader {
    magic: u32,
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    header: StoredPartHeader,
    part: StoredPart,
}

/// A part taken out of the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPart {
    pub definition: DefinitionId,
    pub state: RuntimeState,
}

impl StoredPart {
    pub fn new(definition: &PartDefinition, state: RuntimeState) -> Self {
        Self {
            definition: definition.id,
            state,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        let envelope = Envelope {
            header: StoredPartHeader {
                magic: STORED_PART_MAGIC,
                version: FORMAT_VERSION,
            },
            part: self.clone(),
        };
        bitcode::serialize(&envelope).map_err(|e| StoreError::Encode(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, StoreError> {
        let envelope: Envelope =
            bitcode::deserialize(data).map_err(|e| StoreError::Decode(e.to_string()))?;
        if envelope.header.magic != STORED_PART_MAGIC {
            return Err(StoreError::InvalidMagic(envelope.header.magic));
        }
        if envelope.header.version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion(envelope.header.version));
        }
        Ok(envelope.part)
    }
}

impl PartGraph {
    /// Destroy a part and keep its state as inert data.
    pub fn store_part(&mut self, part: PartId) -> Result<StoredPart, PartError> {
        let (definition, state) = self.destroy_inner(part)?;
        tracing::debug!(?part, definition = %definition.name, "part stored");
        Ok(StoredPart::new(&definition, state))
    }
}
