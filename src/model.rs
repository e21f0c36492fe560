//! Domain records persisted by the store
//!
//! Slot numbers are `u64` in the domain and travel as `i64` cells, SQLite
//! having no unsigned 64-bit affinity. The converters in
//! `database::convert` re-widen them on the way out.

/// A UTXO-like record, the unit the chain follower ingests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    /// Opaque byte identifier, unique across the store.
    pub ext_output_reference: Vec<u8>,
    /// Case-insensitive at query time.
    pub address: String,
    pub value: Vec<u8>,
    pub datum_hash: Option<Vec<u8>>,
    pub script_hash: Option<Vec<u8>>,
    pub payment_credential: String,
    pub transaction_index: u32,
    pub output_index: u32,
    /// Slot of the checkpoint this input was created at.
    pub created_at: u64,
    /// Slot this input was spent at, when known. Always within
    /// `created_at ..= tip`.
    pub spent_at: Option<u64>,
}

/// An input together with the payloads it references, when the follower has
/// them at hand. `insert_inputs` upserts the attachments alongside the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub input: Input,
    pub datum: Option<BinaryData>,
    pub script: Option<ScriptReference>,
}

impl From<Input> for ResolvedInput {
    fn from(input: Input) -> Self {
        Self {
            input,
            datum: None,
            script: None,
        }
    }
}

/// A `(slot, header hash)` marker identifying a point of the ingested chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub slot_no: u64,
    pub header_hash: Vec<u8>,
}

/// A datum payload, keyed by its hash. Rows no input refers to anymore are
/// garbage-collected by `prune_binary_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryData {
    pub binary_data_hash: Vec<u8>,
    pub binary_data: Vec<u8>,
}

/// A reference script payload, keyed by its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReference {
    pub script_hash: Vec<u8>,
    pub script: Vec<u8>,
}

/// Associates an input with one monetary policy carried in its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub output_reference: Vec<u8>,
    pub policy_id: Vec<u8>,
}

/// Row shape streamed by `fold_inputs`: the input plus the checkpoints it
/// references for creation and, when spent, for spending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldedInput {
    pub input: Input,
    pub created_point: Checkpoint,
    pub spent_point: Option<Checkpoint>,
}
