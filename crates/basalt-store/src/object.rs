use std::fmt;

use serde::{Deserialize, Serialize};

use basalt_types::ObjectId;

/// The kind of ledger object stored.
///
/// The byte and single-character codes are wire values shared with every
/// deployment reading the same database; they must not be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Kind tag for objects written before their type was recorded.
    Unknown,
    /// Full ledger header.
    Ledger,
    /// Transaction blob.
    Transaction,
    /// Account-state tree node.
    AccountNode,
    /// Transaction-tree node.
    TransactionNode,
}

impl ObjectKind {
    /// Wire byte used in the key-value header layout.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Ledger => 1,
            Self::Transaction => 2,
            Self::AccountNode => 3,
            Self::TransactionNode => 4,
        }
    }

    /// Parse the key-value wire byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Unknown),
            1 => Some(Self::Ledger),
            2 => Some(Self::Transaction),
            3 => Some(Self::AccountNode),
            4 => Some(Self::TransactionNode),
            _ => None,
        }
    }

    /// Single-character code used by the SQL column layout.
    pub fn code(self) -> &'static str {
        match self {
            Self::Unknown => "U",
            Self::Ledger => "L",
            Self::Transaction => "T",
            Self::AccountNode => "A",
            Self::TransactionNode => "N",
        }
    }

    /// Parse the SQL single-character code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "U" => Some(Self::Unknown),
            "L" => Some(Self::Ledger),
            "T" => Some(Self::Transaction),
            "A" => Some(Self::AccountNode),
            "N" => Some(Self::TransactionNode),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Ledger => write!(f, "ledger"),
            Self::Transaction => write!(f, "transaction"),
            Self::AccountNode => write!(f, "account-node"),
            Self::TransactionNode => write!(f, "transaction-node"),
        }
    }
}

/// An immutable ledger object: kind tag, originating ledger sequence,
/// payload bytes, and content id.
///
/// `LedgerObject` is the unit of storage. Once constructed it never changes,
/// so a single instance can be shared between the cache and the pending-write
/// queue behind an `Arc` without interior mutability.
#[derive(Clone, PartialEq, Eq)]
pub struct LedgerObject {
    kind: ObjectKind,
    ledger_seq: u32,
    data: Vec<u8>,
    id: ObjectId,
}

impl LedgerObject {
    /// Build an object from its fields. The caller supplies `id`; by
    /// contract it equals the content digest of `data`.
    pub fn new(kind: ObjectKind, ledger_seq: u32, data: Vec<u8>, id: ObjectId) -> Self {
        Self {
            kind,
            ledger_seq,
            data,
            id,
        }
    }

    /// The object's kind tag.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Sequence of the ledger that first referenced this object.
    pub fn ledger_seq(&self) -> u32 {
        self.ledger_seq
    }

    /// The payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The content id (primary key).
    pub fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl fmt::Debug for LedgerObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerObject")
            .field("kind", &self.kind)
            .field("ledger_seq", &self.ledger_seq)
            .field("id", &self.id)
            .field("len", &self.data.len())
            .finish()
    }
}
