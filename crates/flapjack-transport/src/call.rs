//! Call type flags used to route requests to eligible hosts.

use std::fmt;
use std::ops::BitOr;

/// Classification of a request as read, write, or either.
///
/// Used both to tag which calls a host accepts and to tag each outgoing
/// request's requirement. Flags compose with `|`:
///
/// ```
/// use flapjack_transport::CallType;
///
/// let both = CallType::READ | CallType::WRITE;
/// assert!(both.contains(CallType::READ));
/// assert!(both.contains(CallType::WRITE));
/// assert!(!CallType::READ.contains(CallType::WRITE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallType(u8);

impl CallType {
    /// Read traffic: search, browse, settings fetches, task status polls.
    pub const READ: CallType = CallType(0b01);

    /// Write traffic: indexing, updates, deletes, settings changes.
    pub const WRITE: CallType = CallType(0b10);

    /// Returns true if `self` covers every flag set in `other`.
    pub fn contains(self, other: CallType) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if this is (or includes) write traffic.
    pub fn is_write(self) -> bool {
        self.contains(CallType::WRITE)
    }
}

impl BitOr for CallType {
    type Output = CallType;

    fn bitor(self, rhs: CallType) -> CallType {
        CallType(self.0 | rhs.0)
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CallType::READ => write!(f, "read"),
            CallType::WRITE => write!(f, "write"),
            CallType(0b11) => write!(f, "read|write"),
            CallType(bits) => write!(f, "calltype({bits:#04b})"),
        }
    }
}
