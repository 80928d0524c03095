use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a group that shares expenses.
///
/// # Examples
///
/// ```
/// use splitsmart_engine::core::member::GroupId;
///
/// let flat = GroupId::new("flat-42");
/// assert_eq!(flat.as_str(), "flat-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Unique identifier for a member of a group.
///
/// Member ids are totally ordered; the settlement minimizer relies on that
/// ordering to break ties between equal balances deterministically.
///
/// # Examples
///
/// ```
/// use splitsmart_engine::core::member::MemberId;
///
/// let asha = MemberId::new("asha");
/// let ravi = MemberId::new("ravi");
/// assert!(asha < ravi);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A participant of a group.
///
/// `payment_id` is the member's UPI handle; creditors without one get no
/// payment deep links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    name: String,
    #[serde(default)]
    payment_id: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

impl Member {
    /// Create an active member without a payment identifier.
    pub fn new(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            payment_id: None,
            active: true,
        }
    }

    /// Attach a payment identifier (UPI handle).
    pub fn with_payment_id(mut self, payment_id: impl Into<String>) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    // --- Accessors ---

    pub fn id(&self) -> &MemberId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payment_id(&self) -> Option<&str> {
        self.payment_id.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
