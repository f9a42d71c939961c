use thiserror::Error;

use crate::types::{Address, GroupId};

/// Reasons the ledger refuses an operation.
///
/// Every variant is a permanent precondition failure: retrying with the same
/// arguments against the same state fails the same way. The `Display` text is
/// meant to be shown to end users as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Already registered")]
    AlreadyRegistered,

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Image required")]
    EmptyImage,

    #[error("First name taken")]
    NameTaken,

    #[error("Not registered")]
    NotRegistered,

    #[error("Recipient not registered")]
    RecipientNotRegistered,

    #[error("Cannot message yourself")]
    SelfMessage,

    #[error("Content cannot be empty")]
    EmptyContent,

    #[error("Group name required")]
    EmptyGroupName,

    #[error("At least one member required")]
    NoMembers,

    #[error("Cannot add yourself")]
    SelfInMembers,

    #[error("Duplicate member: {0}")]
    DuplicateMember(Address),

    #[error("Member not registered: {0}")]
    MemberNotRegistered(Address),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("Only admin")]
    OnlyAdmin,

    #[error("Not a group member")]
    NotMember,

    #[error("Already a member: {0}")]
    AlreadyMember(Address),

    #[error("Too many calls in batch: {len} (max {max})")]
    BatchTooLarge { len: usize, max: usize },
}

impl ChatError {
    /// Stable machine-readable name of the rejection kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered => "AlreadyRegistered",
            Self::EmptyName => "EmptyName",
            Self::EmptyImage => "EmptyImage",
            Self::NameTaken => "NameTaken",
            Self::NotRegistered => "NotRegistered",
            Self::RecipientNotRegistered => "RecipientNotRegistered",
            Self::SelfMessage => "SelfMessage",
            Self::EmptyContent => "EmptyContent",
            Self::EmptyGroupName => "EmptyGroupName",
            Self::NoMembers => "NoMembers",
            Self::SelfInMembers => "SelfInMembers",
            Self::DuplicateMember(_) => "DuplicateMember",
            Self::MemberNotRegistered(_) => "MemberNotRegistered",
            Self::GroupNotFound(_) => "GroupNotFound",
            Self::OnlyAdmin => "OnlyAdmin",
            Self::NotMember => "NotMember",
            Self::AlreadyMember(_) => "AlreadyMember",
            Self::BatchTooLarge { .. } => "BatchTooLarge",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddressError {
    #[error("Invalid address length: expected 40 hex digits, got {0}")]
    InvalidLength(usize),

    #[error("Invalid address hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
