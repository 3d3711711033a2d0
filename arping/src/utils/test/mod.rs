//! Test doubles for the two collaborators of an operation: the interface source and the link.

pub(crate) mod link;
