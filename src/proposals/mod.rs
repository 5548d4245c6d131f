mod lookups;
mod models;
mod refnum;

pub use lookups::{Institution, LookupEntry, Relation};
pub use models::{Proposal, ProposalStatus, Study, Wmo, WmoStatus, YesNoDoubt};
pub use refnum::{next_reference_number, next_revision_reference_number, ReferenceNumber};
