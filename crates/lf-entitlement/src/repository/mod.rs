//! Repository Layer
//!
//! SQLite repositories for all domain entities. Writes on the entitlement
//! path are conflict-aware single statements; the schema's unique
//! constraints, not read-before-write checks, provide correctness under
//! concurrent reconciliation.

pub mod account;
pub mod chapter;
pub mod chapter_access;
pub mod course;
pub mod ledger;

pub use account::AccountRepository;
pub use chapter::ChapterRepository;
pub use chapter_access::ChapterAccessRepository;
pub use course::CourseRepository;
pub use ledger::LedgerRepository;
