//! Domain models for the feature board.
//!
//! # Core Concepts
//!
//! ## The Feature aggregate
//!
//! - [`Feature`]: a user-submitted request together with its embedded
//!   [`Likes`] and [`Comments`] collections, treated as one consistency
//!   unit. The embedded counters always equal the size of their
//!   collections; the two are written together, never independently.
//! - [`Comment`]: owned exclusively by its parent feature; no independent
//!   lifecycle.
//!
//! ## References
//!
//! - [`User`]: referenced by features (owner, likers, comment authors) but
//!   never mutated through the board's HTTP surface. Responses denormalize
//!   name/email/photoURL via [`UserRef`].
//!
//! ## Projections
//!
//! - [`FeatureView`]: the full projection (detail and mutation responses,
//!   comment bodies included).
//! - [`FeatureListItem`]: the trimmed listing projection (comment count
//!   only, to bound payload size).

mod feature;
mod projection;
mod user;

pub use feature::*;
pub use projection::*;
pub use user::*;
