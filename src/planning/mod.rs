//! Pure planning logic: completion aggregation, calendar week math, and
//! the display ordering policy for plan lists. Everything here is
//! synchronous and side-effect free; handlers are responsible for
//! persisting whatever these functions derive.

pub mod dates;
pub mod ordering;
pub mod stats;
