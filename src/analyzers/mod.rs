//! Derivations over a filtered record list.
//!
//! Every function here is total: empty input yields zero counts, `None`
//! averages and empty collections. The include-test flag decides whether
//! each record's test subset is merged into its real subset.

pub mod aggregate;
pub mod types;
pub mod utility;
pub mod view;
pub mod writetos3;
