//! Query entry: [`WhereClause`] selects an index and a predicate, producing
//! a lazy [`Collection`] whose terminal operations run through the read
//! pipeline and the mutation executor.

mod collection;
mod where_clause;

pub use collection::Collection;
pub use where_clause::WhereClause;
