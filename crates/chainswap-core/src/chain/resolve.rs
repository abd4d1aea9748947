use crate::{
    chain::FieldChain,
    db::{Db, RecordSet},
    error::Error,
};

/// Follow each relational segment from `root`, unioning the related records
/// at every hop. An empty root yields the empty set of the model the path
/// reaches; field metadata is still checked.
pub fn traverse<S: AsRef<str>>(db: &Db, root: &RecordSet, path: &[S]) -> Result<RecordSet, Error> {
    let mut current = root.clone();

    for segment in path {
        current = db.mapped(&current, segment.as_ref())?;
    }

    Ok(current)
}

/// Records that receive the swapped value for one chain: the records
/// reached by its hops. The caller writes `chain.terminal()` on them.
pub fn resolve_targets(db: &Db, root: &RecordSet, chain: &FieldChain) -> Result<RecordSet, Error> {
    let targets = traverse(db, root, chain.hops())?;
    tracing::debug!(
        chain = chain.as_str(),
        model = targets.model(),
        count = targets.len(),
        "resolved chain targets"
    );

    Ok(targets)
}
