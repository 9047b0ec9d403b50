//! What to do after creating a resource that is looked up by name
//!
//! Lookup-then-create is not atomic on the provider side. Two processes
//! provisioning the same name at the same moment can both miss the lookup and
//! both create. Nothing here prevents that; `CreateThenReconcile` only makes
//! the racing processes agree on one id afterwards.

use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProvisionStrategy {
    /// Look up by name, create when missing, return the created id
    #[default]
    ListThenCreate,
    /// As `ListThenCreate`, then list again and return the first resource
    /// bearing the name
    CreateThenReconcile,
}

/// Pick the canonical id among same-named resources after a create
///
/// `matches` is a fresh listing filtered by name. An empty listing (the
/// provider has not caught up yet) keeps the id we created.
pub(crate) fn reconcile<R>(
    kind: &str,
    name: &str,
    created_id: String,
    matches: &[R],
    id_of: impl Fn(&R) -> &str,
) -> String {
    let Some(first) = matches.first() else {
        return created_id;
    };

    if matches.len() > 1 {
        let ids: Vec<&str> = matches.iter().map(&id_of).collect();
        warn!(
            "Found {} {}s named {:?} after create: {:?}; using {}",
            matches.len(),
            kind,
            name,
            ids,
            id_of(first)
        );
    }
    id_of(first).to_string()
}
