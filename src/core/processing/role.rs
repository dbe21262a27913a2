use crate::types::{ProcessedResult, Role};

/// Classify an upload by its filename. "back" wins over "side"; anything else is the front view.
pub fn guess_role(filename: &str) -> Role {
    let name = filename.to_lowercase();
    if name.contains("back") {
        Role::Back
    } else if name.contains("side") {
        Role::Side
    } else {
        Role::Front
    }
}

/// Anything that carries a role can be deduplicated.
pub trait HasRole {
    fn role(&self) -> Role;
}

impl HasRole for ProcessedResult {
    fn role(&self) -> Role {
        self.role
    }
}

/// Keep at most one entry per role. A later entry replaces an earlier one
/// in place, so each role keeps the slot of its first appearance.
pub fn dedup_by_role<T: HasRole>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(3);
    for item in items {
        match out.iter().position(|existing| existing.role() == item.role()) {
            Some(idx) => out[idx] = item,
            None => out.push(item),
        }
    }
    out
}
