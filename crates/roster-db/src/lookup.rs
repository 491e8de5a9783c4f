/// Outcome of a single-row lookup.
///
/// Absence is a normal outcome here, not an error, so callers branch on
/// `NotFound` directly instead of inspecting the error they got back.
#[derive(Debug)]
pub enum Lookup<T, E = roster_common::Error> {
    Found(T),
    NotFound,
    Error(E),
}

impl<T, E> Lookup<T, E> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U, E> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Error(e) => Lookup::Error(e),
        }
    }
}

impl<T, E> From<Result<Option<T>, E>> for Lookup<T, E> {
    fn from(result: Result<Option<T>, E>) -> Self {
        match result {
            Ok(Some(value)) => Lookup::Found(value),
            Ok(None) => Lookup::NotFound,
            Err(e) => Lookup::Error(e),
        }
    }
}
