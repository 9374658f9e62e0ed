#![forbid(unsafe_code)]

//! Named state transitions for [`Store::dispatch`](crate::Store::dispatch).

use std::fmt;
use std::rc::Rc;

use crate::store::State;

/// Transform applied by a [`Action::Custom`].
pub type Transform = Rc<dyn Fn(&State) -> State>;

/// A state transition.
#[derive(Clone)]
pub enum Action {
    /// Shallow-merge the payload into the state.
    Set(State),
    /// Same as `Set`; kept as a separate name for call-site intent.
    Update(State),
    /// Drop the listed top-level keys.
    Delete(Vec<String>),
    /// Replace the whole state.
    Reset(State),
    /// Application-defined transition. Without a transform the state is
    /// left as it is.
    Custom {
        name: String,
        transform: Option<Transform>,
    },
}

impl Action {
    /// Build a custom action with a transform.
    pub fn custom(name: impl Into<String>, transform: impl Fn(&State) -> State + 'static) -> Self {
        Self::Custom {
            name: name.into(),
            transform: Some(Rc::new(transform)),
        }
    }

    /// Build a delete action for one or more keys.
    pub fn delete<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::Delete(keys.into_iter().map(Into::into).collect())
    }

    /// Name used in log records.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Set(_) => "SET",
            Self::Update(_) => "UPDATE",
            Self::Delete(_) => "DELETE",
            Self::Reset(_) => "RESET",
            Self::Custom { name, .. } => name,
        }
    }

    /// Compute the state following `state`.
    #[must_use]
    pub fn apply(&self, state: &State) -> State {
        match self {
            Self::Set(partial) | Self::Update(partial) => merge(state, partial),
            Self::Delete(keys) => {
                let mut next = state.clone();
                for key in keys {
                    next.shift_remove(key);
                }
                next
            }
            Self::Reset(replacement) => replacement.clone(),
            Self::Custom {
                transform: Some(transform),
                ..
            } => transform(state),
            Self::Custom {
                transform: None, ..
            } => state.clone(),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(partial) => f.debug_tuple("Set").field(partial).finish(),
            Self::Update(partial) => f.debug_tuple("Update").field(partial).finish(),
            Self::Delete(keys) => f.debug_tuple("Delete").field(keys).finish(),
            Self::Reset(state) => f.debug_tuple("Reset").field(state).finish(),
            Self::Custom { name, transform } => f
                .debug_struct("Custom")
                .field("name", name)
                .field("transform", &transform.is_some())
                .finish(),
        }
    }
}

/// Shallow merge: top-level keys of `partial` overwrite, everything else is
/// kept in its original position.
pub(crate) fn merge(state: &State, partial: &State) -> State {
    let mut next = state.clone();
    for (key, value) in partial {
        next.insert(key.clone(), value.clone());
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn state(value: serde_json::Value) -> State {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn set_merges_shallowly() {
        let base = state(json!({"a": 0, "b": {"deep": 1}, "c": 3}));
        let next = Action::Set(state(json!({"a": 1, "b": {"other": 2}}))).apply(&base);
        assert_eq!(next, state(json!({"a": 1, "b": {"other": 2}, "c": 3})));
    }

    #[test]
    fn delete_and_reset() {
        let base = state(json!({"a": 1, "b": 2, "c": 3}));
        assert_eq!(
            Action::delete(["a", "c"]).apply(&base),
            state(json!({"b": 2}))
        );
        assert_eq!(
            Action::Reset(State::new()).apply(&base),
            State::new()
        );
    }

    #[test]
    fn custom_without_transform_is_identity() {
        let base = state(json!({"n": 1}));
        let action = Action::Custom {
            name: "UNKNOWN".into(),
            transform: None,
        };
        assert_eq!(action.apply(&base), base);
        assert_eq!(action.name(), "UNKNOWN");
    }

    #[test]
    fn custom_transform_sees_current_state() {
        let double = Action::custom("DOUBLE", |s| {
            let n = s.get("n").and_then(serde_json::Value::as_i64).unwrap_or(0);
            state(json!({"n": n * 2}))
        });
        assert_eq!(double.apply(&state(json!({"n": 21}))), state(json!({"n": 42})));
    }
}
