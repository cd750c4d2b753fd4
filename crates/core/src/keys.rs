//! Composite identifiers for events, steps and labels
//!
//! Keys are plain strings joined with `-`:
//!
//! ```text
//! event: <user>-<event name>-<event id>
//! step:  <event key>-<step name>-<step number>
//! label: <step key>-<label key>
//! ```
//!
//! Every client-supplied component is escaped before joining (`\` becomes
//! `\\`, `-` becomes `\-`), so a name that contains the separator can never
//! produce the same key as a different tuple of names. Components without
//! either character come out unchanged, which keeps keys readable.
//!
//! The step number is written in decimal and is not escaped; it is the last
//! component of a step key and can only contain digits and a leading sign.

use std::borrow::Cow;
use std::fmt;

/// Separator between key components
pub const SEPARATOR: char = '-';

const ESCAPE: char = '\\';

/// Escape a single key component
///
/// Returns the input unchanged (borrowed) when it holds neither the
/// separator nor the escape character.
pub fn escape_component(component: &str) -> Cow<'_, str> {
    if !component.contains(|c| c == SEPARATOR || c == ESCAPE) {
        return Cow::Borrowed(component);
    }
    let mut escaped = String::with_capacity(component.len() + 4);
    for c in component.chars() {
        if c == SEPARATOR || c == ESCAPE {
            escaped.push(ESCAPE);
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

/// Key of an event record: `(user, event name, event id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey(String);

impl EventKey {
    /// Derive the key for an event instance of `user`
    ///
    /// # Examples
    ///
    /// ```
    /// use stepline_core::EventKey;
    ///
    /// let key = EventKey::new("morel", "build", "42");
    /// assert_eq!(key.as_str(), "morel-build-42");
    /// ```
    pub fn new(user: &str, event_name: &str, event_id: &str) -> Self {
        EventKey(format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            escape_component(user),
            escape_component(event_name),
            escape_component(event_id)
        ))
    }

    /// Wrap an already-derived key, e.g. one read back from storage
    pub fn from_raw(raw: impl Into<String>) -> Self {
        EventKey(raw.into())
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EventKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key of a step record
///
/// Carries the owning event, the step name and number alongside the
/// composite id. Steps are unique per `(event, number)`: the document
/// adapter addresses them that way, the relational adapter by [`id`].
///
/// [`id`]: StepKey::id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepKey {
    event: EventKey,
    name: String,
    number: i64,
    id: String,
}

impl StepKey {
    /// Derive the key for step `number` named `name` within `event`
    ///
    /// # Examples
    ///
    /// ```
    /// use stepline_core::{EventKey, StepKey};
    ///
    /// let event = EventKey::new("morel", "build", "42");
    /// let step = StepKey::new(&event, "compile", 1);
    /// assert_eq!(step.id(), "morel-build-42-compile-1");
    /// assert_eq!(step.number(), 1);
    /// ```
    pub fn new(event: &EventKey, name: &str, number: i64) -> Self {
        let id = format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            event,
            escape_component(name),
            number
        );
        StepKey {
            event: event.clone(),
            name: name.to_string(),
            number,
            id,
        }
    }

    /// Owning event
    pub fn event(&self) -> &EventKey {
        &self.event
    }

    /// Step name as supplied by the update
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Step number, unique within the event
    pub fn number(&self) -> i64 {
        self.number
    }

    /// Composite step id
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Key of a label record: `(step, label key)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelKey(String);

impl LabelKey {
    /// Derive the key for label `key` on `step`
    pub fn new(step: &StepKey, key: &str) -> Self {
        Self::from_step_id(step.id(), key)
    }

    /// Derive the key for label `key` on the step stored under `step_id`
    pub fn from_step_id(step_id: &str, key: &str) -> Self {
        LabelKey(format!("{}{SEPARATOR}{}", step_id, escape_component(key)))
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LabelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
