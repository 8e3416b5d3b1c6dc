//! Trace and observation payloads
//!
//! These are the bodies the client facade enqueues. They serialize to the
//! ingestion API's camelCase JSON with unset fields omitted. Child builders
//! such as [`Trace::span`] link a new observation to its trace and parent
//! without enqueuing anything.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Severity of an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationLevel {
    Debug,
    Default,
    Warning,
    Error,
}

/// Free-form key/value metadata
pub type Metadata = HashMap<String, Value>;

/// Builder methods shared by every observation type
macro_rules! observation_builders {
    ($ty:ty) => {
        impl $ty {
            /// Set the observation id
            pub fn with_id(mut self, id: impl Into<String>) -> Self {
                self.id = Some(id.into());
                self
            }

            /// Set the display name
            pub fn with_name(mut self, name: impl Into<String>) -> Self {
                self.name = Some(name.into());
                self
            }

            /// Attach to a trace
            pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
                self.trace_id = Some(trace_id.into());
                self
            }

            /// Nest under another observation
            pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
                self.parent_observation_id = Some(parent_id.into());
                self
            }

            /// Add a metadata entry
            pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
                self.metadata.insert(key.into(), value.into());
                self
            }

            /// Set the input payload
            pub fn with_input(mut self, input: impl Into<Value>) -> Self {
                self.input = Some(input.into());
                self
            }

            /// Set the output payload
            pub fn with_output(mut self, output: impl Into<Value>) -> Self {
                self.output = Some(output.into());
                self
            }

            /// Set the severity and an optional status message
            pub fn with_level(mut self, level: ObservationLevel, message: Option<String>) -> Self {
                self.level = Some(level);
                self.status_message = message;
                self
            }

            /// Set the observation version
            pub fn with_version(mut self, version: impl Into<String>) -> Self {
                self.version = Some(version.into());
                self
            }

            /// Set the start time
            pub fn with_start_time(mut self, time: DateTime<Utc>) -> Self {
                self.start_time = Some(time);
                self
            }

            /// Observation id, once assigned
            pub fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            /// Trace id, once assigned
            pub fn trace_id(&self) -> Option<&str> {
                self.trace_id.as_deref()
            }

            /// Parent observation id, if nested
            pub fn parent_id(&self) -> Option<&str> {
                self.parent_observation_id.as_deref()
            }
        }
    };
}

/// Fill the trace link of a child, and its parent when given
fn link(child_trace: &mut Option<String>, child_parent: &mut Option<String>, trace: Option<&str>, parent: Option<&str>) {
    if child_trace.is_none() {
        *child_trace = trace.map(str::to_string);
    }
    if child_parent.is_none() {
        *child_parent = parent.map(str::to_string);
    }
}

/// Top-level unit of work; every observation belongs to one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Trace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trace id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the end user the trace belongs to
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Group the trace into a session
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the release the trace was produced by
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Mark the trace as publicly viewable
    pub fn with_public(mut self, public: bool) -> Self {
        self.public = Some(public);
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the input payload
    pub fn with_input(mut self, input: impl Into<Value>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Set the output payload
    pub fn with_output(mut self, output: impl Into<Value>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Trace id, once assigned
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Link a span to this trace
    pub fn span(&self, mut span: Span) -> Span {
        link(&mut span.trace_id, &mut span.parent_observation_id, self.id(), None);
        span
    }

    /// Link an event to this trace
    pub fn event(&self, mut event: Event) -> Event {
        link(&mut event.trace_id, &mut event.parent_observation_id, self.id(), None);
        event
    }

    /// Link a generation to this trace
    pub fn generation(&self, mut generation: Generation) -> Generation {
        link(&mut generation.trace_id, &mut generation.parent_observation_id, self.id(), None);
        generation
    }

    /// Link a score to this trace
    pub fn score(&self, mut score: Score) -> Score {
        if score.trace_id.is_none() {
            score.trace_id = self.id.clone();
        }
        score
    }
}

/// A timed step within a trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_observation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<ObservationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

observation_builders!(Span);

impl Span {
    /// Create an empty span
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the end time
    pub fn with_end_time(mut self, time: DateTime<Utc>) -> Self {
        self.end_time = Some(time);
        self
    }

    /// Nest a span under this one
    pub fn span(&self, mut span: Span) -> Span {
        link(&mut span.trace_id, &mut span.parent_observation_id, self.trace_id(), self.id());
        span
    }

    /// Nest an event under this span
    pub fn event(&self, mut event: Event) -> Event {
        link(&mut event.trace_id, &mut event.parent_observation_id, self.trace_id(), self.id());
        event
    }

    /// Nest a generation under this span
    pub fn generation(&self, mut generation: Generation) -> Generation {
        link(
            &mut generation.trace_id,
            &mut generation.parent_observation_id,
            self.trace_id(),
            self.id(),
        );
        generation
    }

    /// Score this span
    pub fn score(&self, mut score: Score) -> Score {
        link(&mut score.trace_id, &mut score.observation_id, self.trace_id(), self.id());
        if score.name.is_none() {
            score.name = self.name.clone();
        }
        score
    }
}

/// A point-in-time occurrence within a trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_observation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<ObservationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

observation_builders!(Event);

impl Event {
    /// Create an empty event
    pub fn new() -> Self {
        Self::default()
    }
}

/// A model call within a trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_observation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub model_parameters: Metadata,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub usage: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<ObservationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

observation_builders!(Generation);

impl Generation {
    /// Create an empty generation
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add a model parameter (temperature, max tokens, ...)
    pub fn with_model_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.model_parameters.insert(key.into(), value.into());
        self
    }

    /// Add a usage figure (input, output, total, ...)
    pub fn with_usage(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.usage.insert(key.into(), value.into());
        self
    }

    /// Reference the prompt this generation was rendered from
    pub fn with_prompt(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.prompt_name = Some(name.into());
        self.prompt_version = Some(version.into());
        self
    }

    /// Set when the first completion token arrived
    pub fn with_completion_start_time(mut self, time: DateTime<Utc>) -> Self {
        self.completion_start_time = Some(time);
        self
    }

    /// Set the end time
    pub fn with_end_time(mut self, time: DateTime<Utc>) -> Self {
        self.end_time = Some(time);
        self
    }
}

/// An evaluation attached to a trace or observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Score {
    /// Create a named score
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: Some(name.into()),
            value,
            ..Self::default()
        }
    }

    /// Set the score id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach to a trace
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Attach to an observation within the trace
    pub fn with_observation_id(mut self, observation_id: impl Into<String>) -> Self {
        self.observation_id = Some(observation_id.into());
        self
    }

    /// Add a comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
