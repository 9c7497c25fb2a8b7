//! Topic derivation from workflow name and status.
//!
//! The translator receives a [`TopicNamer`] rather than calling a fixed function, so
//! the naming scheme stays owned by whoever owns the event stream.

/// Derives the topic for a record that moved to `status` in `workflow_name`.
///
/// Implementations must be pure, and distinct statuses of one workflow must map to
/// distinct topics.
pub trait TopicNamer {
    fn topic(&self, workflow_name: &str, status: i32) -> String;
}

impl<F> TopicNamer for F
where
    F: Fn(&str, i32) -> String,
{
    fn topic(&self, workflow_name: &str, status: i32) -> String {
        self(workflow_name, status)
    }
}

/// Joins the workflow name and status code with a separator.
///
/// Spaces in the workflow name are replaced by the separator so topics never
/// contain whitespace: `("order fulfilment", 4)` becomes `order-fulfilment-4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedTopics {
    separator: String,
}

impl DelimitedTopics {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for DelimitedTopics {
    fn default() -> Self {
        Self::new("-")
    }
}

impl TopicNamer for DelimitedTopics {
    fn topic(&self, workflow_name: &str, status: i32) -> String {
        let name = workflow_name.replace(' ', &self.separator);
        format!("{}{}{}", name, self.separator, status)
    }
}

/// Topic under the default `-` separator
pub fn topic(workflow_name: &str, status: i32) -> String {
    DelimitedTopics::default().topic(workflow_name, status)
}
