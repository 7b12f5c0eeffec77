//! Queue-store key scheme for one (namespace, language) pair.
//!
//! ```text
//! q:in:{ns}:stt:{lang}        pending list
//! q:proc:{ns}:stt:{lang}      processing list
//! q:done:{ns}:stt:{lang}      done list
//! {ns}:stt:{lang}:idle        idle-candidate set (plain)
//! {ns}:stt:tok:{lang}:idle    idle-candidate set (tokenized)
//! ```

use crate::config::IdleKeyShape;
use crate::types::Stage;

/// Builds the Redis keys the scaler reads and clears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    namespace: String,
    language: String,
    idle_shape: IdleKeyShape,
}

impl QueueKeys {
    pub fn new(namespace: &str, language: &str, idle_shape: IdleKeyShape) -> Self {
        Self {
            namespace: namespace.to_string(),
            language: language.to_string(),
            idle_shape,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// List key holding the jobs of `stage`.
    pub fn stage(&self, stage: Stage) -> String {
        format!(
            "q:{}:{}:stt:{}",
            stage.segment(),
            self.namespace,
            self.language
        )
    }

    /// Set key that workers add themselves to when idle.
    pub fn idle(&self) -> String {
        match self.idle_shape {
            IdleKeyShape::Plain => format!("{}:stt:{}:idle", self.namespace, self.language),
            IdleKeyShape::Tokenized => {
                format!("{}:stt:tok:{}:idle", self.namespace, self.language)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_keys() {
        let keys = QueueKeys::new("kluge", "english", IdleKeyShape::Plain);
        assert_eq!(keys.stage(Stage::Pending), "q:in:kluge:stt:english");
        assert_eq!(keys.stage(Stage::Processing), "q:proc:kluge:stt:english");
        assert_eq!(keys.stage(Stage::Done), "q:done:kluge:stt:english");
    }

    #[test]
    fn idle_key_shapes() {
        let plain = QueueKeys::new("kluge", "german", IdleKeyShape::Plain);
        assert_eq!(plain.idle(), "kluge:stt:german:idle");

        let tok = QueueKeys::new("kluge", "german", IdleKeyShape::Tokenized);
        assert_eq!(tok.idle(), "kluge:stt:tok:german:idle");
    }
}
