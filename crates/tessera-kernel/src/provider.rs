//! Which backend a turn's tools run against.

use serde::{Deserialize, Serialize};

use crate::remote::RemoteFileAccess;

/// Provider selection carried by a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderContext {
    /// A remote sandbox session.
    RemoteSession {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_ref: Option<String>,
    },
    /// No backend; every tool call fails.
    Unimplemented,
}

impl ProviderContext {
    /// Remote session when a non-empty reference is given.
    pub fn for_session(session_ref: Option<&str>) -> Self {
        match session_ref.map(str::trim) {
            Some(id) if !id.is_empty() => ProviderContext::RemoteSession {
                session_ref: Some(id.to_string()),
            },
            _ => ProviderContext::Unimplemented,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderContext::RemoteSession { .. } => "remote_session",
            ProviderContext::Unimplemented => "unimplemented",
        }
    }

    /// Session id, if this context names a usable one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ProviderContext::RemoteSession {
                session_ref: Some(id),
            } if !id.is_empty() => Some(id),
            _ => None,
        }
    }
}

/// A resolved backend.
#[derive(Debug)]
pub enum ExecutionTarget {
    RemoteSession(RemoteFileAccess),
}

impl ExecutionTarget {
    /// Resolve `provider`, building session access with `connect`.
    ///
    /// `None` for [`ProviderContext::Unimplemented`] or a session context
    /// without a reference.
    pub fn resolve(
        provider: &ProviderContext,
        connect: impl FnOnce(&str) -> RemoteFileAccess,
    ) -> Option<Self> {
        provider
            .session_id()
            .map(|id| ExecutionTarget::RemoteSession(connect(id)))
    }

    pub fn remote_files(&self) -> &RemoteFileAccess {
        match self {
            ExecutionTarget::RemoteSession(access) => access,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_session() {
        assert_eq!(
            ProviderContext::for_session(Some("sbx-1")),
            ProviderContext::RemoteSession {
                session_ref: Some("sbx-1".into())
            }
        );
        assert_eq!(
            ProviderContext::for_session(Some("  ")),
            ProviderContext::Unimplemented
        );
        assert_eq!(ProviderContext::for_session(None), ProviderContext::Unimplemented);
    }

    #[test]
    fn test_session_id() {
        let empty = ProviderContext::RemoteSession { session_ref: None };
        assert_eq!(empty.session_id(), None);
        assert_eq!(empty.name(), "remote_session");
        assert_eq!(ProviderContext::Unimplemented.session_id(), None);
        assert_eq!(
            ProviderContext::for_session(Some("s")).session_id(),
            Some("s")
        );
    }

    #[test]
    fn test_wire_shape() {
        let ctx: ProviderContext =
            serde_json::from_str(r#"{"kind":"remote_session","session_ref":"abc"}"#).unwrap();
        assert_eq!(ctx.session_id(), Some("abc"));

        let ctx: ProviderContext = serde_json::from_str(r#"{"kind":"unimplemented"}"#).unwrap();
        assert_eq!(ctx, ProviderContext::Unimplemented);
    }
}
