//! Per-window session attributes and the trusted-origin check guarding them.

use std::collections::HashMap;

use backplane_client::canonicalize;
use backplane_core::WindowHandle;
use url::Url;

/// The application's own UI document.
///
/// Packaged builds trust `app://bundle/index.html`; development builds
/// trust the dev server root at `http://localhost:9080`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedOrigin {
    dev_mode: bool,
}

impl TrustedOrigin {
    pub fn new(dev_mode: bool) -> Self {
        Self { dev_mode }
    }

    /// Scheme, host and path must all match the entry document.
    pub fn is_trusted(&self, origin: &str) -> bool {
        let Ok(url) = Url::parse(origin) else {
            return false;
        };
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return false,
        };

        if self.dev_mode {
            url.scheme() == "http" && host == "localhost:9080" && matches!(url.path(), "/" | "/index.html")
        } else {
            url.scheme() == "app" && host == "bundle" && url.path() == "/index.html"
        }
    }
}

/// Credential a window attaches to requests under its scope URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAttribute {
    pub scope_url: String,
    pub credential: String,
}

/// What a `set_authorization` message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationChange {
    Set(SessionAttribute),
    Clear,
    /// A credential without a scope URL changes nothing.
    Ignore,
}

impl AuthorizationChange {
    /// A missing or empty credential clears the attribute.
    pub fn from_message(url: Option<String>, authorization: Option<String>) -> Self {
        match (authorization.filter(|a| !a.is_empty()), url) {
            (None, _) => Self::Clear,
            (Some(credential), Some(scope_url)) => Self::Set(SessionAttribute { scope_url, credential }),
            (Some(_), None) => Self::Ignore,
        }
    }
}

/// Canonical form of an http(s) URL, or the input as given.
fn normalized(url: &str) -> String {
    canonicalize(url).map(String::from).unwrap_or_else(|_| url.to_string())
}

#[derive(Debug)]
pub struct SessionAttributes {
    trusted: TrustedOrigin,
    by_window: HashMap<WindowHandle, SessionAttribute>,
}

impl SessionAttributes {
    pub fn new(trusted: TrustedOrigin) -> Self {
        Self { trusted, by_window: HashMap::new() }
    }

    /// Set or clear the attribute of `window`.
    ///
    /// Calls whose origin is not trusted are dropped; returns whether the
    /// call was applied.
    pub fn set(&mut self, window: WindowHandle, origin: &str, attribute: Option<SessionAttribute>) -> bool {
        if !self.trusted.is_trusted(origin) {
            tracing::warn!(window = %window, "dropping session attribute change from untrusted origin");
            return false;
        }
        match attribute {
            Some(mut attribute) => {
                attribute.scope_url = normalized(&attribute.scope_url);
                self.by_window.insert(window, attribute);
            }
            None => {
                self.by_window.remove(&window);
            }
        }
        true
    }

    /// Unconditional removal on window teardown.
    pub fn remove(&mut self, window: WindowHandle) {
        self.by_window.remove(&window);
    }

    /// The credential of `window`, if `url` falls under its scope.
    ///
    /// Both URLs are compared in canonical form, so host case and fragments
    /// do not matter.
    pub fn credential_for(&self, window: WindowHandle, url: &str) -> Option<String> {
        let url = normalized(url);
        self.by_window
            .get(&window)
            .filter(|attr| url.starts_with(&attr.scope_url))
            .map(|attr| attr.credential.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGED: &str = "app://bundle/index.html";

    fn attribute() -> SessionAttribute {
        SessionAttribute { scope_url: "https://invidious.example/".into(), credential: "Basic abc".into() }
    }

    #[test]
    fn test_packaged_origin() {
        let trusted = TrustedOrigin::new(false);
        assert!(trusted.is_trusted(PACKAGED));
        assert!(trusted.is_trusted("app://bundle/index.html#/subscriptions"));
        assert!(!trusted.is_trusted("app://bundle/other.html"));
        assert!(!trusted.is_trusted("app://evil/index.html"));
        assert!(!trusted.is_trusted("https://bundle/index.html"));
        assert!(!trusted.is_trusted("http://localhost:9080/"));
        assert!(!trusted.is_trusted("not a url"));
    }

    #[test]
    fn test_dev_origin() {
        let trusted = TrustedOrigin::new(true);
        assert!(trusted.is_trusted("http://localhost:9080/"));
        assert!(trusted.is_trusted("http://localhost:9080/index.html"));
        assert!(!trusted.is_trusted("http://localhost:9081/"));
        assert!(!trusted.is_trusted("http://localhost:9080/page"));
        assert!(!trusted.is_trusted(PACKAGED));
    }

    #[test]
    fn test_untrusted_set_changes_nothing() {
        let mut sessions = SessionAttributes::new(TrustedOrigin::new(false));
        assert!(sessions.set(WindowHandle(1), PACKAGED, Some(attribute())));

        let replacement = SessionAttribute { scope_url: "https://".into(), credential: "stolen".into() };
        assert!(!sessions.set(WindowHandle(1), "https://youtube.com/embed", Some(replacement.clone())));
        assert!(!sessions.set(WindowHandle(2), "https://youtube.com/embed", Some(replacement)));
        assert!(!sessions.set(WindowHandle(1), "https://youtube.com/embed", None));

        assert_eq!(sessions.by_window.get(&WindowHandle(1)), Some(&attribute()));
        assert_eq!(sessions.by_window.get(&WindowHandle(2)), None);
    }

    #[test]
    fn test_credential_requires_scope_prefix() {
        let mut sessions = SessionAttributes::new(TrustedOrigin::new(false));
        sessions.set(WindowHandle(1), PACKAGED, Some(attribute()));

        assert_eq!(
            sessions.credential_for(WindowHandle(1), "https://invidious.example/api/v1/feed"),
            Some("Basic abc".into())
        );
        assert_eq!(sessions.credential_for(WindowHandle(1), "https://other.example/"), None);
        assert_eq!(sessions.credential_for(WindowHandle(2), "https://invidious.example/"), None);
    }

    #[test]
    fn test_scope_match_ignores_host_case() {
        let mut sessions = SessionAttributes::new(TrustedOrigin::new(false));
        let attribute = SessionAttribute { scope_url: "https://Invidious.Example".into(), credential: "Basic abc".into() };
        sessions.set(WindowHandle(1), PACKAGED, Some(attribute));

        assert_eq!(
            sessions.credential_for(WindowHandle(1), "https://invidious.example/api/v1/feed"),
            Some("Basic abc".into())
        );
        assert_eq!(
            sessions.credential_for(WindowHandle(1), "https://INVIDIOUS.example/vi/a.jpg#frag"),
            Some("Basic abc".into())
        );
        assert_eq!(sessions.credential_for(WindowHandle(1), "https://invidious.example.evil/"), None);
    }

    #[test]
    fn test_authorization_change_from_message() {
        let url = || Some("https://inv.example/".to_string());
        assert_eq!(
            AuthorizationChange::from_message(url(), Some("Basic abc".into())),
            AuthorizationChange::Set(SessionAttribute { scope_url: "https://inv.example/".into(), credential: "Basic abc".into() })
        );
        assert_eq!(AuthorizationChange::from_message(url(), None), AuthorizationChange::Clear);
        assert_eq!(AuthorizationChange::from_message(None, Some(String::new())), AuthorizationChange::Clear);
        assert_eq!(AuthorizationChange::from_message(None, Some("Basic abc".into())), AuthorizationChange::Ignore);
    }

    #[test]
    fn test_clear_and_remove() {
        let mut sessions = SessionAttributes::new(TrustedOrigin::new(false));
        sessions.set(WindowHandle(1), PACKAGED, Some(attribute()));
        sessions.set(WindowHandle(2), PACKAGED, Some(attribute()));

        assert!(sessions.set(WindowHandle(1), PACKAGED, None));
        sessions.remove(WindowHandle(2));
        assert!(sessions.by_window.is_empty());
    }
}
