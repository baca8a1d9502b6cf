// Session state machine - pure transitions, no side effects
use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;

/// Where a browser session stands in the login lifecycle.
///
/// Both login flows (claiming a username locally, or coming back from the
/// identity provider) end in `Authenticated`; logout destroys the session
/// entry outright rather than transitioning it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No identity attached.
    Anonymous,

    /// A username claim form was submitted and is being checked.
    Claiming { username: String },

    /// Redirected out to the identity provider; `state` is the
    /// anti-forgery nonce the callback must echo back.
    ProviderPending { state: String },

    /// The provider vouched for an identity we have never seen; a
    /// username is needed before a User exists.
    NeedsUsername { identity_hash: String },

    /// Logged in.
    Authenticated { user_id: i64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidTransition(String),

    #[error("Login state mismatch")]
    StateMismatch,
}

impl SessionState {
    /// Get state name for debugging/logging
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::Claiming { .. } => "Claiming",
            Self::ProviderPending { .. } => "ProviderPending",
            Self::NeedsUsername { .. } => "NeedsUsername",
            Self::Authenticated { .. } => "Authenticated",
        }
    }

    /// Synchronous guard used by the route layer; no I/O, never blocks.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::Authenticated { user_id } => Some(*user_id),
            _ => None,
        }
    }

    /// The pending external identity, if the session is waiting on a
    /// username to finish delegated signup.
    pub fn pending_identity(&self) -> Option<&str> {
        match self {
            Self::NeedsUsername { identity_hash } => Some(identity_hash),
            _ => None,
        }
    }

    /// Transition: Anonymous → Claiming (local username form submitted)
    pub fn begin_claim(self, username: String) -> Result<Self, SessionError> {
        match self {
            Self::Anonymous => Ok(Self::Claiming { username }),
            other => Err(SessionError::InvalidTransition(format!(
                "Cannot begin a username claim from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: Claiming → Authenticated (the store accepted the claim)
    pub fn claim_granted(self, user_id: i64) -> Result<Self, SessionError> {
        match self {
            Self::Claiming { .. } => Ok(Self::Authenticated { user_id }),
            other => Err(SessionError::InvalidTransition(format!(
                "Cannot grant a claim from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: Claiming → Anonymous (username was taken)
    pub fn claim_rejected(self) -> Result<Self, SessionError> {
        match self {
            Self::Claiming { .. } => Ok(Self::Anonymous),
            other => Err(SessionError::InvalidTransition(format!(
                "Cannot reject a claim from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: Anonymous → Authenticated (returning local user signed in)
    pub fn login_granted(self, user_id: i64) -> Result<Self, SessionError> {
        match self {
            Self::Anonymous => Ok(Self::Authenticated { user_id }),
            other => Err(SessionError::InvalidTransition(format!(
                "Cannot sign in from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: Anonymous → ProviderPending (redirecting out)
    pub fn begin_provider_login(self, state: String) -> Result<Self, SessionError> {
        match self {
            Self::Anonymous => Ok(Self::ProviderPending { state }),
            other => Err(SessionError::InvalidTransition(format!(
                "Cannot start provider login from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: ProviderPending → Authenticated (known identity came back).
    /// The callback's echoed nonce must match the one stored on redirect.
    pub fn provider_matched(
        self,
        echoed_state: &str,
        user_id: i64,
    ) -> Result<Self, SessionError> {
        match self {
            Self::ProviderPending { state } => {
                if state != echoed_state {
                    return Err(SessionError::StateMismatch);
                }
                Ok(Self::Authenticated { user_id })
            }
            other => Err(SessionError::InvalidTransition(format!(
                "Cannot complete provider login from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: ProviderPending → NeedsUsername (identity is new here)
    pub fn provider_unmatched(
        self,
        echoed_state: &str,
        identity_hash: String,
    ) -> Result<Self, SessionError> {
        match self {
            Self::ProviderPending { state } => {
                if state != echoed_state {
                    return Err(SessionError::StateMismatch);
                }
                Ok(Self::NeedsUsername { identity_hash })
            }
            other => Err(SessionError::InvalidTransition(format!(
                "Cannot complete provider login from {} state",
                other.state_name()
            ))),
        }
    }

    /// Transition: NeedsUsername → Authenticated (signup completed)
    pub fn signup_granted(self, user_id: i64) -> Result<Self, SessionError> {
        match self {
            Self::NeedsUsername { .. } => Ok(Self::Authenticated { user_id }),
            other => Err(SessionError::InvalidTransition(format!(
                "Cannot complete signup from {} state",
                other.state_name()
            ))),
        }
    }
}

/// One tracked session: its login state plus an expiry deadline.
#[derive(Debug, Clone)]
struct SessionEntry {
    state: SessionState,
    expires_at: Instant,
}

/// In-memory session store keyed by the opaque cookie token. Lives for
/// the process only; a restart logs everyone out.
pub struct SessionStore {
    sessions: HashMap<String, SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Create a fresh Anonymous session and return its token.
    pub fn create(&mut self) -> String {
        self.clear_stale();

        let token = generate_token();
        self.sessions.insert(
            token.clone(),
            SessionEntry {
                state: SessionState::Anonymous,
                expires_at: Instant::now() + self.ttl,
            },
        );

        token
    }

    pub fn get(&self, token: &str) -> Option<SessionState> {
        let entry = self.sessions.get(token)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        Some(entry.state.clone())
    }

    /// Replace a live session's state; ignored for unknown/expired tokens.
    pub fn set(&mut self, token: &str, state: SessionState) {
        self.clear_stale();

        if let Some(entry) = self.sessions.get_mut(token) {
            entry.state = state;
        }
    }

    /// Destroy a session outright (logout). Returns whether it existed.
    pub fn destroy(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Remove expired sessions
    fn clear_stale(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, entry| now < entry.expires_at);
    }
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
