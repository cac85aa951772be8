//! Observable tracking state.

/// Where the orchestrator is in its lifecycle.
///
/// `Idle → PermissionPending → Active → (Capturing → Delivering)* →
/// SessionComplete → Idle`. External cancellation moves a running session
/// to `Suspended`; a denied permission prompt moves to `Denied` until the
/// next `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    #[default]
    Idle,
    PermissionPending,
    Active,
    Capturing,
    Delivering,
    SessionComplete,
    Suspended,
    Denied,
}

impl TrackingState {
    /// A session is running in one of its phases.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Active | Self::Capturing | Self::Delivering)
    }
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PermissionPending => "permission_pending",
            Self::Active => "active",
            Self::Capturing => "capturing",
            Self::Delivering => "delivering",
            Self::SessionComplete => "session_complete",
            Self::Suspended => "suspended",
            Self::Denied => "denied",
        };
        f.write_str(name)
    }
}
