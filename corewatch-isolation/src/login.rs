//! Login-status heuristic: a best-effort signal built from two things
//! the supervisor already observes, not a real DOM inspection — that
//! stays the out-of-scope content script's job.

use corewatch_types::LoginStatus;

/// One observation feeding the heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginSignal {
    /// The content-script injection hook reported a DOM probe result.
    DomProbe(bool),
    /// The partition developed cookie data after previously having none.
    CookiesAppeared,
}

/// Fold one new signal into the previous status. `LoggedOut` only comes
/// from an explicit negative DOM probe — cookies disappearing doesn't
/// imply a logout (the partition may just not have been probed yet).
pub fn infer_login_status(previous: LoginStatus, signal: LoginSignal) -> LoginStatus {
    match signal {
        LoginSignal::DomProbe(true) => LoginStatus::LoggedIn,
        LoginSignal::DomProbe(false) => LoginStatus::LoggedOut,
        LoginSignal::CookiesAppeared => match previous {
            LoginStatus::LoggedOut => LoginStatus::LoggedOut,
            _ => LoginStatus::LoggedIn,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_probe_is_authoritative() {
        assert_eq!(infer_login_status(LoginStatus::Unknown, LoginSignal::DomProbe(true)), LoginStatus::LoggedIn);
        assert_eq!(infer_login_status(LoginStatus::LoggedIn, LoginSignal::DomProbe(false)), LoginStatus::LoggedOut);
    }

    #[test]
    fn cookies_appearing_from_unknown_implies_logged_in() {
        assert_eq!(infer_login_status(LoginStatus::Unknown, LoginSignal::CookiesAppeared), LoginStatus::LoggedIn);
    }

    #[test]
    fn cookies_appearing_does_not_override_an_explicit_logout() {
        assert_eq!(infer_login_status(LoginStatus::LoggedOut, LoginSignal::CookiesAppeared), LoginStatus::LoggedOut);
    }
}
