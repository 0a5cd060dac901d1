// src/auth/guards.rs

//! Navigation guards
//!
//! Each guard is a pure check over the current user. A denied navigation
//! yields the path to send the user to instead.

use super::User;

pub const LOGIN_PATH: &str = "/auth/login";
pub const GUEST_HOME: &str = "/catalog";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Which guard a route area sits behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGuard {
    Authenticated,
    Admin,
    Guest,
}

impl RouteGuard {
    /// Guard for the top-level area of `path`, `None` for public pages
    pub fn for_path(path: &str) -> Option<Self> {
        let first = path
            .trim_start_matches('/')
            .split(['/', '?', '#'])
            .next()
            .unwrap_or("");
        match first {
            "auth" => Some(Self::Guest),
            "catalog" | "shop" => Some(Self::Authenticated),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn check(&self, user: Option<&User>, target: &str) -> GuardDecision {
        match self {
            Self::Authenticated => authenticated(user, target),
            Self::Admin => admin(user, target),
            Self::Guest => guest(user),
        }
    }
}

/// `/auth/login?returnUrl=<target>`
pub fn login_redirect(target: &str) -> String {
    format!("{}?returnUrl={}", LOGIN_PATH, urlencoding::encode(target))
}

pub fn authenticated(user: Option<&User>, target: &str) -> GuardDecision {
    match user {
        Some(_) => GuardDecision::Allow,
        None => GuardDecision::Redirect(login_redirect(target)),
    }
}

pub fn admin(user: Option<&User>, target: &str) -> GuardDecision {
    match user {
        Some(u) if u.is_admin() => GuardDecision::Allow,
        _ => GuardDecision::Redirect(login_redirect(target)),
    }
}

/// Admin check at a lazily loaded area, where only the matched URL segments
/// are known
pub fn admin_segments(user: Option<&User>, segments: &[&str]) -> GuardDecision {
    admin(user, &format!("/{}", segments.join("/")))
}

pub fn guest(user: Option<&User>) -> GuardDecision {
    match user {
        Some(_) => GuardDecision::Redirect(GUEST_HOME.to_string()),
        None => GuardDecision::Allow,
    }
}

/// Runs the guard for `path`, public pages always pass
pub fn check_navigation(user: Option<&User>, path: &str) -> GuardDecision {
    RouteGuard::for_path(path)
        .map(|guard| guard.check(user, path))
        .unwrap_or(GuardDecision::Allow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;

    fn user(role: UserRole) -> User {
        User {
            id: 1,
            name: "you".into(),
            email: "you@example.com".into(),
            role,
            token: "t".into(),
        }
    }

    #[test]
    fn test_authenticated_guard() {
        assert_eq!(
            authenticated(None, "/shop/cart"),
            GuardDecision::Redirect("/auth/login?returnUrl=%2Fshop%2Fcart".into())
        );
        assert!(authenticated(Some(&user(UserRole::User)), "/shop/cart").is_allowed());
    }

    #[test]
    fn test_admin_guard_route_and_segments_agree() {
        let customer = user(UserRole::User);
        let expected = GuardDecision::Redirect("/auth/login?returnUrl=%2Fadmin%2Forders".into());

        assert_eq!(admin(None, "/admin/orders"), expected);
        assert_eq!(admin(Some(&customer), "/admin/orders"), expected);
        assert_eq!(admin_segments(Some(&customer), &["admin", "orders"]), expected);

        let root = user(UserRole::Admin);
        assert!(admin(Some(&root), "/admin/orders").is_allowed());
        assert!(admin_segments(Some(&root), &["admin"]).is_allowed());
    }

    #[test]
    fn test_guest_guard() {
        assert!(guest(None).is_allowed());
        assert_eq!(
            guest(Some(&user(UserRole::User))),
            GuardDecision::Redirect("/catalog".into())
        );
    }

    #[test]
    fn test_route_table() {
        assert_eq!(RouteGuard::for_path("/auth/login"), Some(RouteGuard::Guest));
        assert_eq!(RouteGuard::for_path("/catalog/12"), Some(RouteGuard::Authenticated));
        assert_eq!(RouteGuard::for_path("/admin"), Some(RouteGuard::Admin));
        assert_eq!(RouteGuard::for_path("/help"), None);

        assert!(check_navigation(None, "/terms").is_allowed());
        assert!(!check_navigation(None, "/shop/checkout").is_allowed());
    }
}
