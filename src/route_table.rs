use crate::role::RoleLevel;

/// RoutePattern
///
/// One entry of the route classification table. `required = None` marks an explicitly
/// public prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    pub prefix: String,
    pub required: Option<RoleLevel>,
}

impl RoutePattern {
    pub fn public(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            required: None,
        }
    }

    pub fn restricted(prefix: &str, level: RoleLevel) -> Self {
        Self {
            prefix: prefix.to_string(),
            required: Some(level),
        }
    }

    /// matches
    ///
    /// Prefix matching on path-segment boundaries: `/admin` matches `/admin` and
    /// `/admin/users` but not `/administrator`. The root pattern matches only `/` itself,
    /// otherwise it would swallow every path.
    pub fn matches(&self, path: &str) -> bool {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return path.is_empty() || path == "/";
        }
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// The smallest path this pattern matches; used to detect shadowing.
    fn anchor(&self) -> &str {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() { "/" } else { prefix }
    }
}

/// RouteTable
///
/// Ordered route classification, built once at startup and never mutated. The first
/// matching pattern decides; more specific prefixes must therefore be listed before the
/// broader prefixes that contain them.
///
/// Paths that match no pattern fall back to `unmatched`, which is `None` (public) unless
/// configured otherwise. Default-allow means a new route is public until someone lists it,
/// so [`RouteTable::with_unmatched`] exists to switch to default-deny.
#[derive(Debug, Clone)]
pub struct RouteTable {
    patterns: Vec<RoutePattern>,
    unmatched: Option<RoleLevel>,
}

impl RouteTable {
    pub fn new(patterns: Vec<RoutePattern>) -> Self {
        Self {
            patterns,
            unmatched: None,
        }
    }

    pub fn with_unmatched(mut self, level: Option<RoleLevel>) -> Self {
        self.unmatched = level;
        self
    }

    pub fn patterns(&self) -> &[RoutePattern] {
        &self.patterns
    }

    pub fn unmatched(&self) -> Option<RoleLevel> {
        self.unmatched
    }

    pub fn matching(&self, path: &str) -> Option<&RoutePattern> {
        self.patterns.iter().find(|pattern| pattern.matches(path))
    }

    /// classify
    ///
    /// The minimum role level required for `path`, or `None` if the path is public.
    pub fn classify(&self, path: &str) -> Option<RoleLevel> {
        match self.matching(path) {
            Some(pattern) => pattern.required,
            None => self.unmatched,
        }
    }

    /// shadowed
    ///
    /// Pairs `(earlier, later)` of indices where the earlier pattern matches everything the
    /// later one does, making the later entry unreachable.
    pub fn shadowed(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (later, pattern) in self.patterns.iter().enumerate() {
            if let Some(earlier) = self.patterns[..later]
                .iter()
                .position(|candidate| candidate.matches(pattern.anchor()))
            {
                pairs.push((earlier, later));
            }
        }
        pairs
    }

    /// standard
    ///
    /// The classification used by the portal. Public entries come first, contributor
    /// sub-areas precede the admin prefix that contains them, and `/admin/login` stays
    /// public so the forbidden redirect cannot loop.
    pub fn standard() -> Self {
        use RoleLevel::{Admin, Contributor, User};

        Self::new(vec![
            RoutePattern::public("/login"),
            RoutePattern::public("/register"),
            RoutePattern::public("/about"),
            RoutePattern::public("/pricing"),
            RoutePattern::public("/unauthorized"),
            RoutePattern::public("/admin/login"),
            RoutePattern::public("/health"),
            RoutePattern::public("/swagger-ui"),
            RoutePattern::public("/api-docs"),
            RoutePattern::public("/api/health"),
            RoutePattern::public("/api/register"),
            RoutePattern::public("/"),
            RoutePattern::restricted("/admin/content", Contributor),
            RoutePattern::restricted("/admin/moderation", Contributor),
            RoutePattern::restricted("/admin", Admin),
            RoutePattern::restricted("/api/admin", Admin),
            RoutePattern::restricted("/dashboard", User),
            RoutePattern::restricted("/profile", User),
            RoutePattern::restricted("/settings", User),
            RoutePattern::restricted("/api/dashboard", User),
            RoutePattern::restricted("/api/user", User),
            RoutePattern::restricted("/api/help-requests", User),
            RoutePattern::restricted("/api/rate-limit", User),
            RoutePattern::restricted("/api/auth", User),
        ])
    }
}
