use std::sync::OnceLock;

use crate::auth::Role;

/// Static mapping from path prefix to the roles allowed under it
#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    rules: Vec<(String, Vec<Role>)>,
}

impl RoutePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, prefix: &str, roles: &[Role]) -> Self {
        let prefix = prefix.trim_end_matches('/').to_string();
        self.rules.push((prefix, roles.to_vec()));
        self
    }

    /// The dashboard areas. SUPER_ADMIN reaches `/admin` through the
    /// membership rule rather than being listed.
    pub fn standard() -> &'static RoutePolicy {
        static POLICY: OnceLock<RoutePolicy> = OnceLock::new();
        POLICY.get_or_init(|| {
            RoutePolicy::new()
                .with_rule("/admin", &[Role::Admin])
                .with_rule("/instructor", &[Role::Instructor])
                .with_rule("/student", &[Role::Student])
        })
    }

    /// Allowed roles for `path`, or `None` for public paths. The longest
    /// matching prefix wins; prefixes match on whole path segments.
    pub fn allowed_roles(&self, path: &str) -> Option<&[Role]> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        self.rules
            .iter()
            .filter(|(prefix, _)| {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, roles)| roles.as_slice())
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.allowed_roles(path).is_some()
    }
}
