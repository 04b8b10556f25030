use super::token::ROLE_ADMIN;
use super::AuthUser;
use crate::config::AccessConfig;
use crate::error::AppError;

/// 受访问控制的资源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Deliveries,
    Orders,
    Suppliers,
    Departments,
    ConformityStatuses,
    Stock,
    Admin,
}

impl Resource {
    /// 在用户 access 授权列表中使用的名称
    pub fn grant_name(self) -> &'static str {
        match self {
            Resource::Deliveries => "livraisons",
            Resource::Orders => "orders",
            Resource::Suppliers => "fournisseurs",
            Resource::Departments => "services",
            Resource::ConformityStatuses => "options",
            Resource::Stock => "stock",
            Resource::Admin => "admin",
        }
    }

    /// 读取对任意已登录用户开放 (录入收货单时需要这些列表)
    fn open_for_read(self) -> bool {
        matches!(
            self,
            Resource::Deliveries | Resource::Orders | Resource::Suppliers | Resource::Departments | Resource::ConformityStatuses
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

/// 权限策略: (用户, 资源, 操作) -> 允许/拒绝
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    protected: Vec<String>,
    superadmins: Vec<String>,
}

impl AccessPolicy {
    pub fn from_config(config: &AccessConfig) -> Self {
        Self {
            protected: config.protected.iter().map(|s| s.trim().to_string()).collect(),
            superadmins: config.superadmins.iter().map(|s| s.trim().to_lowercase()).collect(),
        }
    }

    fn is_protected(&self, resource: Resource) -> bool {
        self.protected.iter().any(|name| name == resource.grant_name())
    }

    pub fn is_superuser(&self, user: &AuthUser) -> bool {
        user.role == ROLE_ADMIN || self.superadmins.iter().any(|email| *email == user.email.to_lowercase())
    }

    pub fn is_allowed(&self, user: &AuthUser, resource: Resource, action: Action) -> bool {
        if self.is_superuser(user) {
            return true;
        }
        if !self.is_protected(resource) {
            return true;
        }
        if action == Action::Read && resource.open_for_read() {
            return true;
        }
        user.access.iter().any(|grant| grant == resource.grant_name())
    }

    /// 拒绝时返回 403
    pub fn authorize(&self, user: &AuthUser, resource: Resource, action: Action) -> Result<(), AppError> {
        if self.is_allowed(user, resource, action) {
            Ok(())
        } else {
            tracing::warn!(
                "access denied: user={} resource={} action={:?}",
                user.email,
                resource.grant_name(),
                action
            );
            Err(AppError::Forbidden {
                resource: resource.grant_name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn policy() -> AccessPolicy {
        let mut config = AppConfig::default().access;
        config.superadmins = vec!["Chef@Example.com".to_string()];
        AccessPolicy::from_config(&config)
    }

    fn user(email: &str, role: &str, access: &[&str]) -> AuthUser {
        AuthUser {
            id: "1".to_string(),
            email: email.to_string(),
            role: role.to_string(),
            access: access.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn deliveries_and_orders_open_to_everyone() {
        let policy = policy();
        let plain = user("u@example.com", "user", &[]);
        for resource in [Resource::Deliveries, Resource::Orders] {
            assert!(policy.is_allowed(&plain, resource, Action::Read));
            assert!(policy.is_allowed(&plain, resource, Action::Write));
        }
    }

    #[test]
    fn reference_lists_readable_but_not_writable_without_grant() {
        let policy = policy();
        let plain = user("u@example.com", "user", &[]);
        assert!(policy.is_allowed(&plain, Resource::Suppliers, Action::Read));
        assert!(!policy.is_allowed(&plain, Resource::Suppliers, Action::Write));
        assert!(policy.is_allowed(&plain, Resource::ConformityStatuses, Action::Read));
        assert!(!policy.is_allowed(&plain, Resource::Departments, Action::Write));
    }

    #[test]
    fn stock_and_admin_need_grant_even_to_read() {
        let policy = policy();
        let plain = user("u@example.com", "user", &[]);
        assert!(!policy.is_allowed(&plain, Resource::Stock, Action::Read));
        assert!(!policy.is_allowed(&plain, Resource::Admin, Action::Read));

        let magasin = user("m@example.com", "user", &["stock"]);
        assert!(policy.is_allowed(&magasin, Resource::Stock, Action::Read));
        assert!(policy.is_allowed(&magasin, Resource::Stock, Action::Write));
        assert!(!policy.is_allowed(&magasin, Resource::Admin, Action::Read));
    }

    #[test]
    fn admins_and_superadmins_do_everything() {
        let policy = policy();
        let admin = user("a@example.com", "admin", &[]);
        let chef = user("chef@example.com", "user", &[]);
        for who in [&admin, &chef] {
            assert!(policy.is_allowed(who, Resource::Admin, Action::Write));
            assert!(policy.is_allowed(who, Resource::Stock, Action::Write));
        }
    }

    #[test]
    fn unprotected_resource_is_open() {
        let policy = AccessPolicy::from_config(&AccessConfig {
            protected: vec!["admin".to_string()],
            superadmins: vec![],
        });
        let plain = user("u@example.com", "user", &[]);
        assert!(policy.is_allowed(&plain, Resource::Stock, Action::Write));
        assert!(policy.authorize(&plain, Resource::Admin, Action::Read).is_err());
    }
}
