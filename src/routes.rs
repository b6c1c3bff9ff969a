//! Navigation targets, per-role view configuration and route guards.

use crate::api::models::{Role, User};
use crate::session::AuthState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub path: &'static str,
}

/// What a role's dashboard shell looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    pub role: Role,
    pub base_path: &'static str,
    pub menu: &'static [MenuItem],
}

const ADMIN_MENU: &[MenuItem] = &[
    MenuItem { label: "Dashboard", path: "/admin" },
    MenuItem { label: "Users", path: "/admin/users" },
    MenuItem { label: "Organizations", path: "/admin/organizations" },
    MenuItem { label: "Reports", path: "/admin/reports" },
    MenuItem { label: "Settings", path: "/admin/settings" },
];

const WORKER_MENU: &[MenuItem] = &[
    MenuItem { label: "My Tasks", path: "/travailleur" },
    MenuItem { label: "Find Projects", path: "/travailleur/projects" },
    MenuItem { label: "Job Posts", path: "/travailleur/jobs" },
    MenuItem { label: "Messages", path: "/travailleur/messages" },
];

const PROJECT_OWNER_MENU: &[MenuItem] = &[
    MenuItem { label: "Projects", path: "/projet" },
    MenuItem { label: "Team", path: "/projet/team" },
    MenuItem { label: "Applications", path: "/projet/applications" },
    MenuItem { label: "Messages", path: "/projet/messages" },
];

const SUPPLIER_MENU: &[MenuItem] = &[
    MenuItem { label: "Products", path: "/fournisseur" },
    MenuItem { label: "Orders", path: "/fournisseur/orders" },
    MenuItem { label: "Sales", path: "/fournisseur/sales" },
    MenuItem { label: "Invoices", path: "/fournisseur/invoices" },
    MenuItem { label: "Notifications", path: "/fournisseur/notifications" },
];

impl Role {
    pub fn view_config(&self) -> ViewConfig {
        let (base_path, menu) = match self {
            Role::Admin => ("/admin", ADMIN_MENU),
            Role::Worker => ("/travailleur", WORKER_MENU),
            Role::ProjectOwner => ("/projet", PROJECT_OWNER_MENU),
            Role::Supplier => ("/fournisseur", SUPPLIER_MENU),
        };
        ViewConfig { role: *self, base_path, menu }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard(Role),
    Inbox,
    Conversation(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Dashboard(role) => role.view_config().base_path.to_string(),
            Route::Inbox => "/messages".to_string(),
            Route::Conversation(username) => format!("/messages/{username}"),
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Route::Home),
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            ["messages"] => Some(Route::Inbox),
            ["messages", username] => Some(Route::Conversation(username.to_string())),
            [root] => Role::ALL
                .into_iter()
                .find(|r| r.view_config().base_path.trim_start_matches('/') == *root)
                .map(Route::Dashboard),
            _ => None,
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Home | Route::Login | Route::Register)
    }
}

/// The first role decides; a user without roles goes back to login.
pub fn dashboard_route(user: Option<&User>) -> Route {
    user.and_then(User::primary_role)
        .map(Route::Dashboard)
        .unwrap_or(Route::Login)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Allow,
    /// Session initialisation has not finished yet.
    Pending,
    Redirect(Route),
}

pub fn guard(route: &Route, auth: &AuthState) -> Guard {
    if auth.is_loading {
        return Guard::Pending;
    }
    let user = auth.user.as_ref().filter(|_| auth.is_authenticated);
    match route {
        Route::Home => Guard::Allow,
        Route::Login | Route::Register => match user {
            Some(u) => Guard::Redirect(dashboard_route(Some(u))),
            None => Guard::Allow,
        },
        Route::Dashboard(role) => match user {
            Some(u) if u.has_role(*role) => Guard::Allow,
            _ => Guard::Redirect(Route::Login),
        },
        Route::Inbox | Route::Conversation(_) => match user {
            Some(_) => Guard::Allow,
            None => Guard::Redirect(Route::Login),
        },
    }
}
