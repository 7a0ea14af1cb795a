//! URL → screen mapping for the site and the admin dashboard.
//! Public pages may carry a leading language segment (`/sv/blog/x`); the
//! admin dashboard is also reachable through hash routing (`#/admin/...`),
//! which wins over the path.

use serde::Serialize;

use crate::languages;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "section", content = "id", rename_all = "snake_case")]
pub enum AdminSection {
    Dashboard,
    Posts,
    NewPost,
    EditPost(String),
    Translations,
    Integrations,
    SecurityLogs,
    Login,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", content = "target", rename_all = "snake_case")]
pub enum Route {
    Home,
    Blog,
    BlogPost(String),
    Pricing,
    RoiCalculator,
    Contact,
    Privacy,
    Admin(AdminSection),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRoute {
    /// `None` means the default language.
    pub language: Option<&'static str>,
    pub route: Route,
}

impl Route {
    pub fn parse(path: &str, hash: &str) -> ParsedRoute {
        if let Some(admin) = parse_hash(hash) {
            return ParsedRoute {
                language: None,
                route: admin,
            };
        }

        let path = path.split(['?', '#']).next().unwrap_or_default();
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let language = segments
            .first()
            .and_then(|first| languages::find(first))
            .map(|l| l.code);
        if language.is_some() {
            segments.remove(0);
        }

        ParsedRoute {
            language,
            route: route_from_segments(&segments),
        }
    }

    /// Canonical path, prefixed with `language` for public pages.
    pub fn to_path(&self, language: Option<&str>) -> String {
        let tail = match self {
            Route::Home => String::new(),
            Route::Blog => "blog".to_string(),
            Route::BlogPost(slug) => format!("blog/{slug}"),
            Route::Pricing => "pricing".to_string(),
            Route::RoiCalculator => "roi-calculator".to_string(),
            Route::Contact => "contact".to_string(),
            Route::Privacy => "privacy".to_string(),
            Route::NotFound => "404".to_string(),
            Route::Admin(section) => return format!("/admin{}", admin_tail(section)),
        };

        match (language, tail.is_empty()) {
            (Some(lang), true) => format!("/{lang}"),
            (Some(lang), false) => format!("/{lang}/{tail}"),
            (None, _) => format!("/{tail}"),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Route::Admin(_))
    }
}

fn parse_hash(hash: &str) -> Option<Route> {
    let hash = hash.strip_prefix('#').unwrap_or(hash);
    let segments: Vec<&str> = hash.split('/').filter(|s| !s.is_empty()).collect();
    match segments.first() {
        Some(&"admin") => Some(route_from_segments(&segments)),
        _ => None,
    }
}

fn route_from_segments(segments: &[&str]) -> Route {
    match segments {
        [] => Route::Home,
        ["blog"] => Route::Blog,
        ["blog", slug] => Route::BlogPost(slug.to_string()),
        ["pricing"] => Route::Pricing,
        ["roi-calculator"] => Route::RoiCalculator,
        ["contact"] => Route::Contact,
        ["privacy"] | ["privacy-policy"] => Route::Privacy,
        ["admin", rest @ ..] => admin_route(rest),
        _ => Route::NotFound,
    }
}

fn admin_route(rest: &[&str]) -> Route {
    let section = match rest {
        [] | ["dashboard"] => AdminSection::Dashboard,
        ["posts"] => AdminSection::Posts,
        ["posts", "new"] => AdminSection::NewPost,
        ["posts", id] => AdminSection::EditPost(id.to_string()),
        ["translations"] => AdminSection::Translations,
        ["integrations"] => AdminSection::Integrations,
        ["security-logs"] => AdminSection::SecurityLogs,
        ["login"] => AdminSection::Login,
        _ => return Route::NotFound,
    };
    Route::Admin(section)
}

fn admin_tail(section: &AdminSection) -> String {
    match section {
        AdminSection::Dashboard => String::new(),
        AdminSection::Posts => "/posts".to_string(),
        AdminSection::NewPost => "/posts/new".to_string(),
        AdminSection::EditPost(id) => format!("/posts/{id}"),
        AdminSection::Translations => "/translations".to_string(),
        AdminSection::Integrations => "/integrations".to_string(),
        AdminSection::SecurityLogs => "/security-logs".to_string(),
        AdminSection::Login => "/login".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str) -> Route {
        Route::parse(path, "").route
    }

    #[test]
    fn public_pages() {
        assert_eq!(route("/"), Route::Home);
        assert_eq!(route("/blog/"), Route::Blog);
        assert_eq!(route("/blog/gdpr-checklist"), Route::BlogPost("gdpr-checklist".into()));
        assert_eq!(route("/roi-calculator?utm=x"), Route::RoiCalculator);
        assert_eq!(route("/privacy-policy"), Route::Privacy);
        assert_eq!(route("/blog/a/b"), Route::NotFound);
    }

    #[test]
    fn language_prefix_is_split_off() {
        let parsed = Route::parse("/sv/blog/hej", "");
        assert_eq!(parsed.language, Some("sv"));
        assert_eq!(parsed.route, Route::BlogPost("hej".into()));

        let parsed = Route::parse("/en/pricing", "");
        assert_eq!(parsed.language, None);
        assert_eq!(parsed.route, Route::NotFound);
    }

    #[test]
    fn hash_admin_route_wins() {
        let parsed = Route::parse("/da/pricing", "#/admin/translations");
        assert_eq!(parsed.route, Route::Admin(AdminSection::Translations));
        assert_eq!(parsed.language, None);

        assert_eq!(Route::parse("/pricing", "#contact").route, Route::Pricing);
    }

    #[test]
    fn admin_sections() {
        assert_eq!(route("/admin"), Route::Admin(AdminSection::Dashboard));
        assert_eq!(route("/admin/posts/new"), Route::Admin(AdminSection::NewPost));
        assert_eq!(route("/admin/posts/42"), Route::Admin(AdminSection::EditPost("42".into())));
        assert_eq!(route("/admin/security-logs"), Route::Admin(AdminSection::SecurityLogs));
        assert_eq!(route("/admin/nope"), Route::NotFound);
    }

    #[test]
    fn paths_parse_back_to_same_route() {
        let routes = [
            Route::Home,
            Route::BlogPost("x".into()),
            Route::Contact,
            Route::Admin(AdminSection::EditPost("7".into())),
        ];
        for r in routes {
            for lang in [None, Some("fi")] {
                let path = r.to_path(lang);
                assert_eq!(Route::parse(&path, "").route, r, "{path}");
            }
        }
    }
}
