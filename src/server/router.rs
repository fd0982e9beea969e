//! Path → route resolution for the `/api` surface

use std::collections::HashMap;

/// Children listable under `/api/programs/{id}/...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramChild {
    RootDomains,
    Ips,
    Subdomains,
    Vulns,
}

impl ProgramChild {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "rootdomains" => Some(ProgramChild::RootDomains),
            "ips" => Some(ProgramChild::Ips),
            "subdomains" => Some(ProgramChild::Subdomains),
            "vulns" => Some(ProgramChild::Vulns),
            _ => None,
        }
    }
}

/// A resolved API path. Ids are percent-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Health,
    Platforms,
    Platform(String),
    PlatformPrograms(String),
    Programs,
    Program(String),
    ProgramChildren(String, ProgramChild),
    RootDomains,
    RootDomain(String),
    RootDomainSubdomains(String),
    Subdomains,
    Subdomain(String),
    SubdomainsRecent(String),
    SubdomainIps(String),
    Ips,
    Ip(String),
    Vulns,
    Vuln(String),
    Users,
    Jobs,
    JobsNext(String),
}

impl Route {
    /// `/api/health` is reachable without a key
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Health)
    }

    /// Resolve a request URL (query string allowed). None means 404.
    pub fn parse(url: &str) -> Option<Self> {
        let path = url.split('?').next().unwrap_or(url);
        let rest = path.strip_prefix("/api/")?;
        let raw: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
        if raw.iter().any(|s| s.is_empty()) {
            return None;
        }
        let segments: Vec<String> = raw
            .iter()
            .map(|s| decode_segment(s))
            .collect::<Option<_>>()?;
        let segs: Vec<&str> = segments.iter().map(String::as_str).collect();

        let route = match segs.as_slice() {
            ["health"] => Route::Health,

            ["platforms"] => Route::Platforms,
            ["platforms", id] => Route::Platform(id.to_string()),
            ["platforms", id, "programs"] => Route::PlatformPrograms(id.to_string()),

            ["programs"] => Route::Programs,
            ["programs", id] => Route::Program(id.to_string()),
            ["programs", id, child] => {
                Route::ProgramChildren(id.to_string(), ProgramChild::parse(child)?)
            }

            ["rootdomains"] => Route::RootDomains,
            ["rootdomains", id] => Route::RootDomain(id.to_string()),
            ["rootdomains", id, "subdomains"] => Route::RootDomainSubdomains(id.to_string()),

            ["subdomains"] => Route::Subdomains,
            ["subdomains", "recent", minutes] => Route::SubdomainsRecent(minutes.to_string()),
            ["subdomains", id] => Route::Subdomain(id.to_string()),
            ["subdomains", id, "ips"] => Route::SubdomainIps(id.to_string()),

            ["ips"] => Route::Ips,
            ["ips", id] => Route::Ip(id.to_string()),

            ["vulns"] => Route::Vulns,
            ["vulns", id] => Route::Vuln(id.to_string()),

            ["users"] => Route::Users,

            ["jobs"] => Route::Jobs,
            ["jobs", queue, "next"] => Route::JobsNext(queue.to_string()),

            _ => return None,
        };
        Some(route)
    }
}

fn decode_segment(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(|s| s.into_owned())
}

/// Query string parameters, percent-decoded. Later keys win.
pub fn query_params(url: &str) -> HashMap<String, String> {
    let Some((_, query)) = url.split_once('?') else {
        return HashMap::new();
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.replace('+', " ");
            Some((decode_segment(key)?, decode_segment(&value)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_and_item_routes() {
        assert_eq!(Route::parse("/api/platforms"), Some(Route::Platforms));
        assert_eq!(
            Route::parse("/api/platforms/hackerone/"),
            Some(Route::Platform("hackerone".into()))
        );
        assert_eq!(
            Route::parse("/api/programs/tesla/ips"),
            Some(Route::ProgramChildren("tesla".into(), ProgramChild::Ips))
        );
        assert_eq!(
            Route::parse("/api/vulns/12?x=1"),
            Some(Route::Vuln("12".into()))
        );
        assert_eq!(
            Route::parse("/api/jobs/nuclei/next"),
            Some(Route::JobsNext("nuclei".into()))
        );
    }

    #[test]
    fn test_recent_takes_precedence_over_subdomain_children() {
        assert_eq!(
            Route::parse("/api/subdomains/recent/60"),
            Some(Route::SubdomainsRecent("60".into()))
        );
        // a bare "recent" is still a subdomain id
        assert_eq!(
            Route::parse("/api/subdomains/recent"),
            Some(Route::Subdomain("recent".into()))
        );
        assert_eq!(
            Route::parse("/api/subdomains/www.tesla.com/ips"),
            Some(Route::SubdomainIps("www.tesla.com".into()))
        );
    }

    #[test]
    fn test_unknown_paths() {
        assert_eq!(Route::parse("/"), None);
        assert_eq!(Route::parse("/api"), None);
        assert_eq!(Route::parse("/api/widgets"), None);
        assert_eq!(Route::parse("/api/programs/tesla/widgets"), None);
        assert_eq!(Route::parse("/api/platforms//programs"), None);
    }

    #[test]
    fn test_ids_are_percent_decoded() {
        assert_eq!(
            Route::parse("/api/ips/2001%3Adb8%3A%3A1"),
            Some(Route::Ip("2001:db8::1".into()))
        );
    }

    #[test]
    fn test_query_params() {
        let q = query_params("/api/ips/1.2.3.4?program=tesla&note=a+b%21");
        assert_eq!(q.get("program").map(String::as_str), Some("tesla"));
        assert_eq!(q.get("note").map(String::as_str), Some("a b!"));
        assert!(query_params("/api/ips").is_empty());
    }
}
