//! HTTP client for a running hakstore server
//!
//! Used by the CLI commands and the Markdown exporter. Every request carries the
//! configured `X-API-Key`.

mod http;

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientSettings;
use crate::jobs::Job;
use crate::store::{
    EntityKind, Ip, NewIp, NewPlatform, NewProgram, NewRootDomain, NewSubdomain, NewUser,
    NewVuln, Platform, PlatformUpdate, Program, ProgramUpdate, RootDomain, RootDomainUpdate,
    Subdomain, SubdomainUpdate, User, Vuln,
};

use http::{encode_segment, send, with_key};

/// API collection name for an entity kind
pub fn collection(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Platform => "platforms",
        EntityKind::Program => "programs",
        EntityKind::RootDomain => "rootdomains",
        EntityKind::Subdomain => "subdomains",
        EntityKind::Ip => "ips",
        EntityKind::Vuln => "vulns",
        EntityKind::User => "users",
    }
}

/// API client bound to one server and key
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(60))
            .build();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            agent,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(&settings.base_url, &settings.api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        send(with_key(self.agent.get(&self.url(path)), &self.api_key), None)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        let body = serde_json::to_value(body)?;
        send(
            with_key(self.agent.post(&self.url(path)), &self.api_key),
            Some(&body),
        )
    }

    fn put<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        let body = serde_json::to_value(body)?;
        send(
            with_key(self.agent.put(&self.url(path)), &self.api_key),
            Some(&body),
        )
    }

    fn item_path(kind: EntityKind, id: &str) -> String {
        format!("{}/{}", collection(kind), encode_segment(id))
    }

    /// Unauthenticated liveness probe
    pub fn health(&self) -> Result<Value> {
        self.get("health")
    }

    /// Cascade-delete one node; returns the server's report
    pub fn delete(&self, kind: EntityKind, id: &str) -> Result<Value> {
        let path = Self::item_path(kind, id);
        send(
            with_key(self.agent.delete(&self.url(&path)), &self.api_key),
            None,
        )
    }

    /// Delete the IP rows for `address`, optionally only under `program`
    pub fn delete_ip(&self, address: &str, program: Option<&str>) -> Result<Value> {
        let mut path = Self::item_path(EntityKind::Ip, address);
        if let Some(program) = program {
            path.push_str(&format!("?program={}", encode_segment(program)));
        }
        send(
            with_key(self.agent.delete(&self.url(&path)), &self.api_key),
            None,
        )
    }

    // Platforms

    pub fn platforms(&self) -> Result<Vec<Platform>> {
        self.get("platforms")
    }

    pub fn platform(&self, id: &str) -> Result<Platform> {
        self.get(&Self::item_path(EntityKind::Platform, id))
    }

    pub fn create_platforms(&self, batch: &[NewPlatform]) -> Result<Vec<Platform>> {
        self.post("platforms", &batch)
    }

    pub fn update_platform(&self, id: &str, update: &PlatformUpdate) -> Result<Platform> {
        self.put(&Self::item_path(EntityKind::Platform, id), update)
    }

    pub fn platform_programs(&self, id: &str) -> Result<Vec<Program>> {
        self.get(&format!("{}/programs", Self::item_path(EntityKind::Platform, id)))
    }

    // Programs

    pub fn programs(&self) -> Result<Vec<Program>> {
        self.get("programs")
    }

    pub fn program(&self, id: &str) -> Result<Program> {
        self.get(&Self::item_path(EntityKind::Program, id))
    }

    pub fn create_programs(&self, batch: &[NewProgram]) -> Result<Vec<Program>> {
        self.post("programs", &batch)
    }

    pub fn update_program(&self, id: &str, update: &ProgramUpdate) -> Result<Program> {
        self.put(&Self::item_path(EntityKind::Program, id), update)
    }

    fn program_child<T: DeserializeOwned>(&self, id: &str, child: &str) -> Result<T> {
        self.get(&format!("{}/{child}", Self::item_path(EntityKind::Program, id)))
    }

    pub fn program_root_domains(&self, id: &str) -> Result<Vec<RootDomain>> {
        self.program_child(id, "rootdomains")
    }

    pub fn program_subdomains(&self, id: &str) -> Result<Vec<Subdomain>> {
        self.program_child(id, "subdomains")
    }

    pub fn program_ips(&self, id: &str) -> Result<Vec<Ip>> {
        self.program_child(id, "ips")
    }

    pub fn program_vulns(&self, id: &str) -> Result<Vec<Vuln>> {
        self.program_child(id, "vulns")
    }

    // Root domains

    pub fn root_domains(&self) -> Result<Vec<RootDomain>> {
        self.get("rootdomains")
    }

    pub fn root_domain(&self, id: &str) -> Result<RootDomain> {
        self.get(&Self::item_path(EntityKind::RootDomain, id))
    }

    pub fn create_root_domains(&self, batch: &[NewRootDomain]) -> Result<Vec<RootDomain>> {
        self.post("rootdomains", &batch)
    }

    pub fn update_root_domain(&self, id: &str, update: &RootDomainUpdate) -> Result<RootDomain> {
        self.put(&Self::item_path(EntityKind::RootDomain, id), update)
    }

    pub fn root_domain_subdomains(&self, id: &str) -> Result<Vec<Subdomain>> {
        self.get(&format!(
            "{}/subdomains",
            Self::item_path(EntityKind::RootDomain, id)
        ))
    }

    // Subdomains

    pub fn subdomains(&self) -> Result<Vec<Subdomain>> {
        self.get("subdomains")
    }

    pub fn recent_subdomains(&self, minutes: u64) -> Result<Vec<Subdomain>> {
        self.get(&format!("subdomains/recent/{minutes}"))
    }

    pub fn subdomain(&self, id: &str) -> Result<Subdomain> {
        self.get(&Self::item_path(EntityKind::Subdomain, id))
    }

    pub fn create_subdomains(&self, batch: &[NewSubdomain]) -> Result<Vec<Subdomain>> {
        self.post("subdomains", &batch)
    }

    pub fn update_subdomain(&self, id: &str, update: &SubdomainUpdate) -> Result<Subdomain> {
        self.put(&Self::item_path(EntityKind::Subdomain, id), update)
    }

    pub fn associate_ips(&self, id: &str, addresses: &[String]) -> Result<Vec<Ip>> {
        self.post(
            &format!("{}/ips", Self::item_path(EntityKind::Subdomain, id)),
            &addresses,
        )
    }

    // IPs

    pub fn ips(&self) -> Result<Vec<Ip>> {
        self.get("ips")
    }

    /// Every row for `address`, or the one under `program`
    pub fn ip(&self, address: &str, program: Option<&str>) -> Result<Vec<Ip>> {
        let mut path = Self::item_path(EntityKind::Ip, address);
        if let Some(program) = program {
            path.push_str(&format!("?program={}", encode_segment(program)));
        }
        self.get(&path)
    }

    pub fn create_ips(&self, batch: &[NewIp]) -> Result<Vec<Ip>> {
        self.post("ips", &batch)
    }

    // Vulns

    pub fn vulns(&self) -> Result<Vec<Vuln>> {
        self.get("vulns")
    }

    pub fn vuln(&self, id: i64) -> Result<Vuln> {
        self.get(&format!("vulns/{id}"))
    }

    pub fn create_vulns(&self, batch: &[NewVuln]) -> Result<Vec<Vuln>> {
        self.post("vulns", &batch)
    }

    // Users

    pub fn users(&self) -> Result<Vec<User>> {
        self.get("users")
    }

    pub fn create_users(&self, batch: &[NewUser]) -> Result<Vec<User>> {
        self.post("users", &batch)
    }

    // Jobs

    /// Enqueue jobs; returns the server's confirmation message
    pub fn enqueue_jobs(&self, jobs: &[Job]) -> Result<String> {
        #[derive(serde::Deserialize)]
        struct Response {
            message: String,
        }

        let response: Response = self.post("jobs", &jobs)?;
        Ok(response.message)
    }

    /// Pop the next job of `queue`, None when it is empty
    pub fn next_job(&self, queue: &str) -> Result<Option<Job>> {
        let url = self.url(&format!("jobs/{}/next", encode_segment(queue)));
        let req = with_key(self.agent.post(&url), &self.api_key);
        match req.call() {
            Ok(resp) => Ok(Some(resp.into_json()?)),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(anyhow::anyhow!(http::format_http_error(code, &body)))
            }
            Err(e) => Err(anyhow::anyhow!(e)),
        }
    }
}
