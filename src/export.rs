//! Markdown export of the asset hierarchy
//!
//! Writes one directory per platform, program and root domain, each holding a
//! note named after itself, plus one note per subdomain:
//!
//! ```text
//! out/
//! └── hackerone/
//!     ├── hackerone.md
//!     └── tesla/
//!         ├── tesla.md
//!         └── tesla.com/
//!             ├── tesla.com.md
//!             └── www.tesla.com.md
//! ```
//!
//! Notes link to their ancestors with `[[wiki-links]]` so the tree can be opened
//! as a notes vault.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::client::ApiClient;
use crate::store::{AssetStore, Platform, Program, RootDomain, Subdomain};

/// Where the exporter reads the hierarchy from
pub trait ExportSource {
    fn platforms(&self) -> Result<Vec<Platform>>;
    fn programs_of(&self, platform: &str) -> Result<Vec<Program>>;
    fn root_domains_of(&self, program: &str) -> Result<Vec<RootDomain>>;
    fn subdomains_of(&self, root_domain: &str) -> Result<Vec<Subdomain>>;

    /// One subdomain with its IPs filled in
    fn subdomain(&self, id: &str) -> Result<Subdomain>;
}

impl ExportSource for ApiClient {
    fn platforms(&self) -> Result<Vec<Platform>> {
        ApiClient::platforms(self)
    }

    fn programs_of(&self, platform: &str) -> Result<Vec<Program>> {
        self.platform_programs(platform)
    }

    fn root_domains_of(&self, program: &str) -> Result<Vec<RootDomain>> {
        self.program_root_domains(program)
    }

    fn subdomains_of(&self, root_domain: &str) -> Result<Vec<Subdomain>> {
        self.root_domain_subdomains(root_domain)
    }

    fn subdomain(&self, id: &str) -> Result<Subdomain> {
        ApiClient::subdomain(self, id)
    }
}

impl ExportSource for AssetStore {
    fn platforms(&self) -> Result<Vec<Platform>> {
        Ok(AssetStore::platforms(self).list()?)
    }

    fn programs_of(&self, platform: &str) -> Result<Vec<Program>> {
        Ok(AssetStore::platforms(self).programs(platform)?)
    }

    fn root_domains_of(&self, program: &str) -> Result<Vec<RootDomain>> {
        Ok(self.programs().root_domains(program)?)
    }

    fn subdomains_of(&self, root_domain: &str) -> Result<Vec<Subdomain>> {
        Ok(self.root_domains().subdomains(root_domain)?)
    }

    fn subdomain(&self, id: &str) -> Result<Subdomain> {
        Ok(self.subdomains().get(id)?)
    }
}

/// What an export wrote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub platforms: usize,
    pub programs: usize,
    pub root_domains: usize,
    pub subdomains: usize,
}

impl ExportSummary {
    pub fn notes(&self) -> usize {
        self.platforms + self.programs + self.root_domains + self.subdomains
    }
}

/// Make an id safe to use as a file or directory name
pub fn sanitize_filename(id: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| {
        Regex::new(r"[^A-Za-z0-9._-]").expect("static regex is valid")
    });

    let cleaned = re.replace_all(id.trim(), "_");
    match cleaned.as_ref() {
        "" | "." | ".." => "_".to_string(),
        name => name.to_string(),
    }
}

fn write_note(dir: &Path, id: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{}.md", sanitize_filename(id)));
    fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn make_dir(parent: &Path, id: &str) -> Result<PathBuf> {
    let dir = parent.join(sanitize_filename(id));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    Ok(dir)
}

fn subdomain_note(platform: &str, program: &str, root: &str, sub: &Subdomain) -> String {
    let mut note = format!(
        "# {}\n\nPlatform: [[{platform}]]\nProgram: [[{program}]]\nRoot Domain: [[{root}]]\n",
        sub.id
    );
    if let Some(cname) = &sub.cname {
        note.push_str(&format!("CNAME: {cname}\n"));
    }
    if let Some(nameservers) = sub.nameservers.as_ref().filter(|ns| !ns.is_empty()) {
        note.push_str(&format!("Nameservers: {}\n", nameservers.join(", ")));
    }
    if !sub.ips.is_empty() {
        note.push_str("\n## IPs\n\n");
        for ip in &sub.ips {
            note.push_str(&format!("- {ip}\n"));
        }
    }
    note
}

/// Write the whole hierarchy under `out_dir`
pub fn export_markdown(source: &dyn ExportSource, out_dir: &Path) -> Result<ExportSummary> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create directory {}", out_dir.display()))?;

    let mut summary = ExportSummary::default();
    for platform in source.platforms()? {
        let platform_dir = make_dir(out_dir, &platform.id)?;
        let mut note = format!("# {}\n", platform.id);
        if !platform.url.is_empty() {
            note.push_str(&format!("\nURL: {}\n", platform.url));
        }
        write_note(&platform_dir, &platform.id, &note)?;
        summary.platforms += 1;

        for program in source.programs_of(&platform.id)? {
            let program_dir = make_dir(&platform_dir, &program.id)?;
            write_note(
                &program_dir,
                &program.id,
                &format!("# {}\n\nPlatform: [[{}]]\n", program.id, platform.id),
            )?;
            summary.programs += 1;

            for root in source.root_domains_of(&program.id)? {
                let root_dir = make_dir(&program_dir, &root.id)?;
                write_note(
                    &root_dir,
                    &root.id,
                    &format!(
                        "# {}\n\nPlatform: [[{}]]\nProgram: [[{}]]\n",
                        root.id, platform.id, program.id
                    ),
                )?;
                summary.root_domains += 1;

                for sub in source.subdomains_of(&root.id)? {
                    let sub = source.subdomain(&sub.id)?;
                    let note = subdomain_note(&platform.id, &program.id, &root.id, &sub);
                    write_note(&root_dir, &sub.id, &note)?;
                    summary.subdomains += 1;
                }
            }
        }
    }

    tracing::info!(
        "[hakstore:export] Wrote {} notes to {}",
        summary.notes(),
        out_dir.display()
    );
    Ok(summary)
}
