//! CLI command definitions for hakstore.

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the REST API server
    Serve {
        /// Interface to bind (overrides [server].host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides [server].port)
        #[arg(long)]
        port: Option<u16>,

        /// Request worker threads (overrides [server].workers)
        #[arg(long)]
        workers: Option<usize>,

        /// SQLite database file (overrides [server].database)
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Write a default ~/.hakstore/config.toml
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Manage platforms (HackerOne, Bugcrowd, ...)
    Platforms {
        #[command(subcommand)]
        command: PlatformCommands,
    },

    /// Manage programs
    Programs {
        #[command(subcommand)]
        command: ProgramCommands,
    },

    /// Manage root domains
    Rootdomains {
        #[command(subcommand)]
        command: RootDomainCommands,
    },

    /// Manage subdomains
    Subdomains {
        #[command(subcommand)]
        command: SubdomainCommands,
    },

    /// Manage IP addresses
    Ips {
        #[command(subcommand)]
        command: IpCommands,
    },

    /// Manage vulnerabilities
    Vulns {
        #[command(subcommand)]
        command: VulnCommands,
    },

    /// Enqueue or pull scanner jobs
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Manage API users
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Export the hierarchy as a Markdown notes tree
    Export {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum PlatformCommands {
    /// List platforms
    List,
    /// Show one platform
    Get { id: String },
    /// Create (or update the url of) a platform
    Create {
        id: String,
        #[arg(long, default_value = "")]
        url: String,
    },
    /// Change a platform's url
    Update {
        id: String,
        #[arg(long)]
        url: String,
    },
    /// Delete a platform and everything under it
    Delete { id: String },
    /// List a platform's programs
    Programs { id: String },
}

#[derive(Subcommand)]
pub enum ProgramCommands {
    /// List programs
    List,
    /// Show one program
    Get { id: String },
    /// Create a program
    Create {
        id: String,
        #[arg(long, default_value = "")]
        platform: String,
    },
    /// Move a program to another platform
    Update {
        id: String,
        #[arg(long)]
        platform: String,
    },
    /// Delete a program and its root domains and subdomains
    Delete { id: String },
    /// List a program's root domains
    Rootdomains { id: String },
    /// List a program's subdomains
    Subdomains { id: String },
    /// List a program's IPs
    Ips { id: String },
    /// List a program's vulns
    Vulns { id: String },
}

#[derive(Subcommand)]
pub enum RootDomainCommands {
    /// List root domains
    List,
    /// Show one root domain
    Get { id: String },
    /// Create a root domain
    Create {
        id: String,
        #[arg(long, default_value = "")]
        program: String,
    },
    /// Move a root domain (and its subdomains) to another program
    Update {
        id: String,
        #[arg(long)]
        program: String,
    },
    /// Delete a root domain and its subdomains
    Delete { id: String },
    /// List a root domain's subdomains
    Subdomains { id: String },
}

#[derive(Subcommand)]
pub enum SubdomainCommands {
    /// List subdomains
    List {
        /// Only subdomains created in the last N minutes
        #[arg(long)]
        recent: Option<u64>,
    },
    /// Show one subdomain with its IPs
    Get { id: String },
    /// Create a subdomain
    Create {
        id: String,
        #[arg(long)]
        rootdomain: String,
        #[arg(long)]
        cname: Option<String>,
    },
    /// Change fields of a subdomain
    Update {
        id: String,
        #[arg(long)]
        rootdomain: Option<String>,
        #[arg(long)]
        cname: Option<String>,
        /// Comma separated nameservers
        #[arg(long)]
        nameservers: Option<String>,
    },
    /// Delete a subdomain
    Delete { id: String },
    /// Link IP addresses to a subdomain
    AssociateIps {
        id: String,
        /// Comma separated IP addresses
        #[arg(long)]
        ips: String,
    },
    /// Create subdomains from a file (one per line)
    Import {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        rootdomain: String,
    },
}

#[derive(Subcommand)]
pub enum IpCommands {
    /// List IPs
    List,
    /// Show the rows for an address
    Get {
        address: String,
        #[arg(long)]
        program: Option<String>,
    },
    /// Create an IP under a program
    Create {
        address: String,
        #[arg(long, default_value = "")]
        program: String,
    },
    /// Delete an address (every program's row unless --program is given)
    Delete {
        address: String,
        #[arg(long)]
        program: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum VulnCommands {
    /// List vulns
    List,
    /// Show one vuln
    Get { id: i64 },
    /// Report a vuln (alerts the matching webhook)
    Create {
        /// 1-5 or critical/high/medium/low/info
        #[arg(long)]
        severity: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        program: Option<String>,
        /// Comma separated subdomains
        #[arg(long)]
        subdomains: Option<String>,
        /// Comma separated IP addresses
        #[arg(long)]
        ips: Option<String>,
    },
    /// Delete a vuln
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum JobCommands {
    /// Enqueue a job; `--target all` enqueues every subdomain
    Create {
        #[arg(long)]
        queue: String,
        #[arg(long)]
        target: String,
    },
    /// Pop the next job from a queue
    Next {
        #[arg(long)]
        queue: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users and their keys
    List,
    /// Create a user (a key is generated by the server)
    Create { id: String },
}
