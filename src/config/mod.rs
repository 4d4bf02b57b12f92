pub mod parser;

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// A holder for app configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: ListenConfig,
    pub site: SiteConfig,
    /// Longest request or header line we keep, in bytes. Longer lines are
    /// truncated and the remainder is read as the next line.
    pub max_line: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            listen: Default::default(),
            site: Default::default(),
            max_line: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListenConfig {
    pub address: IpAddr,
    /// Port number to listen on; 0 lets the OS pick one
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> ListenConfig {
        ListenConfig {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Where the documents and CGI programs are located on disk
    pub webroot: PathBuf,
    /// Document served for a directory or a path ending in `/`
    pub index: String,
}

impl Default for SiteConfig {
    fn default() -> SiteConfig {
        SiteConfig {
            webroot: PathBuf::from("htdocs"),
            index: String::from("index.html"),
        }
    }
}
