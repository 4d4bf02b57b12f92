//! A minimal HTTP/1.0 server for static files and CGI programs.
//!
//! Call it like this:
//!
//!     cgi-httpd -f config.toml
//!
//! The config file is in the [TOML format][toml]. Here is an example:
//!
//! ```toml
//! [listen]
//! address = "0.0.0.0"
//! port = 0
//!
//! [site]
//! webroot = "htdocs"
//! index = "index.html"
//!
//! [request]
//! max_line = 1024
//! ```
//!
//! This example also serves as the defaults if no config file is provided,
//! or any given key is not present. Port 0 asks the OS for a free port; the
//! one picked is logged at startup. If a key is of the wrong type, the server
//! will bail, so don't do that.
//!
//! `cgi-httpd` understands GET and POST. A GET with a query string, any
//! POST, and any request for an executable file runs that file as a CGI
//! program; everything else is served as a file, always as `text/html`.
//! Logging goes to stderr and is tuned with `SERVER_LOG`, using env_logger
//! filter syntax.
//!
//! [toml]: https://github.com/toml-lang/toml

#[macro_use]
extern crate log;

mod cgi;
mod config;
mod errors;
mod filesystem;
mod log_util;
mod server;
#[cfg(test)]
mod test_util;

use crate::config::parser::{self, parse_file};
use crate::config::Config;
use crate::server::Server;

use clap::{value_parser, Arg, Command};
use log::LevelFilter;

use std::env;
use std::path::{Path, PathBuf};
use std::process::exit;

fn main() {
    let mut log_builder = env_logger::Builder::new();
    log_builder.filter_level(LevelFilter::Info);

    if let Ok(var) = env::var("SERVER_LOG") {
        log_builder.parse_filters(&var);
    }

    if let Err(e) = log_builder.try_init() {
        eprintln!("cgi-httpd: Error when initializing logging: {}", e);
        exit(1);
    }

    let matches = Command::new("cgi-httpd")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Serves static files and runs CGI programs over HTTP/1.0")
        .arg(Arg::new("config_file")
             .short('f')
             .value_name("FILE")
             .help("The TOML file with server configuration")
             .value_parser(value_parser!(PathBuf)))
        .arg(Arg::new("port")
             .short('p')
             .long("port")
             .value_name("PORT")
             .help("Port to listen on, overriding the config file")
             .value_parser(value_parser!(u16)))
        .arg(Arg::new("webroot")
             .short('r')
             .long("webroot")
             .value_name("DIR")
             .help("Directory to serve, overriding the config file")
             .value_parser(value_parser!(PathBuf)))
        .get_matches();

    let mut config = match matches.get_one::<PathBuf>("config_file") {
        Some(config_file) => load_config(config_file),
        None => Config::default(),
    };

    if let Some(&port) = matches.get_one::<u16>("port") {
        config.listen.port = port;
    }
    if let Some(webroot) = matches.get_one::<PathBuf>("webroot") {
        config.site.webroot = webroot.clone();
    }

    let server = match Server::bind(config) {
        Ok(s) => s,
        Err(e) => {
            error!("Could not start the server: {}", e);
            exit(1);
        }
    };

    match server.local_addr() {
        Ok(addr) => info!("httpd running on port {} ({})", addr.port(), addr),
        Err(e) => warn!("Listening on an unknown address: {}", e),
    }

    if let Err(e) = server.run() {
        error!("Server stopped: {}", e);
        exit(1);
    }
}

/// Reads the config file, or logs why not and exits
fn load_config(config_file: &Path) -> Config {
    match parse_file(config_file) {
        Ok(c) => c,
        Err(parser::Error::Io(e)) => {
            error!("Error opening config file {:?}: {}", config_file, e);
            exit(1);
        }
        Err(parser::Error::Parse(error)) => {
            error!("Errors parsing config file {:?}", config_file);
            error!("Config file error at line {} column {}: {}",
                   error.line, error.column, error.desc);
            exit(1);
        }
        Err(parser::Error::Validation(message)) => {
            error!("Error in config file: {}", message);
            exit(1);
        }
    }
}
