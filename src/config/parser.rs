use super::*;
use toml::{Table, Value};

use std::fs::File;
use std::io::{self, Read};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

pub fn parse_file<P: AsRef<Path>>(conf: P) -> Result<Config, Error> {
    let mut toml = String::new();
    {
        let mut f = File::open(conf)?;
        f.read_to_string(&mut toml)?;
    }

    parse_str(&toml)
}

pub fn parse_str(toml: &str) -> Result<Config, Error> {
    match toml.parse::<Table>() {
        Ok(table) => config_from_table(&table),
        Err(e) => Err(Error::Parse(message_from_error(toml, &e))),
    }
}

/// Finds a dotted key like `"listen.port"` in nested tables
fn lookup<'a>(table: &'a Table, path: &str) -> Option<&'a Value> {
    let mut keys = path.split('.');
    let mut current = table.get(keys.next()?)?;
    for key in keys {
        current = current.as_table()?.get(key)?;
    }
    Some(current)
}

fn config_from_table(table: &Table) -> Result<Config, Error> {
    let mut config: Config = Default::default();

    match lookup(table, "listen.address") {
        Some(Value::String(addr)) => match addr.parse::<IpAddr>() {
            Ok(a) => config.listen.address = a,
            Err(_) => {
                return Err(Error::Validation(format!(
                    "The listen address {:?} is not an IP address",
                    addr
                )))
            }
        },
        Some(val) => {
            return Err(Error::Validation(format!(
                "Expected the listen address to be a string, got a {}",
                val.type_str()
            )))
        }
        None => (),
    }

    match lookup(table, "listen.port") {
        Some(&Value::Integer(p)) if (0..=u16::MAX as i64).contains(&p) => {
            config.listen.port = p as u16
        }
        Some(&Value::Integer(p)) => {
            return Err(Error::Validation(format!(
                "The given port {} is out of range",
                p
            )))
        }
        Some(val) => {
            return Err(Error::Validation(format!(
                "Expected the port to be an integer, got a {}",
                val.type_str()
            )))
        }
        None => (),
    }

    match lookup(table, "site.webroot") {
        Some(Value::String(path)) => config.site.webroot = PathBuf::from(path),
        Some(val) => {
            return Err(Error::Validation(format!(
                "Expected the webroot to be a string, got a {}",
                val.type_str()
            )))
        }
        None => (),
    }

    match lookup(table, "site.index") {
        Some(Value::String(name)) if !name.is_empty() && !name.contains('/') => {
            config.site.index = name.clone()
        }
        Some(Value::String(name)) => {
            return Err(Error::Validation(format!(
                "The index document {:?} must be a plain file name",
                name
            )))
        }
        Some(val) => {
            return Err(Error::Validation(format!(
                "Expected the index document to be a string, got a {}",
                val.type_str()
            )))
        }
        None => (),
    }

    match lookup(table, "request.max_line") {
        Some(&Value::Integer(n)) if n > 0 => config.max_line = n as usize,
        Some(&Value::Integer(n)) => {
            return Err(Error::Validation(format!(
                "The maximum line length must be positive, got {}",
                n
            )))
        }
        Some(val) => {
            return Err(Error::Validation(format!(
                "Expected the maximum line length to be an integer, got a {}",
                val.type_str()
            )))
        }
        None => (),
    }

    Ok(config)
}

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Parse(ErrorMessage),
    Validation(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

/// An owned, rendered version of a TOML syntax error
#[derive(Debug, Clone)]
pub struct ErrorMessage {
    pub desc: String,
    pub line: usize,
    pub column: usize,
}

/// Convert a `toml::de::Error` into an `ErrorMessage` with 1-based position
fn message_from_error(source: &str, error: &toml::de::Error) -> ErrorMessage {
    let offset = error.span().map_or(0, |span| span.start).min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;

    ErrorMessage {
        desc: error.message().to_owned(),
        line,
        column,
    }
}
