//! A one-shot TCP probe.
//!
//! Connects to a port, sends the byte `A`, and prints the one byte that comes
//! back. Pointed at `cgi-httpd` it only shows the connection is accepted:
//! the server keeps reading until `A` is followed by a line end, so no byte
//! comes back and the exchange waits until the server is stopped.
//!
//!     probe 4000
//!     probe 4000 --host 10.0.0.2

#[macro_use]
extern crate log;

use clap::{value_parser, Arg, Command};
use log::LevelFilter;

use std::env;
use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, TcpStream};
use std::process::exit;

fn main() {
    let mut log_builder = env_logger::Builder::new();
    log_builder.filter_level(LevelFilter::Info);
    if let Ok(var) = env::var("SERVER_LOG") {
        log_builder.parse_filters(&var);
    }
    if let Err(e) = log_builder.try_init() {
        eprintln!("probe: Error when initializing logging: {}", e);
        exit(1);
    }

    let matches = Command::new("probe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Exchanges a single byte with a TCP server")
        .arg(Arg::new("port")
             .required(true)
             .value_name("PORT")
             .value_parser(value_parser!(u16).range(1..)))
        .arg(Arg::new("host")
             .long("host")
             .value_name("ADDR")
             .default_value("127.0.0.1")
             .value_parser(value_parser!(IpAddr)))
        .get_matches();

    let port = *matches.get_one::<u16>("port").unwrap_or(&0);
    let host = matches.get_one::<IpAddr>("host").cloned()
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    match exchange(host, port) {
        Ok(ch) => println!("char from server = {}", ch as char),
        Err(e) => {
            error!("Probe of {}:{} failed: {}", host, port, e);
            exit(1);
        }
    }
}

fn exchange(host: IpAddr, port: u16) -> io::Result<u8> {
    let mut stream = TcpStream::connect((host, port))?;
    stream.write_all(b"A")?;

    let mut ch = [0u8; 1];
    stream.read_exact(&mut ch)?;
    Ok(ch[0])
}
