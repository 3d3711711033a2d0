//! Command line arping utility.
//!
//! Needs raw socket access: run as root, or grant the binary `cap_net_raw` with
//! `sudo setcap cap_net_raw+ep <ARPING_PATH>`.

mod subscriber;

use arping::{Arping, Error, IntoIpv4, Reply};
use clap::{App, AppSettings, Arg, ArgMatches};
use std::env;
use std::ffi::OsString;
use std::net::Ipv4Addr;
use std::process;
use std::time::Duration;
use subscriber::VerboseSubscriber;

const EXIT_ONLINE: i32 = 0;
const EXIT_OFFLINE: i32 = 1;
const EXIT_ERROR: i32 = 2;

fn app() -> App<'static, 'static> {
    App::new("arping")
        .version("0.1")
        .author("arping-rs Contributors")
        .about("Ping a host on the local network with ARP requests")
        .setting(AppSettings::DisableVersion)
        .after_help("EXIT CODE:\n    0: target online\n    1: target offline\n    2: error occurred")
        .arg(Arg::with_name("verbose")
             .short("v")
             .help("Verbose output"))
        .arg(Arg::with_name("gratuitous")
             .short("U")
             .help("Unsolicited/gratuitous ARP mode"))
        .arg(Arg::with_name("interface")
             .short("i")
             .value_name("IFACE")
             .help("Interface name to use - autodetected if omitted")
             .takes_value(true))
        .arg(Arg::with_name("timeout")
             .short("t")
             .value_name("DURATION")
             .help("Timeout - such as 100ms, 500ms, 1s ...")
             .takes_value(true)
             .default_value("500ms"))
        .arg(Arg::with_name("IP")
             .help("Address to ping, or to announce with -U")
             .index(1))
}

fn main() {
    process::exit(cli(env::args_os()));
}

/// Parses `args` and runs the operation. Usage problems, including `-h`, exit with
/// `EXIT_ERROR` so that 1 always means "target offline".
fn cli<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match app().get_matches_from_safe(args) {
        Ok(matches) => matches,
        Err(err) => return report(&err.message, EXIT_ERROR),
    };

    match matches.value_of("IP") {
        Some(dst) => run(&matches, dst),
        None => {
            println!("Parameter <IP> missing!");
            let _ = app().print_help();
            println!();
            EXIT_ERROR
        }
    }
}

/// Runs the requested operation, reports its outcome and returns the exit code.
fn run(matches: &ArgMatches, dst: &str) -> i32 {
    let mut arping = Arping::new();
    if matches.is_present("verbose") {
        if tracing::subscriber::set_global_default(VerboseSubscriber::new()).is_ok() {
            arping.enable_verbose_log();
        }
    }
    if let Some(timeout) = matches.value_of("timeout") {
        match parse_duration(timeout) {
            Ok(timeout) => arping.set_timeout(timeout),
            Err(err) => return report(&err, EXIT_ERROR),
        }
    }

    let dst = match dst.into_ipv4() {
        Ok(dst) => dst,
        Err(err) => return report(&err, EXIT_ERROR),
    };
    let iface = matches.value_of("interface");

    if matches.is_present("gratuitous") {
        let announced = match iface {
            Some(name) => arping.gratuitous_arp_over_interface_by_name(dst, name),
            None => arping.gratuitous_arp(dst),
        };
        return match announced {
            Ok(()) => EXIT_ONLINE,
            Err(err) => report(&err, exit_code(&err)),
        };
    }

    let pinged = match iface {
        Some(name) => arping.ping_over_interface_by_name(dst, name),
        None => arping.ping(dst),
    };
    match pinged {
        Ok(reply) => {
            println!("{}", format_reply(dst, &reply));
            EXIT_ONLINE
        }
        Err(err) => report(&err, exit_code(&err)),
    }
}

fn report(err: &dyn std::fmt::Display, code: i32) -> i32 {
    println!("{}", err);
    code
}

fn exit_code(err: &Error) -> i32 {
    if err.is_timeout() {
        EXIT_OFFLINE
    } else {
        EXIT_ERROR
    }
}

fn format_reply(dst: Ipv4Addr, reply: &Reply) -> String {
    format!("{} ({}) {} usec", dst, reply.mac, format_micros(reply.elapsed))
}

/// Microseconds, with a thousands separator once above one millisecond.
fn format_micros(elapsed: Duration) -> String {
    let micros = elapsed.as_micros();
    if micros > 1000 {
        format!("{},{:03}", micros / 1000, micros % 1000)
    } else {
        micros.to_string()
    }
}

/// Parses durations such as `100ms`, `1.5s` or `2m`.
fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or_else(|| input.len());
    let (value, unit) = input.split_at(split);
    let value: f64 = value
        .parse()
        .map_err(|_| format!("invalid duration '{}'", input))?;

    let nanos_per_unit = match unit {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        "" if value == 0.0 => 0.0,
        "" => return Err(format!("missing unit in duration '{}'", input)),
        _ => return Err(format!("unknown unit '{}' in duration '{}'", unit, input)),
    };
    Ok(Duration::from_nanos((value * nanos_per_unit).round() as u64))
}
