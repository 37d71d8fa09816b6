use std::path::PathBuf;
use std::process;
use std::time::Duration;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use rust_cgi_server::{scaffold, start_server, Config};

fn cli() -> Command {
    Command::new("rust-cgi-server")
        .version("1.0")
        .about("A simple web server that runs CGI-style programs from its web root")
        .arg(Arg::new("address")
            .short('a')
            .long("address")
            .value_name("BIND_ADDRESS")
            .default_value("127.0.0.1"))
        .arg(Arg::new("port")
            .short('p')
            .long("port")
            .value_name("PORT_NUMBER")
            .value_parser(value_parser!(u16))
            .default_value("8080"))
        .arg(Arg::new("web_root")
            .short('w')
            .long("web-root")
            .value_name("ROOT_DIRECTORY")
            .value_parser(value_parser!(PathBuf))
            .default_value("."))
        .arg(Arg::new("default_file")
            .short('d')
            .long("default-file")
            .value_name("FILE")
            .help("File served for paths ending in /")
            .default_value("index.html"))
        .arg(Arg::new("verbose")
            .long("verbose")
            .action(ArgAction::SetTrue)
            .help("Log debug output, including delegated programs' stderr"))
        .arg(Arg::new("read_timeout")
            .long("read-timeout")
            .value_name("SECONDS")
            .value_parser(value_parser!(u64))
            .help("Drop clients that send nothing for this long"))
        .arg(Arg::new("max_body")
            .long("max-body")
            .value_name("BYTES")
            .value_parser(value_parser!(usize))
            .default_value("1048576"))
        .arg(Arg::new("delegate_ext")
            .long("delegate-ext")
            .value_name("EXT")
            .help("Extension of files that are run instead of served")
            .default_value("cgi"))
        .arg(Arg::new("launcher")
            .long("launcher")
            .value_name("COMMAND")
            .help("Command prefix used to run delegated files, e.g. \"java -jar\""))
        .arg(Arg::new("configure")
            .short('c')
            .long("configure")
            .action(ArgAction::SetTrue)
            .help("Write starter 404 and not-supported pages into the web root and exit"))
}

fn config_from(matches: &ArgMatches) -> Config {
    let defaults = Config::default();
    Config {
        address: matches.get_one::<String>("address").cloned().unwrap_or(defaults.address),
        port: matches.get_one::<u16>("port").copied().unwrap_or(defaults.port),
        web_root: matches.get_one::<PathBuf>("web_root").cloned().unwrap_or(defaults.web_root),
        default_file: matches.get_one::<String>("default_file").cloned().unwrap_or(defaults.default_file),
        verbose: matches.get_flag("verbose"),
        read_timeout: matches.get_one::<u64>("read_timeout").map(|secs| Duration::from_secs(*secs)),
        max_body_bytes: matches.get_one::<usize>("max_body").copied().unwrap_or(defaults.max_body_bytes),
        delegate_extension: matches.get_one::<String>("delegate_ext").cloned().unwrap_or(defaults.delegate_extension),
        launcher: matches.get_one::<String>("launcher")
            .map(|launcher| launcher.split_whitespace().map(str::to_string).collect())
            .unwrap_or(defaults.launcher),
        not_found_page: defaults.not_found_page,
        not_supported_page: defaults.not_supported_page
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let matches = cli().get_matches();
    let config = config_from(&matches);
    init_logging(config.verbose);

    if matches.get_flag("configure") {
        match scaffold::configure(&config) {
            Ok(written) => {
                for path in written {
                    info!("wrote {}", path.display());
                }
                info!("Successfully configured {}", config.web_root.display());
                return;
            },
            Err(e) => {
                error!("Unable to write file: {}", e);
                process::exit(1);
            }
        }
    }

    match start_server(config) {
        Ok(server) => {
            if server.handle.join().is_err() {
                error!("listener thread panicked");
                process::exit(1);
            }
        },
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cli, config_from};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let config = config_from(&cli().get_matches_from(vec!["rust-cgi-server"]));
        assert_eq!("127.0.0.1:8080", config.address());
        assert_eq!(PathBuf::from("."), config.web_root);
        assert_eq!("index.html", config.default_file);
        assert!(!config.verbose);
        assert_eq!(None, config.read_timeout);
        assert_eq!("cgi", config.delegate_extension);
        assert!(config.launcher.is_empty());
    }

    #[test]
    fn all_options() {
        let matches = cli().get_matches_from(vec![
            "rust-cgi-server", "-p", "9090", "-w", "www", "-d", "home.html", "--verbose",
            "--read-timeout", "5", "--delegate-ext", "jar", "--launcher", "java -jar"
        ]);
        let config = config_from(&matches);
        assert_eq!(9090, config.port);
        assert_eq!(PathBuf::from("www"), config.web_root);
        assert_eq!("home.html", config.default_file);
        assert!(config.verbose);
        assert_eq!(Some(Duration::from_secs(5)), config.read_timeout);
        assert_eq!("jar", config.delegate_extension);
        assert_eq!(vec!["java", "-jar"], config.launcher);
    }

    #[test]
    fn rejects_bad_port() {
        assert!(cli().try_get_matches_from(vec!["rust-cgi-server", "-p", "http"]).is_err());
    }
}
