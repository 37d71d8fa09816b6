use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};
use super::content_manager::ContentError;
use super::http::InboundRequest;

/// The argument vector handed to a delegated program:
/// `[method, host, port, referer, user-agent, name=value, ...]`.
pub fn cgi_arguments(request: &InboundRequest, port: u16) -> Vec<String> {
    let mut args = vec![
        request.method.as_str().to_string(),
        request.host.clone(),
        port.to_string(),
        request.referer.clone(),
        request.user_agent.clone()
    ];
    args.extend(request.arguments.iter().map(|arg| arg.to_string()));
    args
}

#[derive(Debug)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf
}

impl Invocation {
    /// `launcher` is a command prefix the target is appended to; when empty the
    /// target itself is executed.
    pub fn new(launcher: &[String], target: &Path, cgi_args: Vec<String>, working_dir: &Path) -> Invocation {
        let (program, args) = match launcher.split_first() {
            Some((program, prefix)) => {
                let mut args = prefix.to_vec();
                args.push(target.display().to_string());
                args.extend(cgi_args);
                (PathBuf::from(program), args)
            },
            None => (target.to_path_buf(), cgi_args)
        };
        Invocation { program, args, working_dir: working_dir.to_path_buf() }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Runs the program to completion and returns its stdout.
    ///
    /// `Command::output` blocks on the child's exit while draining both pipes,
    /// so a chatty stderr cannot stall it.
    pub fn run(&self) -> Result<Vec<u8>, ContentError> {
        let program = self.program();
        debug!(program = %program.display(), args = ?self.args(), "running delegated program");
        let output = Command::new(program)
            .args(self.args())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(output) => {
                if !output.stderr.is_empty() {
                    debug!(program = %program.display(), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));
                }
                if !output.status.success() {
                    warn!(program = %program.display(), status = %output.status, "delegated program failed");
                }
                Ok(output.stdout)
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ContentError::NotFound(program.to_path_buf())),
            Err(e) => Err(ContentError::Io { path: program.to_path_buf(), source: e })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cgi_arguments, Invocation};
    use crate::server::content_manager::ContentError;
    use crate::server::http::{parse_arguments, InboundRequest, Method};
    use std::path::Path;

    fn request() -> InboundRequest {
        InboundRequest {
            method: Method::Post,
            path: "/form.cgi".to_string(),
            arguments: parse_arguments("a=1&b=&c"),
            host: "example.org".to_string(),
            referer: "".to_string(),
            user_agent: "curl/8.0".to_string()
        }
    }

    #[test]
    fn metadata_comes_first() {
        let args = cgi_arguments(&request(), 8080);
        assert_eq!(vec!["POST", "example.org", "8080", "", "curl/8.0", "a=1", "b=", "c="], args);
    }

    #[test]
    fn launcher_prefixes_target() {
        let launcher = vec!["java".to_string(), "-jar".to_string()];
        let invocation = Invocation::new(&launcher, Path::new("/srv/www/page.jar"), vec!["GET".to_string()], Path::new("/srv/www"));
        assert_eq!(Path::new("java"), invocation.program());
        assert_eq!(&["-jar".to_string(), "/srv/www/page.jar".to_string(), "GET".to_string()], invocation.args());
    }

    #[test]
    fn no_launcher_runs_target() {
        let invocation = Invocation::new(&[], Path::new("/srv/www/page.cgi"), vec!["GET".to_string()], Path::new("/srv/www"));
        assert_eq!(Path::new("/srv/www/page.cgi"), invocation.program());
        assert_eq!(&["GET".to_string()], invocation.args());
    }

    #[test]
    fn missing_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing.cgi");
        let invocation = Invocation::new(&[], &target, Vec::new(), dir.path());
        match invocation.run() {
            Err(ContentError::NotFound(path)) => assert_eq!(target, path),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_only() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("echo.cgi");
        std::fs::write(&script, "printf '%s|' \"$@\"\npwd >&2\necho oops >&2\n").unwrap();
        let launcher = vec!["sh".to_string()];
        let invocation = Invocation::new(&launcher, &script, cgi_arguments(&request(), 81), dir.path());

        let body = invocation.run().unwrap();
        assert_eq!(b"POST|example.org|81||curl/8.0|a=1|b=|c=|".to_vec(), body);
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.txt"), "from root").unwrap();
        let script = dir.path().join("cat.cgi");
        std::fs::write(&script, "cat data.txt\n").unwrap();
        let launcher = vec!["sh".to_string()];
        let invocation = Invocation::new(&launcher, &script, Vec::new(), dir.path());

        assert_eq!(b"from root".to_vec(), invocation.run().unwrap());
    }
}
