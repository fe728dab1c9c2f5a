use std::fs;
use std::io::{self, BufRead, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything a script can do to the outside world goes through a `Host`. The evaluator
/// never performs I/O itself; only the native functions installed at bootstrap call into it.
pub trait Host {
    /// Writes one line of program output.
    fn print(&self, line: &str);

    /// Shows `message` and reads one line of input, or `None` at end of input.
    fn prompt(&self, message: &str) -> Option<String>;

    fn read_file(&self, path: &str) -> io::Result<String>;

    /// Milliseconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// The process's stdout, stdin, filesystem and clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdHost;

impl Host for StdHost {
    fn print(&self, line: &str) {
        println!("{}", line);
    }

    fn prompt(&self, message: &str) -> Option<String> {
        print!("{}", message);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                // Strip trailing \r\n (Windows) or \n (Unix)
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(line)
            }
        }
    }

    fn read_file(&self, path: &str) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64() * 1000.0)
            .unwrap_or_default()
    }
}
