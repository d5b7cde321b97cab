use argh::{EarlyExit, FromArgs};

pub const DEFAULT_UMASK: &str = "022";

#[derive(FromArgs, Debug)]
/// Run scripts or programs in a directory.
pub struct Args {
    #[argh(switch)]
    /// print names of all valid files (can not be used with --test).
    pub list: bool,

    #[argh(switch)]
    /// print script names which would run, but don't run them.
    pub test: bool,

    #[argh(switch)]
    /// print script names if they produce output.
    pub report: bool,

    #[argh(switch)]
    /// reverse the scripts' execution order.
    pub reverse: bool,

    #[argh(switch)]
    /// multiplex stdin to scripts being run, using a temporary file.
    pub stdin: bool,

    #[argh(switch)]
    /// exit as soon as a script returns with a non-zero exit code.
    pub exit_on_error: bool,

    #[argh(switch, short = 'v')]
    /// print script names before running them.
    pub verbose: bool,

    #[argh(switch, short = 'V')]
    /// output version information and exit.
    pub version: bool,

    #[argh(option, short = 'a')]
    /// pass ARGUMENT to scripts, use once for each argument.
    pub arg: Vec<String>,

    #[argh(option, short = 'u', default = "DEFAULT_UMASK.to_string()")]
    /// sets umask to UMASK (octal), default is 022.
    pub umask: String,

    #[argh(option)]
    /// validate filenames based on the regular expression PATTERN.
    pub regex: Option<String>,

    #[argh(switch)]
    /// validate filenames based on LSB sysinit specs.
    pub lsbsysinit: bool,

    #[argh(positional)]
    /// the directory whose scripts are run.
    pub directory: Vec<String>,
}

/// Parse a full command line, `argv[0]` included.
///
/// Help requests and usage errors come back as [`EarlyExit`], the same way
/// `argh` reports them for any other command.
pub fn parse(argv: &[String]) -> Result<Args, EarlyExit> {
    let (command, rest) = match argv.split_first() {
        Some((command, rest)) => (command.as_str(), rest),
        None => ("runparts", argv),
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    Args::from_args(&[command], &rest)
}
