//! Argument parsing and runtime setup for `livesync-listener`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::builder::{OsStringValueParser, PathBufValueParser};
use clap::{Arg, ArgAction, Command};
use daemon::{
    CommandReloadTrigger, Endpoint, ListenerConfig, ListenerError, LogReloadTrigger,
    ReloadTrigger, SyncService,
};
use engine::EscapePolicy;
use logging::{LogConfig, init_tracing};
use tracing::{error, info};

const PROGRAM_NAME: &str = "livesync-listener";

/// Options accepted on the command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ParsedArgs {
    pub(crate) files_dir: PathBuf,
    pub(crate) app_id: String,
    pub(crate) socket: Option<PathBuf>,
    pub(crate) reload_command: Option<OsString>,
    pub(crate) reject_escaping_paths: bool,
    pub(crate) verbose: u8,
}

impl ParsedArgs {
    pub(crate) fn listener_config(&self) -> ListenerConfig {
        let config = ListenerConfig::for_host(&self.files_dir, &self.app_id);
        let mut builder = config.to_builder();
        if let Some(socket) = &self.socket {
            builder = builder.endpoint(Endpoint::Path(socket.clone()));
        }
        if self.reject_escaping_paths {
            builder = builder.escape_policy(EscapePolicy::Reject);
        }
        // Every location is already set by `for_host`.
        builder.build().unwrap_or(config)
    }

    pub(crate) fn reload_trigger(&self) -> Arc<dyn ReloadTrigger> {
        match &self.reload_command {
            Some(program) => Arc::new(CommandReloadTrigger::new(program.clone())),
            None => Arc::new(LogReloadTrigger),
        }
    }
}

fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Applies file changes pushed over a local socket and triggers an app reload.")
        .arg(
            Arg::new("files-dir")
                .long("files-dir")
                .value_name("DIR")
                .help("Private storage directory of the host application.")
                .required(true)
                .value_parser(PathBufValueParser::new()),
        )
        .arg(
            Arg::new("app-id")
                .long("app-id")
                .value_name("ID")
                .help("Application id; the socket is named <ID>-livesync.")
                .required(true),
        )
        .arg(
            Arg::new("socket")
                .long("socket")
                .value_name("PATH")
                .help("Listen on a socket file instead of the default endpoint.")
                .value_parser(PathBufValueParser::new()),
        )
        .arg(
            Arg::new("reload-command")
                .long("reload-command")
                .value_name("PROGRAM")
                .help("Program run with the reload script path after each batch.")
                .value_parser(OsStringValueParser::new()),
        )
        .arg(
            Arg::new("reject-escaping-paths")
                .long("reject-escaping-paths")
                .help("Refuse file names that are absolute or contain '..'.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase log verbosity; repeat for more detail.")
                .action(ArgAction::Count),
        )
}

pub(crate) fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let mut matches = clap_command().try_get_matches_from(arguments)?;

    Ok(ParsedArgs {
        files_dir: matches
            .remove_one::<PathBuf>("files-dir")
            .unwrap_or_default(),
        app_id: matches.remove_one::<String>("app-id").unwrap_or_default(),
        socket: matches.remove_one::<PathBuf>("socket"),
        reload_command: matches.remove_one::<OsString>("reload-command"),
        reject_escaping_paths: matches.get_flag("reject-escaping-paths"),
        verbose: matches.get_count("verbose"),
    })
}

/// Parses `arguments`, then serves until interrupted.
pub(crate) fn run_with<I, S>(arguments: I) -> ExitCode
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let args = match parse_args(arguments) {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(2));
        }
    };

    if let Err(err) = init_tracing(&LogConfig::from_verbose_level(args.verbose)) {
        eprintln!("{PROGRAM_NAME}: failed to initialise logging: {err}");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(target: "livesync::listener", %err, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(&args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target: "livesync::listener", kind = %err.kind(), "{err}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(args: &ParsedArgs) -> Result<(), ListenerError> {
    let config = args.listener_config();
    let service = SyncService::start(&config, args.reload_trigger())?;
    info!(
        target: "livesync::listener",
        endpoint = %service.endpoint(),
        root = %config.sandbox_root(),
        "ready for pushes"
    );

    let shutdown = service.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(target: "livesync::listener", "interrupted, shutting down");
            shutdown.stop();
        }
    });

    service.wait().await
}
